//! EEPROM persistence with a busy gate.
//!
//! Writes are asynchronous: [`Eeprom::write`] stages the payload, launches
//! the transfer and arms the gate.  The transfer-complete interrupt calls
//! [`Eeprom::on_write_complete`] with a timestamp; the device then needs a
//! fixed internal write cycle before it accepts the next write.  Until that
//! has elapsed every write is rejected with [`StorageError::Busy`].  This is
//! a timing approximation of device readiness, not an ACK poll.
//!
//! Reads are blocking and only used at boot, before the completion
//! interrupt is live.
//!
//! The configuration record lives at [`RECORD_OFFSET`]; loading it applies
//! per-field recovery (see [`ChamberConfig::from_record`]).

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Instant};
use log::{debug, info, warn};

use crate::app::ports::{ConfigPort, EepromBus};
use crate::config::{ChamberConfig, RECORD_LEN, RECORD_OFFSET};
use crate::error::StorageError;

/// Highest valid byte address.
pub const MAX_ADDRESS: u32 = 63_999;
/// Device-internal write cycle after a completed transfer.
pub const WRITE_CYCLE: Duration = Duration::from_millis(5);
/// Timeout applied by bus implementations to blocking reads.
pub const READ_TIMEOUT: Duration = Duration::from_millis(1000);
/// Largest single write (one device page).
pub const PAGE_SIZE: usize = 32;

pub type SharedEeprom<B> = Mutex<CriticalSectionRawMutex, RefCell<Eeprom<B>>>;

pub const fn shared<B: EepromBus>(eeprom: Eeprom<B>) -> SharedEeprom<B> {
    Mutex::new(RefCell::new(eeprom))
}

/// Run `f` on the shared device inside a critical section.
pub fn with_eeprom<B: EepromBus, R>(eeprom: &SharedEeprom<B>, f: impl FnOnce(&mut Eeprom<B>) -> R) -> R {
    eeprom.lock(|cell| f(&mut cell.borrow_mut()))
}

pub struct Eeprom<B: EepromBus> {
    bus: B,
    /// Payload of the in-flight write; must outlive the transfer.
    staged: heapless::Vec<u8, PAGE_SIZE>,
    in_flight: bool,
    last_complete: Option<Instant>,
    rejected_writes: u32,
}

impl<B: EepromBus> Eeprom<B> {
    pub const fn new(bus: B) -> Self {
        Self {
            bus,
            staged: heapless::Vec::new(),
            in_flight: false,
            last_complete: None,
            rejected_writes: 0,
        }
    }

    /// Launch an asynchronous write, or reject it while the gate is armed.
    pub fn write(&mut self, now: Instant, address: u16, data: &[u8]) -> Result<(), StorageError> {
        check_range(address, data.len())?;
        if data.len() > PAGE_SIZE {
            return Err(StorageError::TooLarge);
        }
        if self.is_busy(now) {
            self.rejected_writes = self.rejected_writes.saturating_add(1);
            warn!(
                "eeprom: write at {address} rejected, device busy (total {})",
                self.rejected_writes
            );
            return Err(StorageError::Busy);
        }

        self.staged.clear();
        self.staged
            .extend_from_slice(data)
            .map_err(|()| StorageError::TooLarge)?;
        self.in_flight = true;
        if let Err(e) = self.bus.start_write(address, &self.staged) {
            self.in_flight = false;
            warn!("eeprom: write at {address} failed to start: {e}");
            return Err(e);
        }
        debug!("eeprom: writing {} bytes at {address}", data.len());
        Ok(())
    }

    /// Transfer-complete callback (interrupt context).
    pub fn on_write_complete(&mut self, now: Instant) {
        self.in_flight = false;
        self.last_complete = Some(now);
    }

    /// Transfer-error callback (interrupt context).  The device never started
    /// its internal cycle, so the gate is released without a timestamp.
    pub fn on_write_error(&mut self) {
        self.in_flight = false;
    }

    /// Blocking read.
    pub fn read(&mut self, address: u16, buf: &mut [u8]) -> Result<(), StorageError> {
        check_range(address, buf.len())?;
        self.bus.read(address, buf)
    }

    /// True while a write is in flight or the internal cycle has not elapsed.
    pub fn is_busy(&self, now: Instant) -> bool {
        if self.in_flight {
            return true;
        }
        match self.last_complete {
            Some(done) => now
                .checked_duration_since(done)
                .is_none_or(|elapsed| elapsed < WRITE_CYCLE),
            None => false,
        }
    }

    pub fn rejected_writes(&self) -> u32 {
        self.rejected_writes
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }
}

fn check_range(address: u16, len: usize) -> Result<(), StorageError> {
    if len == 0 {
        return Ok(());
    }
    let last = u32::from(address) + len as u32 - 1;
    if last > MAX_ADDRESS {
        return Err(StorageError::OutOfBounds);
    }
    Ok(())
}

impl<B: EepromBus> ConfigPort for Eeprom<B> {
    fn load(&mut self) -> Result<ChamberConfig, StorageError> {
        let mut buf = [0u8; RECORD_LEN];
        self.read(RECORD_OFFSET, &mut buf)?;
        let config = ChamberConfig::from_record(&buf);
        info!("eeprom: loaded config {config:?}");
        Ok(config)
    }

    fn save(&mut self, config: &ChamberConfig, now: Instant) -> Result<(), StorageError> {
        self.write(now, RECORD_OFFSET, &config.to_record())
    }
}

/// Borrowed handle that lets the application save through a [`SharedEeprom`].
pub struct EepromHandle<'a, B: EepromBus>(pub &'a SharedEeprom<B>);

impl<B: EepromBus> ConfigPort for EepromHandle<'_, B> {
    fn load(&mut self) -> Result<ChamberConfig, StorageError> {
        with_eeprom(self.0, |e| e.load())
    }

    fn save(&mut self, config: &ChamberConfig, now: Instant) -> Result<(), StorageError> {
        with_eeprom(self.0, |e| e.save(config, now))
    }
}
