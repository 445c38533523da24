//! Mock board for integration tests.
//!
//! Records every actuator call, decodes display frames into a 16x2
//! framebuffer the way the HD44780 would latch them, and keeps the EEPROM
//! in a byte vector.  Transfer completion is driven by the test.

use std::collections::VecDeque;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};
use thermovac::app::events::AppEvent;
use thermovac::app::ports::{ActuatorPort, DisplayBus, EepromBus, EventSink};
use thermovac::display::{LCD_COLS, LCD_ROWS};
use thermovac::error::{DisplayError, StorageError};
use thermovac::storage::MAX_ADDRESS;

// ── Actuators ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Heater(bool),
    Cooler(bool),
    VacuumPump(bool),
    VentValve(bool),
    AlarmBlink(bool),
}

#[derive(Default)]
pub struct MockActuators {
    pub calls: Vec<ActuatorCall>,
}

#[allow(dead_code)]
impl MockActuators {
    fn last(&self, pick: impl Fn(ActuatorCall) -> Option<bool>) -> bool {
        self.calls.iter().rev().find_map(|c| pick(*c)).unwrap_or(false)
    }

    pub fn heater_on(&self) -> bool {
        self.last(|c| match c {
            ActuatorCall::Heater(on) => Some(on),
            _ => None,
        })
    }

    pub fn cooler_on(&self) -> bool {
        self.last(|c| match c {
            ActuatorCall::Cooler(on) => Some(on),
            _ => None,
        })
    }

    pub fn pump_on(&self) -> bool {
        self.last(|c| match c {
            ActuatorCall::VacuumPump(on) => Some(on),
            _ => None,
        })
    }

    pub fn vent_open(&self) -> bool {
        self.last(|c| match c {
            ActuatorCall::VentValve(on) => Some(on),
            _ => None,
        })
    }

    pub fn blinking(&self) -> bool {
        self.last(|c| match c {
            ActuatorCall::AlarmBlink(on) => Some(on),
            _ => None,
        })
    }
}

impl ActuatorPort for MockActuators {
    fn set_heater(&mut self, on: bool) {
        self.calls.push(ActuatorCall::Heater(on));
    }

    fn set_cooler(&mut self, on: bool) {
        self.calls.push(ActuatorCall::Cooler(on));
    }

    fn set_vacuum_pump(&mut self, on: bool) {
        self.calls.push(ActuatorCall::VacuumPump(on));
    }

    fn set_vent_valve(&mut self, on: bool) {
        self.calls.push(ActuatorCall::VentValve(on));
    }

    fn set_alarm_blink(&mut self, on: bool) {
        self.calls.push(ActuatorCall::AlarmBlink(on));
    }
}

// ── Display ───────────────────────────────────────────────────

/// PCF8574 + HD44780 stand-in.
pub struct MockLcdBus {
    in_flight: VecDeque<[u8; 4]>,
    framebuffer: [[u8; LCD_COLS]; LCD_ROWS],
    cursor: (usize, usize),
    pub frames: u32,
    /// Refuse the next `n` transfers.
    pub fail_transfers: u32,
    /// More than one transfer in flight at once.
    pub overlapped: bool,
}

impl Default for MockLcdBus {
    fn default() -> Self {
        Self {
            in_flight: VecDeque::new(),
            framebuffer: [[b' '; LCD_COLS]; LCD_ROWS],
            cursor: (0, 0),
            frames: 0,
            fail_transfers: 0,
            overlapped: false,
        }
    }
}

#[allow(dead_code)]
impl MockLcdBus {
    /// Latch the oldest in-flight frame.
    pub fn complete_one(&mut self) -> bool {
        let Some(frame) = self.in_flight.pop_front() else {
            return false;
        };
        // EN must pulse high then low for each nibble.
        assert_eq!(frame[0] & 0x04, 0x04);
        assert_eq!(frame[1] & 0x04, 0);
        let byte = (frame[0] & 0xF0) | (frame[2] >> 4);
        if frame[0] & 0x01 != 0 {
            let (row, col) = self.cursor;
            if col < LCD_COLS {
                self.framebuffer[row][col] = byte;
            }
            self.cursor.1 += 1;
        } else if byte & 0x80 != 0 {
            self.cursor = (usize::from(byte & 0x40 != 0), 0);
        }
        true
    }

    pub fn row(&self, row: usize) -> String {
        self.framebuffer[row]
            .iter()
            .map(|&b| if b == 0xDF { '\u{b0}' } else { b as char })
            .collect()
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }
}

impl DisplayBus for MockLcdBus {
    fn start_transfer(&mut self, frame: [u8; 4]) -> Result<(), DisplayError> {
        if self.fail_transfers > 0 {
            self.fail_transfers -= 1;
            return Err(DisplayError::BusFault);
        }
        if !self.in_flight.is_empty() {
            self.overlapped = true;
        }
        self.in_flight.push_back(frame);
        self.frames += 1;
        Ok(())
    }
}

/// Init-time I2C: accepts writes to any address, can be told to NACK.
#[derive(Default)]
pub struct MockI2c {
    pub writes: usize,
    pub nack: bool,
}

impl ErrorType for MockI2c {
    type Error = ErrorKind;
}

impl I2c for MockI2c {
    fn transaction(&mut self, _address: u8, ops: &mut [Operation<'_>]) -> Result<(), ErrorKind> {
        if self.nack {
            return Err(ErrorKind::NoAcknowledge(
                embedded_hal::i2c::NoAcknowledgeSource::Address,
            ));
        }
        self.writes += ops.len();
        Ok(())
    }
}

pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

// ── EEPROM ────────────────────────────────────────────────────

pub struct MockEepromBus {
    pub mem: Vec<u8>,
    pub writes: Vec<(u16, Vec<u8>)>,
    /// A write was launched and its completion has not been delivered.
    pub write_pending: bool,
    pub unresponsive: bool,
}

impl Default for MockEepromBus {
    fn default() -> Self {
        Self {
            mem: vec![0xFF; MAX_ADDRESS as usize + 1],
            writes: Vec::new(),
            write_pending: false,
            unresponsive: false,
        }
    }
}

impl EepromBus for MockEepromBus {
    fn start_write(&mut self, address: u16, data: &[u8]) -> Result<(), StorageError> {
        let start = usize::from(address);
        self.mem[start..start + data.len()].copy_from_slice(data);
        self.writes.push((address, data.to_vec()));
        self.write_pending = true;
        Ok(())
    }

    fn read(&mut self, address: u16, buf: &mut [u8]) -> Result<(), StorageError> {
        if self.unresponsive {
            return Err(StorageError::Timeout);
        }
        let start = usize::from(address);
        buf.copy_from_slice(&self.mem[start..start + buf.len()]);
        Ok(())
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}
