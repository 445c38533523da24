//! Non-blocking display pipeline.
//!
//! High-level commands are expanded into [`Subcommand`]s and queued.  When
//! the bus is idle the sequencer pops one, encodes it as a 4-byte frame and
//! launches a single asynchronous transfer.  The transfer-complete interrupt
//! calls [`LcdPipeline::on_transfer_complete`], which immediately launches
//! the next one, so the chain runs by itself until the queue is empty.  The
//! busy flag clears only when a completion finds nothing left to send; the
//! next submit restarts the chain.
//!
//! A failed transfer latches a fatal [`DisplayError::BusFault`].  Submits are
//! refused until [`LcdPipeline::reset`] has run and the controller has been
//! re-initialised.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{error, warn};

use super::{Screen, Subcommand, glyph, hd44780};
use crate::app::ports::{DisplayBus, TextDisplay};
use crate::error::DisplayError;
use crate::events::EventQueue;

/// Capacity of the subcommand queue.
pub const SUBCOMMAND_QUEUE_CAP: usize = 64;

pub type SubcommandQueue = EventQueue<Subcommand, SUBCOMMAND_QUEUE_CAP>;

/// Pipeline shared between the cooperative tasks and the completion interrupt.
pub type SharedLcd<B> = Mutex<CriticalSectionRawMutex, RefCell<LcdPipeline<B>>>;

pub const fn shared<B: DisplayBus>(pipeline: LcdPipeline<B>) -> SharedLcd<B> {
    Mutex::new(RefCell::new(pipeline))
}

/// Run `f` on the shared pipeline inside a critical section.
pub fn with_lcd<B: DisplayBus, R>(lcd: &SharedLcd<B>, f: impl FnOnce(&mut LcdPipeline<B>) -> R) -> R {
    lcd.lock(|cell| f(&mut cell.borrow_mut()))
}

pub struct LcdPipeline<B: DisplayBus> {
    bus: B,
    queue: SubcommandQueue,
    busy: bool,
    fault: Option<DisplayError>,
    transfers: u32,
}

impl<B: DisplayBus> LcdPipeline<B> {
    pub const fn new(bus: B) -> Self {
        Self {
            bus,
            queue: SubcommandQueue::new(),
            busy: false,
            fault: None,
            transfers: 0,
        }
    }

    // ── Command expansion ─────────────────────────────────────

    /// Queue a cursor move to the start of `line`.
    pub fn move_to_line(&mut self, line: u8) -> Result<(), DisplayError> {
        self.check_fault()?;
        self.submit(Subcommand::MoveTo(line))
    }

    /// Queue one write per character of `text`.
    pub fn write_string(&mut self, text: &str) -> Result<(), DisplayError> {
        self.check_fault()?;
        text.chars()
            .try_for_each(|c| self.submit(Subcommand::WriteChar(glyph(c))))
    }

    /// Queue one write per pre-mapped glyph.
    pub fn write_glyphs(&mut self, glyphs: &[u8]) -> Result<(), DisplayError> {
        self.check_fault()?;
        glyphs
            .iter()
            .try_for_each(|&g| self.submit(Subcommand::WriteChar(g)))
    }

    /// Queue both rows of `screen`.
    pub fn show(&mut self, screen: &Screen) -> Result<(), DisplayError> {
        for row in 0..super::LCD_ROWS {
            self.move_to_line(row as u8)?;
            self.write_glyphs(screen.row(row))?;
        }
        Ok(())
    }

    // ── Sequencer ─────────────────────────────────────────────

    /// Transfer-complete callback.  Interrupt context: only advances the chain.
    pub fn on_transfer_complete(&mut self) -> Result<(), DisplayError> {
        self.busy = false;
        if self.fault.is_some() {
            return Ok(());
        }
        self.kick()
    }

    /// Transfer-error callback.  Latches the fatal fault.
    pub fn on_transfer_error(&mut self) -> DisplayError {
        self.busy = false;
        self.latch_fault()
    }

    /// Drop everything queued and clear the fault latch.  The caller must
    /// re-run [`hd44780::init`] before submitting again.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.busy = false;
        self.fault = None;
        warn!("lcd: pipeline reset");
    }

    fn kick(&mut self) -> Result<(), DisplayError> {
        if self.busy {
            return Ok(());
        }
        let Some(sub) = self.queue.pop() else {
            return Ok(());
        };
        self.busy = true;
        match self.bus.start_transfer(hd44780::encode(sub)) {
            Ok(()) => {
                self.transfers = self.transfers.wrapping_add(1);
                Ok(())
            }
            Err(_) => {
                self.busy = false;
                Err(self.latch_fault())
            }
        }
    }

    /// Push and, if the bus is idle, launch straight away.
    fn submit(&mut self, sub: Subcommand) -> Result<(), DisplayError> {
        if !self.queue.push(sub) {
            warn!("lcd: subcommand queue full, dropped {:?} (total {})", sub, self.queue.dropped());
        }
        self.kick()
    }

    fn check_fault(&self) -> Result<(), DisplayError> {
        match self.fault {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn latch_fault(&mut self) -> DisplayError {
        error!("lcd: bus transfer failed, display halted until re-init");
        let e = DisplayError::BusFault;
        self.fault = Some(e);
        e
    }

    // ── Introspection ─────────────────────────────────────────

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Nothing queued and nothing in flight.
    pub fn is_idle(&self) -> bool {
        !self.busy && self.queue.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn dropped(&self) -> u32 {
        self.queue.dropped()
    }

    pub fn transfers(&self) -> u32 {
        self.transfers
    }

    pub fn fault(&self) -> Option<DisplayError> {
        self.fault
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }
}

/// Borrowed handle that lets the tasks render into a [`SharedLcd`].
pub struct LcdHandle<'a, B: DisplayBus>(pub &'a SharedLcd<B>);

impl<B: DisplayBus> TextDisplay for LcdHandle<'_, B> {
    fn show(&mut self, screen: &Screen) -> Result<(), DisplayError> {
        with_lcd(self.0, |lcd| lcd.show(screen))
    }
}
