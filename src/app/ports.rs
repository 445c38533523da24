//! Port traits — the boundary between the controller core and the board.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (actuators, display, EEPROM, event sinks) implement these
//! traits.  The [`AppService`](super::service::AppService) takes them as
//! generic parameters at each call, so the core never touches hardware
//! directly and every path can be driven by host mocks.
//!
//! The two bus ports are *asynchronous*: `start_*` only launches a transfer,
//! and the board reports completion later from interrupt context by calling
//! back into the owning pipeline.

use embassy_time::Instant;

use crate::config::ChamberConfig;
use crate::display::Screen;
use crate::error::{DisplayError, StorageError};

// ───────────────────────────────────────────────────────────────
// Actuator port (domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to switch the plant outputs.
pub trait ActuatorPort {
    fn set_heater(&mut self, on: bool);

    fn set_cooler(&mut self, on: bool);

    fn set_vacuum_pump(&mut self, on: bool);

    fn set_vent_valve(&mut self, on: bool);

    /// Start or stop the buzzer/beacon blink pattern.
    fn set_alarm_blink(&mut self, on: bool);

    /// Safe state: every output off.
    fn all_off(&mut self) {
        self.set_heater(false);
        self.set_cooler(false);
        self.set_vacuum_pump(false);
        self.set_vent_valve(false);
        self.set_alarm_blink(false);
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Display ports
// ───────────────────────────────────────────────────────────────

/// Raw transport to the display's I2C expander.
pub trait DisplayBus {
    /// Launch one asynchronous 4-byte transfer.  Completion (or failure) is
    /// reported later through the pipeline's completion callbacks.
    fn start_transfer(&mut self, frame: [u8; 4]) -> Result<(), DisplayError>;
}

/// High-level text output used by the tasks.
pub trait TextDisplay {
    /// Queue a full two-line screen.
    fn show(&mut self, screen: &Screen) -> Result<(), DisplayError>;
}

// ───────────────────────────────────────────────────────────────
// Persistence ports
// ───────────────────────────────────────────────────────────────

/// Raw transport to the byte-addressed EEPROM.
pub trait EepromBus {
    /// Launch an asynchronous write of `data` at `address`.
    fn start_write(&mut self, address: u16, data: &[u8]) -> Result<(), StorageError>;

    /// Blocking read with the device timeout applied by the implementation.
    fn read(&mut self, address: u16, buf: &mut [u8]) -> Result<(), StorageError>;
}

/// Loads and persists the chamber configuration.
pub trait ConfigPort {
    /// Blocking load with per-field recovery.  Only used at boot.
    fn load(&mut self) -> Result<ChamberConfig, StorageError>;

    /// Start an asynchronous save.  `Err(StorageError::Busy)` when the device
    /// has not finished the previous write.
    fn save(&mut self, config: &ChamberConfig, now: Instant) -> Result<(), StorageError>;
}
