//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  What happens to them is
//! the adapter's business: the bundled [`LogEventSink`] writes them to the
//! log, tests record them.
//!
//! [`LogEventSink`]: crate::adapters::log_sink::LogEventSink

use crate::config::{ChamberConfig, Field};
use crate::control::Drive;
use crate::error::{DisplayError, StorageError};
use crate::system::SystemMode;

/// Which regulated quantity an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plant {
    Temperature,
    Pressure,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// Boot finished; carries the configuration in effect.
    Started(ChamberConfig),

    /// The system FSM changed mode.
    ModeChanged { from: SystemMode, to: SystemMode },

    /// A regulator changed its actuator demand.
    DriveChanged { plant: Plant, drive: Drive },

    /// Alarm latched (values at the moment it fired).
    AlarmRaised { temp_c: u16, press_kpa: u16 },

    /// Alarm acknowledged with the enable switch.
    AlarmCleared,

    /// A field edit was committed in the menu.
    ConfigCommitted { field: Field, value: u16 },

    /// Persistent write launched.
    ConfigSaved,

    /// Persistent write refused; the change lives only in RAM.
    ConfigSaveFailed(StorageError),

    /// The display pipeline halted and needs re-initialisation.
    DisplayFault(DisplayError),
}
