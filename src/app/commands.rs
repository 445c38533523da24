//! Inbound inputs to the application service.
//!
//! These come from the collaborators that sit outside the cooperative
//! tasks: the debounced button task, the enable switch and the sampling
//! task.

use crate::events::ButtonEvent;
use crate::process::ProcessData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Debounced edge of one of the four front-panel buttons.
    Button(ButtonEvent),

    /// Enable switch changed (`true` = on).
    EnableSwitch(bool),

    /// Fresh raw samples from the ADC.
    Sample(ProcessData),
}
