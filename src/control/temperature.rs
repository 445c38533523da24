//! Chamber temperature regulator: OFF → IDLE ⇄ {HEATING | COOLING}.

use super::{Band, ControlContext, ControlTask, drive_lower, drive_off, drive_raise};
use crate::events::ControlEvent;
use crate::fsm::{StateDescriptor, StateId};
use crate::process::SharedData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TempState {
    Off = 0,
    Idle = 1,
    Heating = 2,
    Cooling = 3,
}

impl StateId for TempState {
    fn index(self) -> usize {
        self as usize
    }
}

pub type TemperatureControl = ControlTask<TempState>;

impl TemperatureControl {
    pub fn new() -> Self {
        ControlTask::from_table("temp", build_state_table(), TempState::Off, measure)
    }
}

impl Default for TemperatureControl {
    fn default() -> Self {
        Self::new()
    }
}

fn measure(shared: &SharedData) -> (u16, Band) {
    (
        shared.process.temperature_c(),
        Band {
            setpoint: shared.config.temp_setpoint,
            hysteresis: shared.config.temp_hysteresis,
        },
    )
}

pub fn build_state_table() -> [StateDescriptor<TempState, ControlContext>; 4] {
    [
        StateDescriptor {
            id: TempState::Off,
            name: "OFF",
            on_enter: Some(drive_off),
            on_exit: None,
            on_update: off_update,
        },
        StateDescriptor {
            id: TempState::Idle,
            name: "IDLE",
            on_enter: Some(drive_off),
            on_exit: None,
            on_update: idle_update,
        },
        StateDescriptor {
            id: TempState::Heating,
            name: "HEATING",
            on_enter: Some(drive_raise),
            on_exit: Some(drive_off),
            on_update: heating_update,
        },
        StateDescriptor {
            id: TempState::Cooling,
            name: "COOLING",
            on_enter: Some(drive_lower),
            on_exit: Some(drive_off),
            on_update: cooling_update,
        },
    ]
}

fn off_update(ctx: &mut ControlContext) -> Option<TempState> {
    ctx.take_event(ControlEvent::EnableOn).then_some(TempState::Idle)
}

fn idle_update(ctx: &mut ControlContext) -> Option<TempState> {
    if ctx.take_event(ControlEvent::EnableOff) {
        Some(TempState::Off)
    } else if ctx.below_band() {
        Some(TempState::Heating)
    } else if ctx.above_band() {
        Some(TempState::Cooling)
    } else {
        None
    }
}

fn heating_update(ctx: &mut ControlContext) -> Option<TempState> {
    if ctx.take_event(ControlEvent::EnableOff) {
        Some(TempState::Off)
    } else if ctx.above_setpoint() {
        Some(TempState::Idle)
    } else {
        None
    }
}

fn cooling_update(ctx: &mut ControlContext) -> Option<TempState> {
    if ctx.take_event(ControlEvent::EnableOff) {
        Some(TempState::Off)
    } else if ctx.below_setpoint() {
        Some(TempState::Idle)
    } else {
        None
    }
}
