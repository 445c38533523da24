//! Chamber pressure regulator: OFF → IDLE ⇄ {VACUUM | RELEASE}.
//!
//! VACUUM runs the pump to pull pressure down; RELEASE opens the vent valve
//! to let it rise back towards the setpoint.

use super::{Band, ControlContext, ControlTask, drive_lower, drive_off, drive_raise};
use crate::events::ControlEvent;
use crate::fsm::{StateDescriptor, StateId};
use crate::process::SharedData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PressState {
    Off = 0,
    Idle = 1,
    Vacuum = 2,
    Release = 3,
}

impl StateId for PressState {
    fn index(self) -> usize {
        self as usize
    }
}

pub type PressureControl = ControlTask<PressState>;

impl PressureControl {
    pub fn new() -> Self {
        ControlTask::from_table("press", build_state_table(), PressState::Off, measure)
    }
}

impl Default for PressureControl {
    fn default() -> Self {
        Self::new()
    }
}

fn measure(shared: &SharedData) -> (u16, Band) {
    (
        shared.process.pressure_kpa(),
        Band {
            setpoint: shared.config.press_setpoint,
            hysteresis: shared.config.press_hysteresis,
        },
    )
}

pub fn build_state_table() -> [StateDescriptor<PressState, ControlContext>; 4] {
    [
        StateDescriptor {
            id: PressState::Off,
            name: "OFF",
            on_enter: Some(drive_off),
            on_exit: None,
            on_update: off_update,
        },
        StateDescriptor {
            id: PressState::Idle,
            name: "IDLE",
            on_enter: Some(drive_off),
            on_exit: None,
            on_update: idle_update,
        },
        StateDescriptor {
            id: PressState::Vacuum,
            name: "VACUUM",
            on_enter: Some(drive_lower),
            on_exit: Some(drive_off),
            on_update: vacuum_update,
        },
        StateDescriptor {
            id: PressState::Release,
            name: "RELEASE",
            on_enter: Some(drive_raise),
            on_exit: Some(drive_off),
            on_update: release_update,
        },
    ]
}

fn off_update(ctx: &mut ControlContext) -> Option<PressState> {
    ctx.take_event(ControlEvent::EnableOn).then_some(PressState::Idle)
}

fn idle_update(ctx: &mut ControlContext) -> Option<PressState> {
    if ctx.take_event(ControlEvent::EnableOff) {
        Some(PressState::Off)
    } else if ctx.below_band() {
        Some(PressState::Release)
    } else if ctx.above_band() {
        Some(PressState::Vacuum)
    } else {
        None
    }
}

fn vacuum_update(ctx: &mut ControlContext) -> Option<PressState> {
    if ctx.take_event(ControlEvent::EnableOff) {
        Some(PressState::Off)
    } else if ctx.below_setpoint() {
        Some(PressState::Idle)
    } else {
        None
    }
}

fn release_update(ctx: &mut ControlContext) -> Option<PressState> {
    if ctx.take_event(ControlEvent::EnableOff) {
        Some(PressState::Off)
    } else if ctx.above_setpoint() {
        Some(PressState::Idle)
    } else {
        None
    }
}
