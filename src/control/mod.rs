//! Two-sided hysteresis regulators for the chamber temperature and pressure.
//!
//! Both plants share the same structure:
//!
//! ```text
//!          EnableOn              value+hyst < sp
//!   OFF ───────────▶ IDLE ─────────────────────▶ RAISE  (heating / release)
//!    ▲               │  ▲ ◀──── value > sp ──────┘
//!    │ EnableOff     │  │
//!    └── any state   │  └────── value < sp ──────┐
//!                    └─────────────────────────▶ LOWER  (cooling / vacuum)
//!                        value > sp+hyst
//! ```
//!
//! Entry into a corrective state needs the full hysteresis band; the exit
//! happens as soon as the value crosses the bare setpoint.  The entry
//! comparisons are written in additive form so a hysteresis larger than the
//! setpoint cannot underflow.

pub mod pressure;
pub mod temperature;

use crate::events::{ControlEvent, TaskQueue};
use crate::fsm::{Fsm, StateDescriptor, StateId};
use crate::process::SharedData;

/// Actuator demand published by a regulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Drive {
    #[default]
    Off,
    /// Push the value up (heater on, vent valve open).
    Raise,
    /// Pull the value down (cooler on, vacuum pump on).
    Lower,
}

/// Setpoint and hysteresis, in the plant's display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Band {
    pub setpoint: u16,
    pub hysteresis: u16,
}

/// Blackboard shared by the regulator state handlers.
#[derive(Debug, Default)]
pub struct ControlContext {
    /// Last event pulled from the queue and not yet consumed.
    pub pending: Option<ControlEvent>,
    pub value: u16,
    pub band: Band,
    pub drive: Drive,
}

impl ControlContext {
    /// Consume the pending event if it is `event`.
    pub fn take_event(&mut self, event: ControlEvent) -> bool {
        if self.pending == Some(event) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn below_band(&self) -> bool {
        u32::from(self.value) + u32::from(self.band.hysteresis) < u32::from(self.band.setpoint)
    }

    pub fn above_band(&self) -> bool {
        u32::from(self.value) > u32::from(self.band.setpoint) + u32::from(self.band.hysteresis)
    }

    pub fn above_setpoint(&self) -> bool {
        self.value > self.band.setpoint
    }

    pub fn below_setpoint(&self) -> bool {
        self.value < self.band.setpoint
    }
}

/// Shared action: drop every actuator demand.
pub(crate) fn drive_off(ctx: &mut ControlContext) {
    ctx.drive = Drive::Off;
}

pub(crate) fn drive_raise(ctx: &mut ControlContext) {
    ctx.drive = Drive::Raise;
}

pub(crate) fn drive_lower(ctx: &mut ControlContext) {
    ctx.drive = Drive::Lower;
}

/// Reads the plant's converted value and band from the shared data.
pub type MeasureFn = fn(&SharedData) -> (u16, Band);

/// One regulator task: FSM, blackboard and inbound queue.
pub struct ControlTask<S: StateId> {
    name: &'static str,
    fsm: Fsm<S, ControlContext, 4>,
    ctx: ControlContext,
    queue: TaskQueue<ControlEvent>,
    measure: MeasureFn,
}

impl<S: StateId> ControlTask<S> {
    pub(crate) fn from_table(
        name: &'static str,
        table: [StateDescriptor<S, ControlContext>; 4],
        initial: S,
        measure: MeasureFn,
    ) -> Self {
        Self {
            name,
            fsm: Fsm::new(name, table, initial),
            ctx: ControlContext::default(),
            queue: TaskQueue::new(),
            measure,
        }
    }

    pub fn start(&mut self) {
        self.fsm.start(&mut self.ctx);
    }

    /// Queue an enable/disable command.  Returns `false` if it was dropped.
    pub fn put(&mut self, event: ControlEvent) -> bool {
        self.queue.put(event, self.name)
    }

    /// One elapsed tick: refresh inputs, pull at most one event, step the FSM.
    pub fn pass(&mut self, shared: &SharedData) {
        let (value, band) = (self.measure)(shared);
        self.ctx.value = value;
        self.ctx.band = band;
        if let Some(event) = self.queue.pop() {
            self.ctx.pending = Some(event);
        }
        self.fsm.step(&mut self.ctx);
    }

    pub fn state(&self) -> S {
        self.fsm.current_state()
    }

    pub fn drive(&self) -> Drive {
        self.ctx.drive
    }

    pub fn queue(&self) -> &TaskQueue<ControlEvent> {
        &self.queue
    }
}
