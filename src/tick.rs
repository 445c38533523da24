//! Tick accounting between the periodic interrupt and the cooperative tasks.
//!
//! The tick interrupt calls [`TickSource::on_tick`], which bumps one
//! pending-tick counter per task.  Each task's cooperative update drains its
//! own counter one tick at a time with [`TickCounter::take`] and runs one
//! pass per tick taken, so a backlog that built up while the main loop was
//! busy is caught up in a single call instead of being lost.
//!
//! The counters are the only state shared with the interrupt.  Draining is
//! a single atomic fetch-and-decrement-if-positive, so no interrupt gate
//! is needed around it.

use core::sync::atomic::{AtomicU32, Ordering};

/// One task's pending-tick counter.
#[derive(Debug, Default)]
pub struct TickCounter(AtomicU32);

impl TickCounter {
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    /// Called from interrupt context.
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }

    /// Consume one pending tick.  Returns `false` when none are pending.
    pub fn take(&self) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    pub fn pending(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }

    /// Run `step` once for every pending tick.  Returns the number of passes.
    pub fn run_pending(&self, mut step: impl FnMut()) -> u32 {
        let mut passes = 0;
        while self.take() {
            step();
            passes += 1;
        }
        passes
    }
}

/// Identifies a cooperative task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Temperature,
    Pressure,
    System,
    Menu,
}

/// Interrupt-side handle: one counter per task.
///
/// `Sync`, so a `&'static TickSource` (or an `Arc`) can be given to the
/// timer callback while the main loop drains it.
#[derive(Debug, Default)]
pub struct TickSource {
    temperature: TickCounter,
    pressure: TickCounter,
    system: TickCounter,
    menu: TickCounter,
}

impl TickSource {
    pub const fn new() -> Self {
        Self {
            temperature: TickCounter::new(),
            pressure: TickCounter::new(),
            system: TickCounter::new(),
            menu: TickCounter::new(),
        }
    }

    /// Tick interrupt handler body.
    pub fn on_tick(&self) {
        self.temperature.increment();
        self.pressure.increment();
        self.system.increment();
        self.menu.increment();
    }

    pub fn counter(&self, task: Task) -> &TickCounter {
        match task {
            Task::Temperature => &self.temperature,
            Task::Pressure => &self.pressure,
            Task::System => &self.system,
            Task::Menu => &self.menu,
        }
    }
}

/// Countdown that fires once every `period` passes, starting with the first.
#[derive(Debug, Clone, Copy)]
pub struct Interval {
    period: u32,
    remaining: u32,
}

impl Interval {
    pub const fn new(period: u32) -> Self {
        Self {
            period,
            remaining: 0,
        }
    }

    /// Advance by one pass.  Returns `true` on the passes where the interval expires.
    pub fn expired(&mut self) -> bool {
        if self.remaining > 0 {
            self.remaining -= 1;
            false
        } else {
            self.remaining = self.period.saturating_sub(1);
            true
        }
    }

    /// Make the next pass fire.
    pub fn trigger(&mut self) {
        self.remaining = 0;
    }
}
