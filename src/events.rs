//! Inter-task events and the fixed-capacity queues that carry them.
//!
//! Every task domain owns one [`EventQueue`].  Producers push, the owning
//! task pops at most one event per elapsed tick.
//!
//! ```text
//! ┌──────────────┐  SystemEvent   ┌─────────────┐  ButtonEvent  ┌───────────┐
//! │ Button task  │───────────────▶│  System FSM │──────────────▶│ Menu FSM  │
//! │ Enable input │                │             │◀──────────────│           │
//! └──────────────┘                └─────────────┘   ExitMenu    └───────────┘
//!                                   │ ControlEvent
//!                         ┌─────────┴─────────┐
//!                         ▼                   ▼
//!                  ┌─────────────┐     ┌──────────────┐
//!                  │ Temperature │     │   Pressure   │
//!                  └─────────────┘     └──────────────┘
//! ```
//!
//! Overflow drops the incoming event.  The drop is reported by the `false`
//! return of [`EventQueue::push`] and counted in [`EventQueue::dropped`].

use log::warn;

/// Capacity of the per-task event queues.
pub const EVENT_QUEUE_CAP: usize = 16;

/// Event queue sized for one task domain.
pub type TaskQueue<E> = EventQueue<E, EVENT_QUEUE_CAP>;

// ── Domain events ─────────────────────────────────────────────

/// Enable/disable command for a control FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    EnableOn,
    EnableOff,
}

/// Front-panel navigation buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Enter,
    Next,
    Previous,
    Escape,
}

/// Debounced edge reported by the button task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Pressed.
    Active,
    /// Released.
    Idle,
}

/// A button edge. This is also the Menu FSM's event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: Button,
    pub phase: Phase,
}

impl ButtonEvent {
    pub const fn pressed(button: Button) -> Self {
        Self {
            button,
            phase: Phase::Active,
        }
    }

    pub const fn released(button: Button) -> Self {
        Self {
            button,
            phase: Phase::Idle,
        }
    }

    pub const fn is_press(&self) -> bool {
        matches!(self.phase, Phase::Active)
    }
}

/// Events handled by the System FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEvent {
    Button(ButtonEvent),
    /// Enable switch turned on.
    EnableActive,
    /// Enable switch turned off.
    EnableIdle,
    /// Raised by the Menu FSM to hand the display back.
    ExitMenu,
}

// ── Ring buffer ───────────────────────────────────────────────

/// Fixed-capacity FIFO with drop-newest overflow.
///
/// `head` is the next write slot, `tail` the next read slot; `count`
/// disambiguates full from empty, so `count == (head - tail) mod N` holds
/// except when full, where `head == tail` and `count == N`.
#[derive(Debug, Clone)]
pub struct EventQueue<T: Copy, const N: usize> {
    buf: [Option<T>; N],
    head: usize,
    tail: usize,
    count: usize,
    dropped: u32,
}

impl<T: Copy, const N: usize> EventQueue<T, N> {
    pub const fn new() -> Self {
        Self {
            buf: [None; N],
            head: 0,
            tail: 0,
            count: 0,
            dropped: 0,
        }
    }

    /// Append `event`.  Returns `false` (and counts a drop) when full.
    pub fn push(&mut self, event: T) -> bool {
        if self.count == N {
            self.dropped = self.dropped.saturating_add(1);
            return false;
        }
        self.buf[self.head] = Some(event);
        self.head = (self.head + 1) % N;
        self.count += 1;
        true
    }

    /// Like [`push`](Self::push) but logs the drop with the queue's name.
    pub fn put(&mut self, event: T, queue: &'static str) -> bool
    where
        T: core::fmt::Debug,
    {
        let ok = self.push(event);
        if !ok {
            warn!("{queue} queue full, dropped {event:?} (total {})", self.dropped);
        }
        ok
    }

    /// Remove the oldest event.
    pub fn pop(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        let event = self.buf[self.tail].take();
        self.tail = (self.tail + 1) % N;
        self.count -= 1;
        event
    }

    pub fn any(&self) -> bool {
        self.count > 0
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Events discarded because the queue was full.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn clear(&mut self) {
        while self.pop().is_some() {}
    }
}

impl<T: Copy, const N: usize> Default for EventQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
