//! Function-pointer finite state machine engine.
//!
//! Every task in the controller is a table-driven FSM:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  StateTable<S, C>                                             │
//! │  ┌──────────┬────────────┬────────────┬─────────────────────┐ │
//! │  │ id: S    │ on_enter   │ on_exit    │ on_update           │ │
//! │  ├──────────┼────────────┼────────────┼─────────────────────┤ │
//! │  │ state 0  │ fn(&mut C) │ fn(&mut C) │ fn(&mut C)->Option<S>│ │
//! │  │ state 1  │ fn(&mut C) │ fn(&mut C) │ fn(&mut C)->Option<S>│ │
//! │  │ ...      │            │            │                     │ │
//! │  └──────────┴────────────┴────────────┴─────────────────────┘ │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each pass the engine calls `on_update` for the **current** state.
//! If it returns `Some(next_id)` the engine runs `on_exit` for the current
//! state, then `on_enter` for the next, and moves the current pointer.
//! The context type `C` is the task's blackboard: pending event, inputs
//! copied in before the pass, and outputs read back after it.

use log::info;

/// Implemented by each task's state enum.
pub trait StateId: Copy + Eq + core::fmt::Debug {
    /// Row of this state in the table.
    fn index(self) -> usize;
}

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn<C> = fn(&mut C);

/// Signature for the per-pass update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn<S, C> = fn(&mut C) -> Option<S>;

/// Static descriptor for a single FSM state.
pub struct StateDescriptor<S, C> {
    pub id: S,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn<C>>,
    pub on_exit: Option<StateActionFn<C>>,
    pub on_update: StateUpdateFn<S, C>,
}

/// The engine.  Owns the table; the context is threaded through each call.
pub struct Fsm<S: StateId, C, const N: usize> {
    label: &'static str,
    table: [StateDescriptor<S, C>; N],
    current: S,
}

impl<S: StateId, C, const N: usize> Fsm<S, C, N> {
    /// `label` prefixes the transition log lines.
    pub fn new(label: &'static str, table: [StateDescriptor<S, C>; N], initial: S) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, d)| d.id.index() == i),
            "{label}: state table out of order"
        );
        Self {
            label,
            table,
            current: initial,
        }
    }

    /// Run the initial `on_enter`.  Call once before the first [`step`](Self::step).
    pub fn start(&mut self, ctx: &mut C) {
        info!("{} starting in {}", self.label, self.state_name());
        if let Some(enter) = self.row().on_enter {
            enter(ctx);
        }
    }

    /// Advance by one pass.
    pub fn step(&mut self, ctx: &mut C) {
        if let Some(next) = (self.row().on_update)(ctx) {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> S {
        self.current
    }

    pub fn state_name(&self) -> &'static str {
        self.row().name
    }

    fn row(&self) -> &StateDescriptor<S, C> {
        &self.table[self.current.index()]
    }

    fn transition(&mut self, next: S, ctx: &mut C) {
        if next == self.current {
            return;
        }
        info!(
            "{}: {} -> {}",
            self.label,
            self.row().name,
            self.table[next.index()].name
        );

        if let Some(exit) = self.row().on_exit {
            exit(ctx);
        }
        self.current = next;
        if let Some(enter) = self.row().on_enter {
            enter(ctx);
        }
    }
}
