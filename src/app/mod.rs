//! Application core: task orchestration with no direct I/O.
//!
//! [`service::AppService`] owns the four cooperative tasks and the shared
//! blackboard.  Everything that touches the board goes through the port
//! traits in [`ports`], so the whole controller runs against host mocks.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
