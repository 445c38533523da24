//! ThermoVac controller core.
//!
//! Firmware logic for a vacuum/thermal test chamber: two hysteresis
//! regulators (temperature, pressure), a mode arbiter with a sticky alarm,
//! a menu-driven configuration editor, a non-blocking character display
//! pipeline and EEPROM persistence with a busy gate.
//!
//! ```text
//!  tick IRQ ──▶ TickSource ──▶ AppService::run_pending
//!                                 ├─ temperature ─┐
//!                                 ├─ pressure ────┴─▶ ActuatorPort
//!                                 ├─ system ──────────▶ TextDisplay ─▶ LcdPipeline ─▶ DisplayBus
//!                                 └─ menu ────────────▶ ConfigPort  ─▶ Eeprom      ─▶ EepromBus
//! ```
//!
//! The crate is `no_std`.  Everything that touches the board is behind the
//! port traits in [`app::ports`]; the `thermovac-sim` binary wires them to
//! host mocks.

#![cfg_attr(not(test), no_std)]
#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod display;
pub mod error;
pub mod events;
pub mod fsm;
pub mod menu;
pub mod process;
pub mod storage;
pub mod system;
pub mod tick;

pub use error::{Error, RecoveryAction, Result};
