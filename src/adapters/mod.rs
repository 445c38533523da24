//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter     | Implements    | Connects to                 |
//! |-------------|---------------|-----------------------------|
//! | `hardware`  | ActuatorPort  | GPIO output pins            |
//! | `log_sink`  | EventSink     | `log` facade                |
//!
//! The display and EEPROM pipelines live in [`crate::display`] and
//! [`crate::storage`]; their shared handles implement `TextDisplay` and
//! `ConfigPort` directly.

pub mod hardware;
pub mod log_sink;
