//! `airwatch-agent` library crate.
//!
//! Re-exports internal modules for integration testing. The binary
//! entrypoint lives in `main.rs`.

pub mod alarm;
pub mod channel;
pub mod config;
pub mod publish;
pub mod registration;
pub mod sensor;
pub mod settings;
pub mod store;
pub mod tasks;
