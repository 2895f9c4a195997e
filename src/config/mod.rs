//! Configuration management for the relay

pub mod settings;

pub use settings::*;
