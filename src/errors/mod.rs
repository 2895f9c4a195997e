//! Error handling for the relay

pub mod relay_error;
pub mod classify;

pub use relay_error::*;
pub use classify::*;
