//! Trade intent lifecycle: create, payment-gated execute, list

pub mod pnl;
pub mod orchestrator;

pub use pnl::*;
pub use orchestrator::*;
