//! Network providers, RPC fallback and retry machinery

pub mod providers;
pub mod retry;
pub mod oracle;

pub use providers::*;
pub use retry::*;
pub use oracle::*;
