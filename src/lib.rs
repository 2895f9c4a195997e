//! AgentPay Relay - Payment-gated trade execution relay for Base network
//!
//! The relay exposes an HTTP surface where a caller pays an x402-style
//! micropayment for an agent suggestion, creates a trade intent, pays again,
//! and a server-held execution wallet performs the spot swap on a
//! Uniswap-V2-compatible router.

pub mod config;
pub mod types;
pub mod errors;
pub mod network;
pub mod storage;
pub mod payments;
pub mod swap;
pub mod agents;
pub mod lifecycle;
pub mod http;
pub mod utils;

// Re-export commonly used items
pub use config::Config;
pub use errors::{RelayError, RelayResult};
pub use types::*;

// Type alias for our concrete provider
pub type ConcreteProvider = alloy::providers::RootProvider<alloy::transports::BoxTransport>;
