//! Core data types and structures

pub mod tokens;
pub mod intent;
pub mod trade;
pub mod payment;
pub mod health;

pub use tokens::*;
pub use intent::*;
pub use trade::*;
pub use payment::*;
pub use health::*;
