//! On-chain swap execution against a V2-style router

pub mod abi;
pub mod quotes;
pub mod wallet;
pub mod executor;

pub use abi::*;
pub use quotes::*;
pub use wallet::*;
pub use executor::*;
