//! Payment gating for HTTP-native micropayments

pub mod gate;

pub use gate::*;
