//! Rule-based suggestion agents

pub mod strategies;

pub use strategies::*;
