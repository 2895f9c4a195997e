//! Custom error types for the relay

use alloy::primitives::Address;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::PaymentRequirements;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Unsupported symbol: {symbol}")]
    UnsupportedSymbol { symbol: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Payment required: {}", requirements.description)]
    PaymentRequired { requirements: PaymentRequirements },

    #[error("Insufficient {token} balance: need {needed}, wallet holds {available}")]
    InsufficientBalance {
        token: String,
        needed: Decimal,
        available: Decimal,
    },

    #[error(
        "Insufficient {token} allowance for router {router}: need {needed}, approved {approved}"
    )]
    InsufficientAllowance {
        token: String,
        router: Address,
        needed: Decimal,
        approved: Decimal,
    },

    #[error("Swap reverted on-chain: {tx_hash}")]
    SwapReverted { tx_hash: String },

    #[error("Quote unavailable: {message}")]
    QuoteUnavailable {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("All RPC endpoints failed ({})", endpoints.join(", "))]
    RpcExhausted {
        endpoints: Vec<String>,
        details: Vec<String>,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
        retry_count: u32,
    },

    #[error("Contract interaction failed: {contract} - {message}")]
    Contract {
        contract: Address,
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

pub type RelayResult<T> = Result<T, RelayError>;

impl RelayError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn storage(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
