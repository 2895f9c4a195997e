//! Executed trade records and PnL reporting

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::intent::{IntentStatus, TradeIntent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "paid" => Some(PaymentStatus::Paid),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

/// The immutable record of a completed on-chain swap. Created once,
/// immediately after swap confirmation, referencing exactly one intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutedTrade {
    pub id: String,
    pub trade_intent_id: String,
    pub payment_id: String,
    pub payment_status: PaymentStatus,
    pub tx_hash: String,
    pub execution_price: Decimal,
    pub completed_at: DateTime<Utc>,
    /// Always `executed`; trades only exist for finished swaps.
    pub status: IntentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PnlKind {
    Realized,
    Unrealized,
}

/// Profit-and-loss computed on read, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PnlReport {
    #[serde(rename = "type")]
    pub kind: PnlKind,
    /// None when an unrealized value cannot be priced.
    pub value: Option<Decimal>,
    pub is_profit: Option<bool>,
}

/// A trade as returned by the listing endpoint: the raw record plus its
/// originating intent and computed PnL.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedTrade {
    #[serde(flatten)]
    pub trade: ExecutedTrade,
    pub trade_intent: Option<TradeIntent>,
    pub pnl: Option<PnlReport>,
}
