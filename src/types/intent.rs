//! Trade intent types and lifecycle states

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a trade intent. Transitions are strictly
/// pending -> paid -> executed; nothing skips a stage and executed is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentStatus {
    Pending,
    Paid,
    Executed,
}

impl IntentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::Pending => "pending",
            IntentStatus::Paid => "paid",
            IntentStatus::Executed => "executed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(IntentStatus::Pending),
            "paid" => Some(IntentStatus::Paid),
            "executed" => Some(IntentStatus::Executed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Some(Side::Buy),
            "sell" => Some(Side::Sell),
            _ => None,
        }
    }
}

/// A user's declared desire to trade, recorded before payment or execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeIntent {
    pub id: String,
    pub user_address: String,
    pub agent_id: String,
    pub symbol: String,
    pub side: Side,
    pub size: Decimal,
    /// Fixed at 1: spot swaps only.
    pub leverage: u32,
    /// Clamped fee as a 6-decimal string, e.g. "0.001000".
    pub expected_payment_amount: String,
    pub status: IntentStatus,
    pub payment_request_id: Option<String>,
    /// Payment identifier recorded when the intent transitions to paid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            IntentStatus::Pending,
            IntentStatus::Paid,
            IntentStatus::Executed,
        ] {
            assert_eq!(IntentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(IntentStatus::parse("cancelled"), None);
    }

    #[test]
    fn side_parsing_accepts_mixed_case() {
        assert_eq!(Side::parse("BUY"), Some(Side::Buy));
        assert_eq!(Side::parse("sell"), Some(Side::Sell));
        assert_eq!(Side::parse("short"), None);
    }
}
