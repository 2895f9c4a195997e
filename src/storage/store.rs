//! Storage trait shared by the SQLite and in-memory backends

use async_trait::async_trait;

use crate::errors::RelayResult;
use crate::types::{ExecutedTrade, IntentStatus, TradeIntent};

/// Persistence seam for the trade lifecycle. Status transitions use
/// compare-and-swap semantics so concurrent requests for the same intent
/// cannot both claim a stage.
#[async_trait]
pub trait TradeStore: Send + Sync {
    async fn insert_intent(&self, intent: &TradeIntent) -> RelayResult<()>;

    async fn get_intent(&self, id: &str) -> RelayResult<Option<TradeIntent>>;

    /// Move `id` from `from` to `to` only if its current status is `from`.
    /// Returns whether the row actually moved. A pending->paid transition
    /// records `payment_id` on the intent.
    async fn transition_status(
        &self,
        id: &str,
        from: IntentStatus,
        to: IntentStatus,
        payment_id: Option<&str>,
    ) -> RelayResult<bool>;

    async fn insert_trade(&self, trade: &ExecutedTrade) -> RelayResult<()>;

    /// Atomically move the trade's intent from paid to executed and persist
    /// the trade record. Returns whether the intent moved; when it does not
    /// (wrong current status), nothing is written.
    async fn record_execution(&self, trade: &ExecutedTrade) -> RelayResult<bool>;

    /// Most recent executed trades, newest first, each with its originating
    /// intent when still present.
    async fn recent_trades(
        &self,
        limit: usize,
    ) -> RelayResult<Vec<(ExecutedTrade, Option<TradeIntent>)>>;

    async fn ping(&self) -> RelayResult<()>;
}
