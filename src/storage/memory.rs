//! In-memory store used when persistent storage is unavailable

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::errors::{RelayError, RelayResult};
use crate::types::{ExecutedTrade, IntentStatus, TradeIntent};

use super::store::TradeStore;

#[derive(Default)]
pub struct MemoryStore {
    intents: RwLock<HashMap<String, TradeIntent>>,
    trades: RwLock<Vec<ExecutedTrade>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_poisoned() -> RelayError {
        RelayError::internal("in-memory store lock poisoned")
    }
}

#[async_trait]
impl TradeStore for MemoryStore {
    async fn insert_intent(&self, intent: &TradeIntent) -> RelayResult<()> {
        let mut intents = self.intents.write().map_err(|_| Self::lock_poisoned())?;
        intents.insert(intent.id.clone(), intent.clone());
        Ok(())
    }

    async fn get_intent(&self, id: &str) -> RelayResult<Option<TradeIntent>> {
        let intents = self.intents.read().map_err(|_| Self::lock_poisoned())?;
        Ok(intents.get(id).cloned())
    }

    async fn transition_status(
        &self,
        id: &str,
        from: IntentStatus,
        to: IntentStatus,
        payment_id: Option<&str>,
    ) -> RelayResult<bool> {
        let mut intents = self.intents.write().map_err(|_| Self::lock_poisoned())?;
        match intents.get_mut(id) {
            Some(intent) if intent.status == from => {
                intent.status = to;
                if let Some(pid) = payment_id {
                    intent.paid_payment_id = Some(pid.to_string());
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_trade(&self, trade: &ExecutedTrade) -> RelayResult<()> {
        let mut trades = self.trades.write().map_err(|_| Self::lock_poisoned())?;
        trades.push(trade.clone());
        Ok(())
    }

    async fn record_execution(&self, trade: &ExecutedTrade) -> RelayResult<bool> {
        // Lock order everywhere is intents before trades
        let mut intents = self.intents.write().map_err(|_| Self::lock_poisoned())?;
        let mut trades = self.trades.write().map_err(|_| Self::lock_poisoned())?;

        match intents.get_mut(&trade.trade_intent_id) {
            Some(intent) if intent.status == IntentStatus::Paid => {
                intent.status = IntentStatus::Executed;
                trades.push(trade.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn recent_trades(
        &self,
        limit: usize,
    ) -> RelayResult<Vec<(ExecutedTrade, Option<TradeIntent>)>> {
        let intents = self.intents.read().map_err(|_| Self::lock_poisoned())?;
        let trades = self.trades.read().map_err(|_| Self::lock_poisoned())?;

        let mut sorted: Vec<ExecutedTrade> = trades.clone();
        sorted.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

        Ok(sorted
            .into_iter()
            .take(limit)
            .map(|trade| {
                let intent = intents.get(&trade.trade_intent_id).cloned();
                (trade, intent)
            })
            .collect())
    }

    async fn ping(&self) -> RelayResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;
    use crate::types::{PaymentStatus, Side};

    pub(crate) fn sample_intent(id: &str) -> TradeIntent {
        TradeIntent {
            id: id.to_string(),
            user_address: "0x1111111111111111111111111111111111111111".to_string(),
            agent_id: "trend-follower".to_string(),
            symbol: "ETH".to_string(),
            side: Side::Buy,
            size: dec!(0.01),
            leverage: 1,
            expected_payment_amount: "0.001000".to_string(),
            status: IntentStatus::Pending,
            payment_request_id: Some("pr-1".to_string()),
            paid_payment_id: None,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn sample_trade(id: &str, intent_id: &str, offset_secs: i64) -> ExecutedTrade {
        ExecutedTrade {
            id: id.to_string(),
            trade_intent_id: intent_id.to_string(),
            payment_id: format!("pay-{id}"),
            payment_status: PaymentStatus::Paid,
            tx_hash: format!("0x{id}"),
            execution_price: dec!(2500),
            completed_at: Utc::now() + Duration::seconds(offset_secs),
            status: IntentStatus::Executed,
        }
    }

    #[tokio::test]
    async fn insert_and_get_round_trip() {
        let store = MemoryStore::new();
        store.insert_intent(&sample_intent("a")).await.unwrap();

        let loaded = store.get_intent("a").await.unwrap().unwrap();
        assert_eq!(loaded.status, IntentStatus::Pending);
        assert!(store.get_intent("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cas_transition_moves_only_from_expected_state() {
        let store = MemoryStore::new();
        store.insert_intent(&sample_intent("a")).await.unwrap();

        let moved = store
            .transition_status("a", IntentStatus::Pending, IntentStatus::Paid, Some("pay-1"))
            .await
            .unwrap();
        assert!(moved);

        // A second claim of the same transition loses the race
        let moved_again = store
            .transition_status("a", IntentStatus::Pending, IntentStatus::Paid, Some("pay-2"))
            .await
            .unwrap();
        assert!(!moved_again);

        let intent = store.get_intent("a").await.unwrap().unwrap();
        assert_eq!(intent.status, IntentStatus::Paid);
        assert_eq!(intent.paid_payment_id.as_deref(), Some("pay-1"));
    }

    #[tokio::test]
    async fn cas_never_skips_from_pending_to_executed() {
        let store = MemoryStore::new();
        store.insert_intent(&sample_intent("a")).await.unwrap();

        // Executed requires the intent to already be paid
        let moved = store
            .transition_status("a", IntentStatus::Paid, IntentStatus::Executed, None)
            .await
            .unwrap();
        assert!(!moved);
        assert_eq!(
            store.get_intent("a").await.unwrap().unwrap().status,
            IntentStatus::Pending
        );
    }

    #[tokio::test]
    async fn record_execution_moves_status_and_trade_together() {
        let store = MemoryStore::new();
        store.insert_intent(&sample_intent("a")).await.unwrap();
        store
            .transition_status("a", IntentStatus::Pending, IntentStatus::Paid, Some("pay-1"))
            .await
            .unwrap();

        let recorded = store
            .record_execution(&sample_trade("t1", "a", 0))
            .await
            .unwrap();
        assert!(recorded);
        assert_eq!(
            store.get_intent("a").await.unwrap().unwrap().status,
            IntentStatus::Executed
        );
        assert_eq!(store.recent_trades(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn record_execution_writes_nothing_for_unpaid_intents() {
        let store = MemoryStore::new();
        store.insert_intent(&sample_intent("a")).await.unwrap();

        let recorded = store
            .record_execution(&sample_trade("t1", "a", 0))
            .await
            .unwrap();
        assert!(!recorded);
        assert_eq!(
            store.get_intent("a").await.unwrap().unwrap().status,
            IntentStatus::Pending
        );
        assert!(store.recent_trades(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn recent_trades_are_newest_first_and_limited() {
        let store = MemoryStore::new();
        store.insert_intent(&sample_intent("i1")).await.unwrap();
        store.insert_trade(&sample_trade("t1", "i1", 0)).await.unwrap();
        store.insert_trade(&sample_trade("t2", "i1", 10)).await.unwrap();
        store.insert_trade(&sample_trade("t3", "i1", 20)).await.unwrap();

        let trades = store.recent_trades(2).await.unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].0.id, "t3");
        assert_eq!(trades[1].0.id, "t2");
        assert!(trades[0].1.is_some());
    }
}
