//! Drives intents through pending, paid and executed

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agents::{Agent, Suggestion};
use crate::config::Config;
use crate::errors::{RelayError, RelayResult};
use crate::lifecycle::pnl::enrich_with_pnl;
use crate::network::PriceOracle;
use crate::payments::build_payment_request;
use crate::storage::TradeStore;
use crate::swap::SwapService;
use crate::types::{
    EnrichedTrade, ExecutedTrade, IntentStatus, PaymentRequest, PaymentStatus, Side, TradeIntent,
    VerifiedPayment, resolve_pair,
};

pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Orchestrates the trade lifecycle across storage, the swap executor and
/// the price oracle. Status changes go through the store's compare-and-swap
/// so a stage is claimed exactly once, and an in-process claim set keeps a
/// single intent from executing twice concurrently.
pub struct TradeLifecycle {
    config: Arc<Config>,
    store: Arc<dyn TradeStore>,
    swap: Option<Arc<dyn SwapService>>,
    oracle: Arc<PriceOracle>,
    in_flight: Mutex<HashSet<String>>,
}

impl TradeLifecycle {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn TradeStore>,
        swap: Option<Arc<dyn SwapService>>,
        oracle: Arc<PriceOracle>,
    ) -> Self {
        Self {
            config,
            store,
            swap,
            oracle,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn can_execute(&self) -> bool {
        self.swap.is_some()
    }

    /// Validate and record a new intent. Returns the pending intent together
    /// with the payment request the caller must settle before execution.
    pub async fn create_intent(
        &self,
        user_address: &str,
        agent_id: &str,
        symbol: &str,
        side: &str,
        size: Decimal,
    ) -> RelayResult<(TradeIntent, PaymentRequest)> {
        alloy::primitives::Address::from_str(user_address)
            .map_err(|_| RelayError::validation(format!("invalid user address: {user_address}")))?;
        if Agent::parse(agent_id).is_none() {
            return Err(RelayError::validation(format!("unknown agent id: {agent_id}")));
        }
        let pair = resolve_pair(symbol).ok_or_else(|| RelayError::UnsupportedSymbol {
            symbol: symbol.to_string(),
        })?;
        let side = Side::parse(side)
            .ok_or_else(|| RelayError::validation(format!("side must be buy or sell, got {side}")))?;
        if size <= Decimal::ZERO {
            return Err(RelayError::validation("trade size must be positive"));
        }

        let fee = self.config.expected_payment_amount(size);
        let amount = format!("{fee:.6}");
        let payment_request = build_payment_request(
            &self.config,
            &amount,
            format!("Execute {} {} {}", side.as_str(), size, pair.symbol),
        );

        let intent = TradeIntent {
            id: Uuid::new_v4().to_string(),
            user_address: user_address.to_string(),
            agent_id: agent_id.to_string(),
            symbol: pair.symbol.to_string(),
            side,
            size,
            leverage: 1,
            expected_payment_amount: amount,
            status: IntentStatus::Pending,
            payment_request_id: Some(payment_request.id.clone()),
            paid_payment_id: None,
            created_at: Utc::now(),
        };
        self.store.insert_intent(&intent).await?;

        info!(
            "📝 Created intent {}: {} {} {} for {}",
            intent.id,
            side.as_str(),
            size,
            pair.symbol,
            user_address
        );
        Ok((intent, payment_request))
    }

    pub async fn get_intent(&self, id: &str) -> RelayResult<TradeIntent> {
        self.store
            .get_intent(id)
            .await?
            .ok_or_else(|| RelayError::not_found(format!("trade intent {id}")))
    }

    /// Execute a paid-for intent. The caller has already passed the payment
    /// gate; this claims pending -> paid with the verified payment id, runs
    /// the swap, and only then advances paid -> executed. A failed swap
    /// leaves the intent paid so the same payment can retry.
    pub async fn execute_intent(
        &self,
        id: &str,
        payment: &VerifiedPayment,
    ) -> RelayResult<(ExecutedTrade, TradeIntent)> {
        let swap = self
            .swap
            .clone()
            .ok_or_else(|| RelayError::internal("no execution wallet configured"))?;
        let intent = self.get_intent(id).await?;

        if intent.status == IntentStatus::Executed {
            return Err(RelayError::validation(format!(
                "trade intent {id} is already executed"
            )));
        }

        {
            let mut in_flight = self
                .in_flight
                .lock()
                .map_err(|_| RelayError::internal("in-flight set lock poisoned"))?;
            if !in_flight.insert(id.to_string()) {
                return Err(RelayError::validation(format!(
                    "trade intent {id} is already executing"
                )));
            }
        }

        let result = self.run_execution(&intent, payment, swap.as_ref()).await;

        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.remove(id);
        }

        result
    }

    async fn run_execution(
        &self,
        intent: &TradeIntent,
        payment: &VerifiedPayment,
        swap: &dyn SwapService,
    ) -> RelayResult<(ExecutedTrade, TradeIntent)> {
        let id = &intent.id;

        if intent.status == IntentStatus::Pending {
            let claimed = self
                .store
                .transition_status(
                    id,
                    IntentStatus::Pending,
                    IntentStatus::Paid,
                    Some(&payment.payment_id),
                )
                .await?;
            if claimed {
                info!("💸 Intent {} paid via {}", id, payment.payment_id);
            } else {
                // Lost the claim; only continue when the intent settled in
                // paid, meaning an earlier attempt's swap failed.
                let current = self.get_intent(id).await?;
                if current.status != IntentStatus::Paid {
                    return Err(RelayError::validation(format!(
                        "trade intent {id} is already executed"
                    )));
                }
            }
        }

        let outcome = swap
            .execute_swap(&intent.user_address, &intent.symbol, intent.side, intent.size)
            .await
            .inspect_err(|e| {
                warn!("⚠️ Swap for intent {} failed, intent stays paid: {}", id, e);
            })?;

        let trade = ExecutedTrade {
            id: Uuid::new_v4().to_string(),
            trade_intent_id: id.clone(),
            payment_id: payment.payment_id.clone(),
            payment_status: PaymentStatus::Paid,
            tx_hash: outcome.tx_hash,
            execution_price: outcome.execution_price,
            completed_at: Utc::now(),
            status: IntentStatus::Executed,
        };

        // One transaction: the intent never reads executed without its trade
        let advanced = self.store.record_execution(&trade).await?;
        if !advanced {
            error!(
                "Swap {} confirmed but intent {} was no longer paid",
                trade.tx_hash, id
            );
            return Err(RelayError::internal(format!(
                "intent {id} left the paid state during execution"
            )));
        }

        info!(
            "✅ Intent {} executed: tx {} at {}",
            id, trade.tx_hash, trade.execution_price
        );
        let refreshed = self.get_intent(id).await?;
        Ok((trade, refreshed))
    }

    /// Recent trades enriched with read-time PnL. Spot prices are fetched
    /// best effort per symbol; a failed lookup leaves that symbol's open
    /// buys unvalued rather than failing the listing.
    pub async fn list_trades(&self, limit: usize) -> RelayResult<Vec<EnrichedTrade>> {
        let rows = self.store.recent_trades(limit).await?;

        let symbols: HashSet<&str> = rows
            .iter()
            .filter_map(|(_, intent)| intent.as_ref())
            .filter(|intent| intent.side == Side::Buy)
            .map(|intent| intent.symbol.as_str())
            .collect();

        let mut spot_prices = HashMap::new();
        for symbol in symbols {
            let Some(pair) = resolve_pair(symbol) else {
                continue;
            };
            match self.oracle.spot_price(pair.oracle_ticker).await {
                Ok(price) => {
                    spot_prices.insert(symbol.to_string(), price);
                }
                Err(e) => warn!("⚠️ No spot price for {}: {}", symbol, e),
            }
        }

        Ok(enrich_with_pnl(rows, &spot_prices))
    }

    /// A deterministic suggestion from the named agent, anchored at spot.
    pub async fn suggest(&self, agent: Agent, symbol: &str) -> RelayResult<Suggestion> {
        let pair = resolve_pair(symbol).ok_or_else(|| RelayError::UnsupportedSymbol {
            symbol: symbol.to_string(),
        })?;
        let spot = self.oracle.spot_price(pair.oracle_ticker).await?;
        Ok(agent.suggest(pair.symbol, spot))
    }
}
