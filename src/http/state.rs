//! Shared application state handed to every handler

use std::sync::Arc;
use std::time::Instant;

use crate::config::{Config, SUGGESTION_PRICE_USD};
use crate::lifecycle::TradeLifecycle;
use crate::network::FallbackProvider;
use crate::payments::{PaymentGate, PaymentGateConfig};
use crate::storage::TradeStore;

pub struct AppState {
    pub config: Arc<Config>,
    pub lifecycle: Arc<TradeLifecycle>,
    pub fallback: Arc<FallbackProvider>,
    pub store: Arc<dyn TradeStore>,
    /// Flat-priced gate for agent suggestions. Execution gates are built per
    /// intent since the price depends on trade size.
    pub suggestion_gate: PaymentGate,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        lifecycle: Arc<TradeLifecycle>,
        fallback: Arc<FallbackProvider>,
        store: Arc<dyn TradeStore>,
    ) -> Self {
        let suggestion_gate = PaymentGate::new(PaymentGateConfig::from_config(
            &config,
            SUGGESTION_PRICE_USD,
            "AI agent trade suggestion",
        ));
        Self {
            config,
            lifecycle,
            fallback,
            store,
            suggestion_gate,
            started_at: Instant::now(),
        }
    }
}
