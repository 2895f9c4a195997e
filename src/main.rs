//! AgentPay Relay entry point

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use agentpay_relay::config::Config;
use agentpay_relay::http::{AppState, serve};
use agentpay_relay::lifecycle::TradeLifecycle;
use agentpay_relay::network::{FallbackProvider, PriceOracle, probe_chain};
use agentpay_relay::storage::open_store;
use agentpay_relay::swap::{SwapExecutor, SwapService};
use agentpay_relay::utils::{setup_logging, setup_output_directories};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_output_directories()?;
    let _logging_guard = setup_logging()?;

    info!("🚀 Starting AgentPay Relay v{}", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(Config::from_env());
    info!(
        "⚙️ Network: {} (chain id {})",
        config.payment_network, config.chain_id
    );
    info!(
        "⚙️ RPC endpoints: 1 primary + {} fallback",
        config.rpc_fallback_urls.len()
    );
    info!("⚙️ Slippage tolerance: {} bps", config.slippage_tolerance_bps);

    let store = open_store(&config);

    let fallback = Arc::new(FallbackProvider::from_config(&config)?);
    probe_chain(&fallback).await?;

    let oracle = Arc::new(PriceOracle::new(config.oracle_base_url.clone())?);

    let swap: Option<Arc<dyn SwapService>> =
        match SwapExecutor::from_config(&config, fallback.clone(), oracle.clone())? {
            Some(executor) => {
                info!("🔐 Execution wallet configured, trade execution enabled");
                Some(Arc::new(executor))
            }
            None => {
                warn!("⚠️ No execution wallet key set; trade execution is disabled");
                None
            }
        };

    let lifecycle = Arc::new(TradeLifecycle::new(
        config.clone(),
        store.clone(),
        swap,
        oracle,
    ));
    let state = Arc::new(AppState::new(config.clone(), lifecycle, fallback, store));

    serve(&config, state).await
}
