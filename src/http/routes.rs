//! Route handlers for the relay's HTTP surface

use alloy::primitives::Address;
use alloy::rpc::types::eth::TransactionRequest;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::agents::Agent;
use crate::errors::{RelayError, RelayResult};
use crate::http::responses::error_response;
use crate::http::state::AppState;
use crate::lifecycle::DEFAULT_LIST_LIMIT;
use crate::payments::{PaymentGate, PaymentGateConfig};
use crate::swap::abi;
use crate::types::{CheckResult, HealthChecks, HealthReport, HealthState, resolve_pair};
use crate::utils::from_base_units;

const MAX_LIST_LIMIT: usize = 500;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/agents", get(list_agents))
        .route("/agents/suggest", post(suggest))
        .route("/trades/create-intent", post(create_intent))
        .route("/trades/execute", post(execute))
        .route("/trades", get(list_trades))
        .route("/balances", get(balances))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestRequest {
    pub agent_id: String,
    pub symbol: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
    pub user_address: String,
    pub agent_id: String,
    pub symbol: String,
    pub side: String,
    pub size: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    pub trade_intent_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    pub address: String,
    pub symbol: Option<String>,
}

async fn health(State(state): State<Arc<AppState>>) -> Response {
    let database = match state.store.ping().await {
        Ok(()) => CheckResult {
            ok: true,
            detail: None,
        },
        Err(e) => CheckResult {
            ok: false,
            detail: Some(e.to_string()),
        },
    };
    let blockchain = match state.fallback.get_block_number().await {
        Ok(block) => CheckResult {
            ok: true,
            detail: Some(format!("block {block}")),
        },
        Err(e) => CheckResult {
            ok: false,
            detail: Some(e.to_string()),
        },
    };

    let status = match (database.ok, blockchain.ok) {
        (true, true) => HealthState::Healthy,
        (false, false) => HealthState::Unhealthy,
        _ => HealthState::Degraded,
    };
    let code = if status == HealthState::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    let report = HealthReport {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        network: state.config.payment_network.clone(),
        checks: HealthChecks {
            database,
            blockchain,
        },
    };
    (code, Json(report)).into_response()
}

async fn list_agents() -> Response {
    let agents: Vec<_> = Agent::ALL.iter().map(|a| a.descriptor()).collect();
    Json(json!({ "agents": agents })).into_response()
}

async fn suggest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SuggestRequest>,
) -> Result<Response, Response> {
    let dev = state.config.dev_mode;
    state
        .suggestion_gate
        .require(&headers)
        .map_err(|e| error_response(e, dev))?;

    let agent = Agent::parse(&req.agent_id).ok_or_else(|| {
        error_response(
            RelayError::validation(format!("unknown agent id: {}", req.agent_id)),
            dev,
        )
    })?;
    let suggestion = state
        .lifecycle
        .suggest(agent, &req.symbol)
        .await
        .map_err(|e| error_response(e, dev))?;
    Ok(Json(suggestion).into_response())
}

async fn create_intent(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateIntentRequest>,
) -> Result<Response, Response> {
    let dev = state.config.dev_mode;
    let (intent, payment_request) = state
        .lifecycle
        .create_intent(
            &req.user_address,
            &req.agent_id,
            &req.symbol,
            &req.side,
            req.size,
        )
        .await
        .map_err(|e| error_response(e, dev))?;

    Ok(Json(json!({
        "tradeIntent": intent,
        "paymentRequest": payment_request,
    }))
    .into_response())
}

async fn execute(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ExecuteRequest>,
) -> Result<Response, Response> {
    let dev = state.config.dev_mode;
    let intent = state
        .lifecycle
        .get_intent(&req.trade_intent_id)
        .await
        .map_err(|e| error_response(e, dev))?;

    // The execution gate is priced per intent
    let price = Decimal::from_str(&intent.expected_payment_amount).map_err(|_| {
        error_response(
            RelayError::internal("stored payment amount is not a decimal"),
            dev,
        )
    })?;
    let gate = PaymentGate::new(PaymentGateConfig::from_config(
        &state.config,
        price,
        format!("Execute trade intent {}", intent.id),
    ));
    let verified = gate
        .require(&headers)
        .map_err(|e| error_response(e, dev))?;

    let (trade, intent) = state
        .lifecycle
        .execute_intent(&req.trade_intent_id, &verified)
        .await
        .map_err(|e| error_response(e, dev))?;

    Ok(Json(json!({
        "executedTrade": trade,
        "tradeIntent": intent,
    }))
    .into_response())
}

async fn list_trades(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Response, Response> {
    let dev = state.config.dev_mode;
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
    let trades = state
        .lifecycle
        .list_trades(limit)
        .await
        .map_err(|e| error_response(e, dev))?;
    Ok(Json(json!({ "trades": trades })).into_response())
}

/// On-chain token balance for an address. A failed lookup degrades to a
/// zero balance with a warning instead of an error, so dashboards keep
/// rendering through RPC trouble.
async fn balances(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BalanceQuery>,
) -> Result<Response, Response> {
    let dev = state.config.dev_mode;
    let symbol = query.symbol.as_deref().unwrap_or("ETH");
    let pair = resolve_pair(symbol).ok_or_else(|| {
        error_response(
            RelayError::UnsupportedSymbol {
                symbol: symbol.to_string(),
            },
            dev,
        )
    })?;
    let address = Address::from_str(&query.address).map_err(|_| {
        error_response(
            RelayError::validation(format!("invalid address: {}", query.address)),
            dev,
        )
    })?;

    match read_balance(&state, pair.base, address).await {
        Ok(units) => {
            let formatted = from_base_units(units, pair.base_decimals).unwrap_or_default();
            Ok(Json(json!({
                "balance": units.to_string(),
                "formatted": format!("{} {}", formatted, pair.symbol),
            }))
            .into_response())
        }
        Err(e) => {
            warn!("⚠️ Balance lookup for {} failed: {}", address, e);
            Ok(Json(json!({
                "balance": "0",
                "formatted": format!("0 {}", pair.symbol),
                "warning": "balance lookup failed, showing zero",
            }))
            .into_response())
        }
    }
}

async fn read_balance(
    state: &AppState,
    token: Address,
    holder: Address,
) -> RelayResult<alloy::primitives::U256> {
    let tx = TransactionRequest::default()
        .to(token)
        .input(abi::erc20_balance_of(holder).into());
    let bytes = state.fallback.call(&tx, "balanceOf").await?;
    abi::decode_uint(&bytes).map_err(|e| RelayError::Contract {
        contract: token,
        message: "balanceOf returned undecodable data".to_string(),
        source: e,
    })
}
