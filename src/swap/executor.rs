//! Swap execution: balance and allowance checks, quote-bounded submission,
//! execution-price recovery

use alloy::primitives::{Address, U256};
use alloy::rpc::types::eth::TransactionRequest;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{info, warn};

use crate::config::{APPROVAL_SAFETY_MULTIPLIER, Config, SWAP_DEADLINE_SECS};
use crate::errors::{RelayError, RelayResult};
use crate::network::{FallbackProvider, PriceOracle};
use crate::swap::{abi, fetch_quote, ExecutionWallet};
use crate::types::{Side, TokenPair, resolve_pair};
use crate::utils::{from_base_units, to_base_units};

/// The result of a confirmed swap.
#[derive(Debug, Clone)]
pub struct SwapOutcome {
    pub tx_hash: String,
    pub execution_price: Decimal,
}

/// Seam between the lifecycle orchestrator and on-chain execution, so the
/// orchestrator can be exercised without a chain.
#[async_trait]
pub trait SwapService: Send + Sync {
    async fn execute_swap(
        &self,
        user_address: &str,
        symbol: &str,
        side: Side,
        size: Decimal,
    ) -> RelayResult<SwapOutcome>;
}

/// tokenIn/tokenOut resolution: buys spend the quote token, sells spend the
/// base token.
fn swap_direction(pair: &TokenPair, side: Side) -> (Address, Address, u32, u32, &'static str) {
    match side {
        Side::Buy => (pair.quote, pair.base, pair.quote_decimals, pair.base_decimals, "USDC"),
        Side::Sell => (pair.base, pair.quote, pair.base_decimals, pair.quote_decimals, pair.symbol),
    }
}

/// Price of record for a confirmed swap with no parseable Swap event.
/// Prefers the oracle spot; a dead oracle degrades to the quoted amounts.
/// A confirmed swap must always get a price, never an error.
fn fallback_price(
    side: Side,
    amount_in: U256,
    quote_out: U256,
    in_decimals: u32,
    out_decimals: u32,
    oracle_price: RelayResult<Decimal>,
) -> Decimal {
    match oracle_price {
        Ok(price) => price,
        Err(e) => {
            warn!("⚠️ Oracle price unavailable ({}), using quoted amounts", e);
            derive_execution_price(side, amount_in, quote_out, in_decimals, out_decimals)
                .unwrap_or_default()
        }
    }
}

/// Realized quote-per-base price from the actual swapped amounts.
fn derive_execution_price(
    side: Side,
    amount_in: U256,
    amount_out: U256,
    in_decimals: u32,
    out_decimals: u32,
) -> Option<Decimal> {
    let amount_in = from_base_units(amount_in, in_decimals).ok()?;
    let amount_out = from_base_units(amount_out, out_decimals).ok()?;
    if amount_in.is_zero() || amount_out.is_zero() {
        return None;
    }
    match side {
        Side::Buy => Some(amount_in / amount_out),
        Side::Sell => Some(amount_out / amount_in),
    }
}

pub struct SwapExecutor {
    fallback: Arc<FallbackProvider>,
    oracle: Arc<PriceOracle>,
    wallet: ExecutionWallet,
    router: Address,
    slippage_bps: u32,
}

impl SwapExecutor {
    /// Returns None when no execution wallet key is configured; the service
    /// then serves everything except execution.
    pub fn from_config(
        config: &Config,
        fallback: Arc<FallbackProvider>,
        oracle: Arc<PriceOracle>,
    ) -> Result<Option<Self>> {
        let Some(wallet) = ExecutionWallet::from_config(config)? else {
            return Ok(None);
        };

        let router = Address::from_str(&config.swap_router)
            .with_context(|| format!("invalid router address {}", config.swap_router))?;

        Ok(Some(Self {
            fallback,
            oracle,
            wallet,
            router,
            slippage_bps: config.slippage_tolerance_bps,
        }))
    }

    async fn read_uint(&self, token: Address, data: Vec<u8>, op_name: &str) -> RelayResult<U256> {
        let tx = TransactionRequest::default().to(token).input(data.into());
        let result = self.fallback.call(&tx, op_name).await?;
        abi::decode_uint(&result).map_err(|e| RelayError::Contract {
            contract: token,
            message: format!("{op_name} returned undecodable data"),
            source: e,
        })
    }

    async fn ensure_allowance(
        &self,
        token: Address,
        token_symbol: &str,
        decimals: u32,
        amount_in: U256,
    ) -> RelayResult<()> {
        let allowance = self
            .read_uint(
                token,
                abi::erc20_allowance(self.wallet.address(), self.router),
                "allowance",
            )
            .await?;

        if allowance >= amount_in {
            return Ok(());
        }

        // Approve a safety-margin multiple so small follow-up trades skip
        // this transaction.
        let approval = amount_in.saturating_mul(U256::from(APPROVAL_SAFETY_MULTIPLIER));
        info!("🔓 Approving router for {} base units", approval);

        let receipt = self
            .wallet
            .submit(
                &self.fallback,
                token,
                abi::erc20_approve(self.router, approval),
                "approve",
            )
            .await?;

        if !receipt.status() {
            return Err(RelayError::InsufficientAllowance {
                token: token_symbol.to_string(),
                router: self.router,
                needed: from_base_units(amount_in, decimals).unwrap_or_default(),
                approved: from_base_units(allowance, decimals).unwrap_or_default(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl SwapService for SwapExecutor {
    async fn execute_swap(
        &self,
        user_address: &str,
        symbol: &str,
        side: Side,
        size: Decimal,
    ) -> RelayResult<SwapOutcome> {
        let pair = resolve_pair(symbol).ok_or_else(|| RelayError::UnsupportedSymbol {
            symbol: symbol.to_string(),
        })?;
        let recipient = Address::from_str(user_address).map_err(|_| {
            RelayError::validation(format!("invalid user address: {user_address}"))
        })?;

        let (token_in, token_out, in_decimals, out_decimals, in_symbol) =
            swap_direction(pair, side);
        let amount_in = to_base_units(size, in_decimals)
            .map_err(|e| RelayError::validation(format!("invalid trade size: {e:#}")))?;
        if amount_in == U256::ZERO {
            return Err(RelayError::validation("trade size rounds to zero base units"));
        }

        info!(
            "🚀 Executing {} {} {} for {} (amountIn {})",
            side.as_str(),
            size,
            pair.symbol,
            user_address,
            amount_in
        );

        // Balance check before touching anything
        let balance = self
            .read_uint(
                token_in,
                abi::erc20_balance_of(self.wallet.address()),
                "balanceOf",
            )
            .await?;
        if balance < amount_in {
            return Err(RelayError::InsufficientBalance {
                token: in_symbol.to_string(),
                needed: from_base_units(amount_in, in_decimals).unwrap_or(size),
                available: from_base_units(balance, in_decimals).unwrap_or_default(),
            });
        }

        self.ensure_allowance(token_in, in_symbol, in_decimals, amount_in)
            .await?;

        // No quote, no swap
        let path = [token_in, token_out];
        let quote = fetch_quote(
            &self.fallback,
            self.router,
            amount_in,
            &path,
            self.slippage_bps,
        )
        .await?;

        let deadline = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_err(|e| RelayError::internal(format!("system clock error: {e}")))?
            .as_secs()
            + SWAP_DEADLINE_SECS;
        let swap_data = abi::router_swap_exact_tokens(
            amount_in,
            quote.min_out,
            &path,
            recipient,
            U256::from(deadline),
        );

        let receipt = self
            .wallet
            .submit(&self.fallback, self.router, swap_data, "swap")
            .await?;
        let tx_hash = format!("{:?}", receipt.transaction_hash);

        if !receipt.status() {
            return Err(RelayError::SwapReverted { tx_hash });
        }

        let execution_price = match abi::parse_swap_amounts(receipt.inner.logs()) {
            Some((actual_in, actual_out)) => {
                derive_execution_price(side, actual_in, actual_out, in_decimals, out_decimals)
            }
            None => None,
        };

        let execution_price = match execution_price {
            Some(price) => price,
            None => {
                // The swap is confirmed; a missing event must not fail it
                warn!("⚠️ No parseable Swap event in {}, recovering price", tx_hash);
                fallback_price(
                    side,
                    amount_in,
                    quote.amount_out,
                    in_decimals,
                    out_decimals,
                    self.oracle.spot_price(pair.oracle_ticker).await,
                )
            }
        };

        info!("✅ Swap confirmed {} at price {}", tx_hash, execution_price);

        Ok(SwapOutcome {
            tx_hash,
            execution_price,
        })
    }
}
