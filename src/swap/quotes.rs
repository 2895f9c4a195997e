//! Quote retrieval and slippage protection

use alloy::{
    primitives::{Address, U256},
    rpc::types::eth::TransactionRequest,
};
use tracing::info;

use crate::errors::{RelayError, RelayResult};
use crate::network::FallbackProvider;
use crate::swap::abi;

/// Expected output and minimum-acceptable output for one swap attempt.
/// Valid only for the execution attempt that requested it.
#[derive(Debug, Clone, Copy)]
pub struct SwapQuote {
    pub amount_out: U256,
    pub min_out: U256,
}

/// Minimum acceptable output after applying the slippage tolerance.
pub fn min_out_for(amount_out: U256, slippage_bps: u32) -> U256 {
    amount_out * U256::from(10_000u32.saturating_sub(slippage_bps)) / U256::from(10_000u32)
}

/// Ask the router for the expected output of `amount_in` along `path`.
/// A failed quote aborts the swap entirely; executing without a
/// minimum-output bound would leave the trade open to sandwiching.
pub async fn fetch_quote(
    fallback: &FallbackProvider,
    router: Address,
    amount_in: U256,
    path: &[Address],
    slippage_bps: u32,
) -> RelayResult<SwapQuote> {
    let data = abi::router_get_amounts_out(amount_in, path);
    let tx = TransactionRequest::default().to(router).input(data.into());

    let result = fallback
        .call(&tx, "getAmountsOut")
        .await
        .map_err(|e| RelayError::QuoteUnavailable {
            message: "router quote call failed".to_string(),
            source: Some(e.into()),
        })?;

    let amounts = abi::decode_amounts(&result).map_err(|e| RelayError::QuoteUnavailable {
        message: "router returned an undecodable quote".to_string(),
        source: Some(e),
    })?;

    let amount_out = amounts
        .last()
        .copied()
        .filter(|a| *a > U256::ZERO)
        .ok_or_else(|| RelayError::QuoteUnavailable {
            message: "router quoted zero output".to_string(),
            source: None,
        })?;

    let quote = SwapQuote {
        amount_out,
        min_out: min_out_for(amount_out, slippage_bps),
    };

    info!(
        "💱 Quote: {} in -> {} out (min {} at {} bps)",
        amount_in, quote.amount_out, quote.min_out, slippage_bps
    );

    Ok(quote)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_out_applies_basis_points() {
        assert_eq!(
            min_out_for(U256::from(10_000u64), 50),
            U256::from(9_950u64)
        );
        assert_eq!(
            min_out_for(U256::from(10_000u64), 0),
            U256::from(10_000u64)
        );
    }

    #[test]
    fn min_out_never_exceeds_quote() {
        for bps in [0u32, 1, 50, 100, 10_000] {
            let quote = U256::from(123_456_789u64);
            assert!(min_out_for(quote, bps) <= quote);
        }
    }
}
