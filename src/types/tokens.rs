//! Token registry and Base network addresses

use alloy::primitives::{Address, address};

// Base mainnet token addresses
pub const WETH_BASE: Address = address!("4200000000000000000000000000000000000006");
pub const USDC_BASE: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
pub const CBBTC_BASE: Address = address!("cbB7C0000aB88B473b1f5aFd9ef808440eed33Bf");

/// A tradeable spot pair: base token against the USDC quote.
#[derive(Debug, Clone, Copy)]
pub struct TokenPair {
    pub symbol: &'static str,
    pub base: Address,
    pub base_decimals: u32,
    pub quote: Address,
    pub quote_decimals: u32,
    /// Ticker symbol understood by the price oracle.
    pub oracle_ticker: &'static str,
}

pub const SUPPORTED_PAIRS: &[TokenPair] = &[
    TokenPair {
        symbol: "ETH",
        base: WETH_BASE,
        base_decimals: 18,
        quote: USDC_BASE,
        quote_decimals: 6,
        oracle_ticker: "ETHUSDC",
    },
    TokenPair {
        symbol: "BTC",
        base: CBBTC_BASE,
        base_decimals: 8,
        quote: USDC_BASE,
        quote_decimals: 6,
        oracle_ticker: "BTCUSDC",
    },
];

pub fn resolve_pair(symbol: &str) -> Option<&'static TokenPair> {
    SUPPORTED_PAIRS
        .iter()
        .find(|p| p.symbol.eq_ignore_ascii_case(symbol))
}

pub fn supported_symbols() -> Vec<&'static str> {
    SUPPORTED_PAIRS.iter().map(|p| p.symbol).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_pair_is_case_insensitive() {
        assert!(resolve_pair("eth").is_some());
        assert!(resolve_pair("ETH").is_some());
        assert!(resolve_pair("DOGE").is_none());
    }

    #[test]
    fn all_pairs_quote_in_usdc() {
        for pair in SUPPORTED_PAIRS {
            assert_eq!(pair.quote, USDC_BASE);
            assert_eq!(pair.quote_decimals, 6);
        }
    }
}
