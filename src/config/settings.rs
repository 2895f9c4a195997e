//! Relay configuration settings and environment variable handling

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::env;

// Fee parameters: payment for an execution is size * FEE_RATE, clamped
pub const FEE_RATE: Decimal = dec!(0.001);
pub const MIN_FEE_USD: Decimal = dec!(0.001);
pub const MAX_FEE_USD: Decimal = dec!(1.0);

// Slippage bounds
pub const DEFAULT_SLIPPAGE_BPS: u32 = 50; // 0.5%
pub const MAX_SLIPPAGE_BPS: u32 = 100; // 1%

// Execution constants
pub const DEFAULT_GAS_LIMIT: u64 = 300_000;
pub const APPROVAL_SAFETY_MULTIPLIER: u64 = 2;
pub const SWAP_DEADLINE_SECS: u64 = 1200;
pub const EXECUTION_TIMEOUT_SECS: u64 = 30;

// Payment defaults
pub const SUGGESTION_PRICE_USD: Decimal = dec!(0.10);
pub const DEFAULT_PAYMENT_TIMEOUT_SECS: u64 = 300;

// Base mainnet chain id
pub const DEFAULT_CHAIN_ID: u64 = 8453;

#[derive(Debug, Clone)]
pub struct Config {
    // HTTP surface
    pub bind_host: String,
    pub bind_port: u16,
    pub dev_mode: bool,
    // RPC access
    pub rpc_primary_url: String,
    pub rpc_fallback_urls: Vec<String>,
    pub rpc_timeout_secs: u64,
    pub chain_id: u64,
    // Swap execution
    pub swap_router: String,
    pub private_key: Option<String>,
    pub slippage_tolerance_bps: u32,
    pub max_gas_price_gwei: u32,
    // Payments
    pub payment_network: String,
    pub pay_to_address: String,
    pub payment_timeout_secs: u64,
    // Collaborators
    pub oracle_base_url: String,
    pub database_path: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            bind_host: env::var("BIND_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            bind_port: env::var("BIND_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            dev_mode: env::var("DEV_MODE")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            rpc_primary_url: env::var("RPC_PRIMARY_URL")
                .unwrap_or_else(|_| "https://mainnet.base.org".to_string()),
            rpc_fallback_urls: env::var("RPC_FALLBACK_URLS")
                .map(|s| {
                    s.split(',')
                        .map(|u| u.trim().to_string())
                        .filter(|u| !u.is_empty())
                        .collect()
                })
                .unwrap_or_else(|_| {
                    vec![
                        "https://base.llamarpc.com".to_string(),
                        "https://base-rpc.publicnode.com".to_string(),
                    ]
                }),
            rpc_timeout_secs: env::var("RPC_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10)
                .clamp(1, 60),
            chain_id: env::var("CHAIN_ID")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CHAIN_ID),
            swap_router: env::var("SWAP_ROUTER_ADDRESS")
                .unwrap_or_else(|_| "0x4752ba5DBc23f44D87826276BF6Fd6b1C372aD24".to_string()),
            private_key: env::var("EXECUTION_WALLET_KEY").ok(),
            slippage_tolerance_bps: env::var("SLIPPAGE_TOLERANCE_BPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SLIPPAGE_BPS)
                .min(MAX_SLIPPAGE_BPS),
            max_gas_price_gwei: env::var("MAX_GAS_PRICE_GWEI")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(50)
                .min(200),
            payment_network: env::var("PAYMENT_NETWORK").unwrap_or_else(|_| "base".to_string()),
            pay_to_address: env::var("PAY_TO_ADDRESS")
                .unwrap_or_else(|_| "0x0000000000000000000000000000000000000000".to_string()),
            payment_timeout_secs: env::var("PAYMENT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PAYMENT_TIMEOUT_SECS),
            oracle_base_url: env::var("ORACLE_BASE_URL")
                .unwrap_or_else(|_| "https://api.binance.com".to_string()),
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "output/relay.db".to_string()),
        }
    }

    /// Expected payment for executing a trade of the given size, clamped and
    /// rounded to 6 decimals.
    pub fn expected_payment_amount(&self, size: Decimal) -> Decimal {
        (size * FEE_RATE)
            .clamp(MIN_FEE_USD, MAX_FEE_USD)
            .round_dp(6)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
impl Config {
    /// Fixed configuration for unit tests, independent of the environment.
    pub fn for_tests() -> Self {
        Self {
            bind_host: "127.0.0.1".to_string(),
            bind_port: 0,
            dev_mode: true,
            rpc_primary_url: "http://localhost:8545".to_string(),
            rpc_fallback_urls: vec![],
            rpc_timeout_secs: 10,
            chain_id: DEFAULT_CHAIN_ID,
            swap_router: "0x4752ba5DBc23f44D87826276BF6Fd6b1C372aD24".to_string(),
            private_key: None,
            slippage_tolerance_bps: 50,
            max_gas_price_gwei: 50,
            payment_network: "base".to_string(),
            pay_to_address: "0x0000000000000000000000000000000000000001".to_string(),
            payment_timeout_secs: 300,
            oracle_base_url: "http://localhost:0".to_string(),
            database_path: ":memory:".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_config() -> Config {
        Config::for_tests()
    }

    #[test]
    fn fee_is_size_times_rate_in_normal_range() {
        let config = test_config();
        assert_eq!(
            config.expected_payment_amount(dec!(100)),
            dec!(0.1).round_dp(6)
        );
    }

    #[test]
    fn fee_clamps_to_exactly_one_dollar_above_max() {
        let config = test_config();
        // 2000 * 0.001 = 2.0 -> clamped
        let fee = config.expected_payment_amount(dec!(2000));
        assert_eq!(format!("{:.6}", fee), "1.000000");
    }

    #[test]
    fn fee_clamps_to_exactly_min_below_floor() {
        let config = test_config();
        // 0.5 * 0.001 = 0.0005 -> clamped up
        let fee = config.expected_payment_amount(dec!(0.5));
        assert_eq!(format!("{:.6}", fee), "0.001000");
    }

    proptest! {
        #[test]
        fn fee_always_within_bounds(size in 0.000001f64..1_000_000.0f64) {
            let config = test_config();
            let size = Decimal::from_f64(size).unwrap();
            let fee = config.expected_payment_amount(size);
            prop_assert!(fee >= MIN_FEE_USD);
            prop_assert!(fee <= MAX_FEE_USD);
        }
    }
}
