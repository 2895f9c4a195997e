//! Mathematical utility functions

use alloy::primitives::U256;
use anyhow::{Context, Result};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

pub fn pow10(n: i32) -> Decimal {
    match n {
        0 => dec!(1),
        6 => dec!(1_000_000),
        8 => dec!(100_000_000),
        18 => dec!(1_000_000_000_000_000_000),
        _ => {
            let mut result = dec!(1);
            if n > 0 {
                for _ in 0..n {
                    result *= dec!(10);
                }
            } else {
                for _ in 0..(-n) {
                    result /= dec!(10);
                }
            }
            result
        }
    }
}

/// Convert a human-readable amount into integer base units for a token with
/// the given decimal count. Fails on negative amounts and on overflow.
pub fn to_base_units(amount: Decimal, decimals: u32) -> Result<U256> {
    if amount < dec!(0) {
        anyhow::bail!("amount must be non-negative, got {amount}");
    }
    let scaled = (amount * pow10(decimals as i32)).trunc();
    let units = scaled
        .to_u128()
        .with_context(|| format!("amount {amount} does not fit in token base units"))?;
    Ok(U256::from(units))
}

/// Convert integer base units back into a human-readable decimal amount.
pub fn from_base_units(units: U256, decimals: u32) -> Result<Decimal> {
    let raw = Decimal::from_str(&units.to_string())
        .with_context(|| format!("base units {units} exceed decimal precision"))?;
    Ok(raw / pow10(decimals as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_unit_conversion_round_trips() {
        let amount = dec!(1.5);
        let units = to_base_units(amount, 18).unwrap();
        assert_eq!(units, U256::from(1_500_000_000_000_000_000u128));
        assert_eq!(from_base_units(units, 18).unwrap(), amount);
    }

    #[test]
    fn usdc_amounts_use_six_decimals() {
        let units = to_base_units(dec!(0.10), 6).unwrap();
        assert_eq!(units, U256::from(100_000u64));
    }

    #[test]
    fn sub_unit_dust_truncates() {
        // 6-decimal token cannot represent 1e-7
        let units = to_base_units(dec!(0.0000001), 6).unwrap();
        assert_eq!(units, U256::ZERO);
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(to_base_units(dec!(-1), 18).is_err());
    }
}
