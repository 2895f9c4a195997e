//! Deterministic rule-based strategies over a synthetic price series

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::types::Side;

const SERIES_LEN: usize = 24;
const SHORT_WINDOW: usize = 5;
const LONG_WINDOW: usize = 20;

/// The closed set of available agents. Dispatch is by variant, not by
/// runtime string lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agent {
    TrendFollower,
    BreakoutSniper,
    MeanReversion,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub symbol: String,
    pub side: Side,
    pub size: Decimal,
    pub leverage: u32,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

impl Agent {
    pub const ALL: [Agent; 3] = [
        Agent::TrendFollower,
        Agent::BreakoutSniper,
        Agent::MeanReversion,
    ];

    pub fn parse(id: &str) -> Option<Self> {
        match id {
            "trend-follower" => Some(Agent::TrendFollower),
            "breakout-sniper" => Some(Agent::BreakoutSniper),
            "mean-reversion" => Some(Agent::MeanReversion),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Agent::TrendFollower => "trend-follower",
            Agent::BreakoutSniper => "breakout-sniper",
            Agent::MeanReversion => "mean-reversion",
        }
    }

    pub fn descriptor(&self) -> AgentDescriptor {
        match self {
            Agent::TrendFollower => AgentDescriptor {
                id: self.id(),
                name: "Trend Follower",
                description: "Buys when the short moving average crosses above the long one",
            },
            Agent::BreakoutSniper => AgentDescriptor {
                id: self.id(),
                name: "Breakout Sniper",
                description: "Buys when price pushes through the recent rolling high",
            },
            Agent::MeanReversion => AgentDescriptor {
                id: self.id(),
                name: "Mean Reversion",
                description: "Fades moves that stretch far from the rolling mean",
            },
        }
    }

    /// Produce a suggestion for `symbol`, anchored at the current spot
    /// price. Same inputs always produce the same suggestion.
    pub fn suggest(&self, symbol: &str, spot: Decimal) -> Suggestion {
        let series = synthetic_series(symbol, spot);
        let last = *series.last().expect("series is never empty");

        let (side, reason) = match self {
            Agent::TrendFollower => {
                let short = mean(&series[series.len() - SHORT_WINDOW..]);
                let long = mean(&series[series.len() - LONG_WINDOW..]);
                if short > long {
                    (Side::Buy, format!("short SMA {short:.2} above long SMA {long:.2}"))
                } else {
                    (Side::Sell, format!("short SMA {short:.2} below long SMA {long:.2}"))
                }
            }
            Agent::BreakoutSniper => {
                let window = &series[..series.len() - 1];
                let high = window.iter().copied().fold(Decimal::MIN, Decimal::max);
                if last >= high * dec!(0.99) {
                    (Side::Buy, format!("price {last:.2} testing rolling high {high:.2}"))
                } else {
                    (Side::Sell, format!("price {last:.2} well under rolling high {high:.2}"))
                }
            }
            Agent::MeanReversion => {
                let avg = mean(&series);
                let deviation = mean_abs_deviation(&series, avg);
                let stretched = deviation > Decimal::ZERO
                    && (last - avg).abs() / deviation > dec!(1);
                if stretched && last > avg {
                    (Side::Sell, format!("price {last:.2} stretched above mean {avg:.2}"))
                } else {
                    (Side::Buy, format!("price {last:.2} at or below mean {avg:.2}"))
                }
            }
        };

        Suggestion {
            symbol: symbol.to_uppercase(),
            side,
            size: suggested_size(symbol),
            leverage: 1,
            reason,
        }
    }
}

fn suggested_size(symbol: &str) -> Decimal {
    match symbol.to_ascii_uppercase().as_str() {
        "BTC" => dec!(0.01),
        _ => dec!(0.1),
    }
}

fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().copied().sum::<Decimal>() / Decimal::from(values.len())
}

fn mean_abs_deviation(values: &[Decimal], avg: Decimal) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values
        .iter()
        .map(|v| (*v - avg).abs())
        .sum::<Decimal>()
        / Decimal::from(values.len())
}

/// Synthetic price path seeded from the symbol, anchored at spot. A small
/// LCG drives bounded pseudo-random steps so the path is deterministic.
fn synthetic_series(symbol: &str, anchor: Decimal) -> Vec<Decimal> {
    let mut state: u64 = symbol
        .bytes()
        .fold(0x9E37_79B9_7F4A_7C15u64, |acc, b| {
            acc.wrapping_mul(31).wrapping_add(b as u64)
        });

    let mut series = Vec::with_capacity(SERIES_LEN);
    let mut price = anchor;
    for _ in 0..SERIES_LEN {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        // Step in [-2%, +2%] of the anchor
        let step_bps = (state >> 33) % 401;
        let signed = step_bps as i64 - 200;
        price += anchor * Decimal::from(signed) / dec!(10000);
        price = price.max(anchor * dec!(0.5));
        series.push(price);
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_ids_round_trip() {
        for agent in Agent::ALL {
            assert_eq!(Agent::parse(agent.id()), Some(agent));
        }
        assert_eq!(Agent::parse("yolo-max"), None);
    }

    #[test]
    fn suggestions_are_deterministic() {
        for agent in Agent::ALL {
            let a = agent.suggest("ETH", dec!(2500));
            let b = agent.suggest("ETH", dec!(2500));
            assert_eq!(a.side, b.side);
            assert_eq!(a.reason, b.reason);
        }
    }

    #[test]
    fn suggestions_are_spot_only() {
        for agent in Agent::ALL {
            let s = agent.suggest("BTC", dec!(65000));
            assert_eq!(s.leverage, 1);
            assert!(s.size > Decimal::ZERO);
            assert_eq!(s.symbol, "BTC");
        }
    }

    #[test]
    fn series_is_anchored_and_bounded() {
        let series = synthetic_series("ETH", dec!(2500));
        assert_eq!(series.len(), SERIES_LEN);
        for price in &series {
            assert!(*price >= dec!(1250));
        }
    }
}
