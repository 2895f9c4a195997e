//! Read-time PnL: sells close prior buys, open buys are priced at spot

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

use crate::types::{EnrichedTrade, ExecutedTrade, PnlKind, PnlReport, Side, TradeIntent};

/// A sell closes a buy when their sizes differ by at most this fraction of
/// the sell size.
const SIZE_TOLERANCE: Decimal = dec!(0.2);

struct OpenBuy {
    idx: usize,
    size: Decimal,
    price: Decimal,
}

fn realized(value: Decimal) -> PnlReport {
    PnlReport {
        kind: PnlKind::Realized,
        value: Some(value),
        is_profit: Some(value > Decimal::ZERO),
    }
}

/// Compute PnL for a newest-first trade listing. Nothing here is persisted;
/// the same rows always produce the same reports for the same spot prices.
///
/// Walking oldest to newest, each buy opens a position keyed by user and
/// symbol. A sell closes the most recent open buy of comparable size and
/// both sides report the realized difference. Buys still open at the end
/// report unrealized PnL against `spot_prices`, or no value when the symbol
/// has no spot price. Sells with no matching buy carry no report.
pub fn enrich_with_pnl(
    rows: Vec<(ExecutedTrade, Option<TradeIntent>)>,
    spot_prices: &HashMap<String, Decimal>,
) -> Vec<EnrichedTrade> {
    let n = rows.len();
    let mut reports: Vec<Option<PnlReport>> = vec![None; n];
    let mut open_buys: HashMap<(String, String), Vec<OpenBuy>> = HashMap::new();

    for idx in (0..n).rev() {
        let (trade, Some(intent)) = &rows[idx] else {
            continue;
        };
        let key = (intent.user_address.clone(), intent.symbol.clone());

        match intent.side {
            Side::Buy => open_buys.entry(key).or_default().push(OpenBuy {
                idx,
                size: intent.size,
                price: trade.execution_price,
            }),
            Side::Sell => {
                let Some(stack) = open_buys.get_mut(&key) else {
                    continue;
                };
                let tolerance = intent.size * SIZE_TOLERANCE;
                let Some(pos) = stack
                    .iter()
                    .rposition(|buy| (buy.size - intent.size).abs() <= tolerance)
                else {
                    continue;
                };

                let buy = stack.remove(pos);
                let value = (trade.execution_price - buy.price) * intent.size;
                reports[idx] = Some(realized(value));
                reports[buy.idx] = Some(realized(value));
            }
        }
    }

    for stack in open_buys.into_values() {
        for buy in stack {
            let (_, Some(intent)) = &rows[buy.idx] else {
                continue;
            };
            let value = spot_prices
                .get(&intent.symbol)
                .map(|spot| (*spot - buy.price) * buy.size);
            reports[buy.idx] = Some(PnlReport {
                kind: PnlKind::Unrealized,
                is_profit: value.map(|v| v > Decimal::ZERO),
                value,
            });
        }
    }

    rows.into_iter()
        .zip(reports)
        .map(|((trade, trade_intent), pnl)| EnrichedTrade {
            trade,
            trade_intent,
            pnl,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;
    use crate::types::{IntentStatus, PaymentStatus};

    fn row(
        id: &str,
        user: &str,
        symbol: &str,
        side: Side,
        size: Decimal,
        price: Decimal,
        age_secs: i64,
    ) -> (ExecutedTrade, Option<TradeIntent>) {
        let trade = ExecutedTrade {
            id: id.to_string(),
            trade_intent_id: format!("intent-{id}"),
            payment_id: format!("pay-{id}"),
            payment_status: PaymentStatus::Paid,
            tx_hash: format!("0x{id}"),
            execution_price: price,
            completed_at: Utc::now() - Duration::seconds(age_secs),
            status: IntentStatus::Executed,
        };
        let intent = TradeIntent {
            id: format!("intent-{id}"),
            user_address: user.to_string(),
            agent_id: "trend-follower".to_string(),
            symbol: symbol.to_string(),
            side,
            size,
            leverage: 1,
            expected_payment_amount: "0.001000".to_string(),
            status: IntentStatus::Executed,
            payment_request_id: None,
            paid_payment_id: Some(format!("pay-{id}")),
            created_at: Utc::now() - Duration::seconds(age_secs + 1),
        };
        (trade, Some(intent))
    }

    const ALICE: &str = "0x1111111111111111111111111111111111111111";
    const BOB: &str = "0x2222222222222222222222222222222222222222";

    #[test]
    fn sell_realizes_against_prior_buy() {
        // Newest first: sell 0.01 @ 51000 after buy 0.01 @ 50000
        let rows = vec![
            row("sell", ALICE, "BTC", Side::Sell, dec!(0.01), dec!(51000), 0),
            row("buy", ALICE, "BTC", Side::Buy, dec!(0.01), dec!(50000), 60),
        ];

        let enriched = enrich_with_pnl(rows, &HashMap::new());

        let sell = enriched[0].pnl.as_ref().unwrap();
        assert_eq!(sell.kind, PnlKind::Realized);
        assert_eq!(sell.value, Some(dec!(10)));
        assert_eq!(sell.is_profit, Some(true));

        // The matched buy is closed, never reported as an open position
        let buy = enriched[1].pnl.as_ref().unwrap();
        assert_eq!(buy.kind, PnlKind::Realized);
    }

    #[test]
    fn sell_matches_the_most_recent_comparable_buy() {
        let rows = vec![
            row("sell", ALICE, "ETH", Side::Sell, dec!(0.1), dec!(2600), 0),
            row("buy2", ALICE, "ETH", Side::Buy, dec!(0.1), dec!(2550), 60),
            row("buy1", ALICE, "ETH", Side::Buy, dec!(0.1), dec!(2500), 120),
        ];
        let mut spot = HashMap::new();
        spot.insert("ETH".to_string(), dec!(2600));

        let enriched = enrich_with_pnl(rows, &spot);

        // (2600 - 2550) * 0.1 against the later buy
        assert_eq!(enriched[0].pnl.as_ref().unwrap().value, Some(dec!(5.0)));
        assert_eq!(enriched[1].pnl.as_ref().unwrap().kind, PnlKind::Realized);
        // The earlier buy stays open
        assert_eq!(enriched[2].pnl.as_ref().unwrap().kind, PnlKind::Unrealized);
    }

    #[test]
    fn size_outside_tolerance_does_not_match() {
        // |0.01 - 0.013| = 0.003 > 0.2 * 0.013
        let rows = vec![
            row("sell", ALICE, "BTC", Side::Sell, dec!(0.013), dec!(51000), 0),
            row("buy", ALICE, "BTC", Side::Buy, dec!(0.01), dec!(50000), 60),
        ];

        let enriched = enrich_with_pnl(rows, &HashMap::new());

        assert!(enriched[0].pnl.is_none());
        assert_eq!(enriched[1].pnl.as_ref().unwrap().kind, PnlKind::Unrealized);
    }

    #[test]
    fn positions_never_cross_users() {
        let rows = vec![
            row("sell", BOB, "BTC", Side::Sell, dec!(0.01), dec!(51000), 0),
            row("buy", ALICE, "BTC", Side::Buy, dec!(0.01), dec!(50000), 60),
        ];

        let enriched = enrich_with_pnl(rows, &HashMap::new());

        assert!(enriched[0].pnl.is_none());
        assert_eq!(enriched[1].pnl.as_ref().unwrap().kind, PnlKind::Unrealized);
    }

    #[test]
    fn open_buy_is_priced_at_spot_or_not_at_all() {
        let rows = vec![row("buy", ALICE, "ETH", Side::Buy, dec!(2), dec!(2500), 0)];

        let mut spot = HashMap::new();
        spot.insert("ETH".to_string(), dec!(2400));
        let enriched = enrich_with_pnl(rows.clone(), &spot);
        let pnl = enriched[0].pnl.as_ref().unwrap();
        assert_eq!(pnl.kind, PnlKind::Unrealized);
        assert_eq!(pnl.value, Some(dec!(-200)));
        assert_eq!(pnl.is_profit, Some(false));

        // No spot price: the position is reported but not valued
        let enriched = enrich_with_pnl(rows, &HashMap::new());
        let pnl = enriched[0].pnl.as_ref().unwrap();
        assert_eq!(pnl.kind, PnlKind::Unrealized);
        assert_eq!(pnl.value, None);
        assert_eq!(pnl.is_profit, None);
    }
}
