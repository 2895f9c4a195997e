//! Independent market price lookups

use anyhow::Context;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;
use crate::{
    errors::{RelayError, RelayResult},
    network::retry::{retry_with_backoff, RetryConfig},
};

/// Spot price source backed by a Binance-compatible ticker endpoint. Used
/// for execution-price fallback, unrealized PnL and agent series anchoring.
pub struct PriceOracle {
    client: reqwest::Client,
    base_url: String,
}

impl PriceOracle {
    pub fn new(base_url: impl Into<String>) -> RelayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .map_err(|e| {
                warn!("⚠️ Failed to initialize HTTP client: {}", e);
                RelayError::Network {
                    message: "Failed to build HTTP client".to_string(),
                    source: Some(e.into()),
                    retry_count: 0,
                }
            })?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub async fn spot_price(&self, ticker: &str) -> RelayResult<Decimal> {
        let url = format!(
            "{}/api/v3/ticker/price?symbol={}",
            self.base_url.trim_end_matches('/'),
            ticker
        );

        let operation = || async {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .context("HTTP request failed")?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!("⚠️ Oracle returned error status {}: {}", status, body);
                return Err(anyhow::anyhow!("Oracle error: {} - {}", status, body));
            }

            let json: serde_json::Value = response
                .json()
                .await
                .context("Failed to parse JSON response")?;

            let price_str = json["price"]
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("Missing 'price' field in response"))?;

            let price = Decimal::from_str(price_str).context("Failed to parse price string")?;

            Ok(price)
        };

        let price = retry_with_backoff(
            operation,
            &RetryConfig {
                max_attempts: 3,
                initial_delay_ms: 200,
                ..Default::default()
            },
            &format!("{ticker} price fetch"),
        )
        .await?;

        if price <= dec!(0) {
            warn!("⚠️ Invalid price received for {}: {}", ticker, price);
            return Err(RelayError::Network {
                message: format!("Oracle price for {ticker} is not positive: {price}"),
                source: None,
                retry_count: 0,
            });
        }

        Ok(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spot_price_parses_ticker_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v3/ticker/price?symbol=ETHUSDC")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"symbol":"ETHUSDC","price":"2500.50"}"#)
            .create_async()
            .await;

        let oracle = PriceOracle::new(server.url()).unwrap();
        let price = oracle.spot_price("ETHUSDC").await.unwrap();

        assert_eq!(price, dec!(2500.50));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_positive_prices_are_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v3/ticker/price?symbol=ETHUSDC")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"symbol":"ETHUSDC","price":"0"}"#)
            .create_async()
            .await;

        let oracle = PriceOracle::new(server.url()).unwrap();
        assert!(oracle.spot_price("ETHUSDC").await.is_err());
    }

    #[tokio::test]
    async fn missing_price_field_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v3/ticker/price?symbol=BTCUSDC")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"symbol":"BTCUSDC"}"#)
            .expect_at_least(1)
            .create_async()
            .await;

        let oracle = PriceOracle::new(server.url()).unwrap();
        assert!(oracle.spot_price("BTCUSDC").await.is_err());
    }
}
