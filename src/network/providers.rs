//! Provider setup and ordered RPC fallback

use alloy::{
    primitives::Bytes,
    providers::{Provider, ProviderBuilder},
    rpc::types::eth::TransactionRequest,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use crate::{
    config::Config,
    errors::{RelayError, RelayResult},
    network::retry::{retry_with_backoff, RetryConfig},
    ConcreteProvider,
};

pub fn build_provider(url: &str) -> Result<Arc<ConcreteProvider>> {
    let provider: Arc<ConcreteProvider> = Arc::new(
        ProviderBuilder::new()
            .on_http(url.parse().with_context(|| format!("invalid RPC url: {url}"))?)
            .boxed(),
    );
    Ok(provider)
}

struct RpcEndpoint {
    url: String,
    provider: Arc<ConcreteProvider>,
}

/// Ordered list of JSON-RPC endpoints. Every call tries the primary first,
/// then each fallback in configured order; the first success wins.
pub struct FallbackProvider {
    endpoints: Vec<RpcEndpoint>,
    call_timeout: Duration,
}

impl FallbackProvider {
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut endpoints = Vec::new();
        for url in std::iter::once(&config.rpc_primary_url).chain(&config.rpc_fallback_urls) {
            endpoints.push(RpcEndpoint {
                url: url.clone(),
                provider: build_provider(url)?,
            });
        }
        Ok(Self {
            endpoints,
            call_timeout: Duration::from_secs(config.rpc_timeout_secs),
        })
    }

    #[cfg(test)]
    pub fn for_tests(urls: &[&str], call_timeout: Duration) -> Self {
        let endpoints = urls
            .iter()
            .map(|url| RpcEndpoint {
                url: url.to_string(),
                provider: build_provider(url).expect("test url"),
            })
            .collect();
        Self {
            endpoints,
            call_timeout,
        }
    }

    pub fn endpoint_urls(&self) -> Vec<String> {
        self.endpoints.iter().map(|e| e.url.clone()).collect()
    }

    /// Run `operation` against each endpoint in order until one succeeds.
    /// Exhausting every endpoint surfaces an aggregated error naming each
    /// one tried and why it failed.
    pub async fn try_each<T, F, Fut>(&self, op_name: &str, operation: F) -> RelayResult<T>
    where
        F: Fn(Arc<ConcreteProvider>) -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        self.try_each_timeout(op_name, self.call_timeout, operation)
            .await
    }

    /// Same as [`try_each`](Self::try_each) with an explicit per-endpoint
    /// timeout, for operations that legitimately outlive the read timeout
    /// (waiting on a transaction receipt).
    pub async fn try_each_timeout<T, F, Fut>(
        &self,
        op_name: &str,
        timeout: Duration,
        operation: F,
    ) -> RelayResult<T>
    where
        F: Fn(Arc<ConcreteProvider>) -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut details = Vec::with_capacity(self.endpoints.len());

        for endpoint in &self.endpoints {
            match tokio::time::timeout(timeout, operation(endpoint.provider.clone())).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => {
                    warn!("RPC {} failed on {}: {:#}", op_name, endpoint.url, e);
                    details.push(format!("{}: {:#}", endpoint.url, e));
                }
                Err(_) => {
                    warn!(
                        "RPC {} timed out on {} after {:?}",
                        op_name, endpoint.url, timeout
                    );
                    details.push(format!("{}: timed out after {:?}", endpoint.url, timeout));
                }
            }
        }

        Err(RelayError::RpcExhausted {
            endpoints: self.endpoint_urls(),
            details,
        })
    }

    pub async fn get_block_number(&self) -> RelayResult<u64> {
        self.try_each("get_block_number", |provider| async move {
            provider
                .get_block_number()
                .await
                .context("Failed to get block number")
        })
        .await
    }

    /// eth_call against the latest block, with fallback.
    pub async fn call(&self, tx: &TransactionRequest, op_name: &str) -> RelayResult<Bytes> {
        self.try_each(op_name, |provider| {
            let tx = tx.clone();
            async move {
                provider
                    .call(&tx)
                    .await
                    .with_context(|| "eth_call failed".to_string())
            }
        })
        .await
    }
}

/// Probe the chain at startup, retrying transient failures, so the service
/// refuses to come up against a dead RPC set.
pub async fn probe_chain(fallback: &FallbackProvider) -> Result<u64> {
    info!("🔗 Testing connection to Base network...");
    let block = retry_with_backoff(
        || async {
            fallback
                .get_block_number()
                .await
                .map_err(|e| anyhow::anyhow!("connection timed out: {e}"))
        },
        &RetryConfig {
            max_attempts: 5,
            initial_delay_ms: 500,
            max_delay_ms: 10000,
            exponential_base: 2.0,
        },
        "Base network connection",
    )
    .await
    .map_err(|e| {
        warn!("⚠️ Network connection attempt failed: {}", e);
        anyhow::anyhow!("Network connection failed: {}", e)
    })?;

    info!("✅ Connected to Base at block {}", block);
    Ok(block)
}
