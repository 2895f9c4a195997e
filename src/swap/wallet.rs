//! The single server-held signing identity used for every swap

use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    primitives::Address,
    providers::Provider,
    rpc::types::eth::{TransactionReceipt, TransactionRequest},
    signers::local::PrivateKeySigner,
};
use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::{Config, DEFAULT_GAS_LIMIT, EXECUTION_TIMEOUT_SECS};
use crate::errors::RelayResult;
use crate::network::FallbackProvider;

/// Execution wallet shared by all users' swaps. Nonce assignment and
/// submission are serialized behind one async mutex so concurrent requests
/// cannot race on the same nonce.
pub struct ExecutionWallet {
    wallet: EthereumWallet,
    address: Address,
    chain_id: u64,
    max_fee_per_gas: u128,
    receipt_timeout: Duration,
    submit_lock: Mutex<()>,
}

impl ExecutionWallet {
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        let Some(pk) = &config.private_key else {
            return Ok(None);
        };

        let signer = PrivateKeySigner::from_str(pk).context("Failed to parse private key")?;
        let address = signer.address();
        info!("🔑 Execution wallet: {address}");

        Ok(Some(Self {
            wallet: EthereumWallet::from(signer),
            address,
            chain_id: config.chain_id,
            max_fee_per_gas: config.max_gas_price_gwei as u128 * 1_000_000_000,
            receipt_timeout: Duration::from_secs(EXECUTION_TIMEOUT_SECS),
            submit_lock: Mutex::new(()),
        }))
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign and submit a contract call, then wait for its receipt. Holds the
    /// submit lock from nonce fetch through submission.
    pub async fn submit(
        &self,
        fallback: &FallbackProvider,
        to: Address,
        input: Vec<u8>,
        op_name: &str,
    ) -> RelayResult<TransactionReceipt> {
        let _guard = self.submit_lock.lock().await;

        let address = self.address;
        let nonce = fallback
            .try_each("get_transaction_count", |provider| async move {
                provider
                    .get_transaction_count(address)
                    .await
                    .context("Failed to get transaction count")
            })
            .await?;

        let tx = TransactionRequest::default()
            .to(to)
            .input(input.into())
            .with_nonce(nonce)
            .with_chain_id(self.chain_id)
            .gas_limit(DEFAULT_GAS_LIMIT)
            .max_fee_per_gas(self.max_fee_per_gas)
            .max_priority_fee_per_gas(1_000_000_000); // 1 gwei

        let envelope = tx
            .build(&self.wallet)
            .await
            .map_err(|e| crate::errors::RelayError::Network {
                message: format!("failed to sign {op_name} transaction"),
                source: Some(e.into()),
                retry_count: 0,
            })?;

        info!("📤 Submitting {} as {} (nonce {})", op_name, self.address, nonce);

        let receipt_timeout = self.receipt_timeout;
        let receipt = fallback
            .try_each_timeout(op_name, receipt_timeout + Duration::from_secs(5), |provider| {
                let envelope = envelope.clone();
                async move {
                    let pending = provider
                        .send_tx_envelope(envelope)
                        .await
                        .context("Failed to send transaction")?;

                    tokio::select! {
                        result = pending.get_receipt() => {
                            result.context("Failed to fetch transaction receipt")
                        }
                        _ = tokio::time::sleep(receipt_timeout) => {
                            Err(anyhow::anyhow!(
                                "Transaction timeout after {} seconds",
                                receipt_timeout.as_secs()
                            ))
                        }
                    }
                }
            })
            .await?;

        info!("✅ {} confirmed: {:?}", op_name, receipt.transaction_hash);
        Ok(receipt)
    }
}
