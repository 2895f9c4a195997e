//! Payment requirement, request and proof types (x402-style)

use serde::{Deserialize, Serialize};

/// Machine-readable requirements returned with an HTTP 402 so a calling
/// agent can satisfy the payment and retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    pub price: String,
    pub currency: String,
    pub network: String,
    pub pay_to: String,
    pub description: String,
    pub timeout_seconds: u64,
}

/// Payment request attached to a freshly created trade intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub id: String,
    pub amount: String,
    pub currency: String,
    pub network: String,
    pub pay_to: String,
    pub description: String,
}

/// Decoded `X-PAYMENT` header body. Settlement verification is the external
/// facilitator's contract; the relay validates structure and network only.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProof {
    pub x402_version: u32,
    pub scheme: String,
    pub network: String,
    pub payload: PaymentPayload,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub authorization: Option<serde_json::Value>,
}

/// The payment information handed to a gated handler once the proof has
/// been accepted.
#[derive(Debug, Clone)]
pub struct VerifiedPayment {
    pub payment_id: String,
    pub scheme: String,
    pub network: String,
}
