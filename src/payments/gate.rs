//! The payment gate blocks handler execution until proof of payment arrives

use axum::http::HeaderMap;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::Config;
use crate::errors::{RelayError, RelayResult};
use crate::types::{PaymentProof, PaymentRequest, PaymentRequirements, VerifiedPayment};

/// Header carrying the base64-encoded payment proof, x402 style.
pub const PAYMENT_HEADER: &str = "X-PAYMENT";

#[derive(Debug, Clone)]
pub struct PaymentGateConfig {
    pub price: Decimal,
    pub currency: String,
    pub network: String,
    pub pay_to: String,
    pub description: String,
    pub timeout_secs: u64,
}

impl PaymentGateConfig {
    pub fn from_config(config: &Config, price: Decimal, description: impl Into<String>) -> Self {
        Self {
            price,
            currency: "USDC".to_string(),
            network: config.payment_network.clone(),
            pay_to: config.pay_to_address.clone(),
            description: description.into(),
            timeout_secs: config.payment_timeout_secs,
        }
    }

    pub fn requirements(&self) -> PaymentRequirements {
        PaymentRequirements {
            price: format!("{:.6}", self.price),
            currency: self.currency.clone(),
            network: self.network.clone(),
            pay_to: self.pay_to.clone(),
            description: self.description.clone(),
            timeout_seconds: self.timeout_secs,
        }
    }
}

/// Inspects inbound headers for proof of a completed micropayment and only
/// lets the wrapped handler run when one is present. Settlement itself is
/// the external facilitator's contract; the gate validates structure and
/// network and fails closed on anything ambiguous.
pub struct PaymentGate {
    config: PaymentGateConfig,
}

impl PaymentGate {
    pub fn new(config: PaymentGateConfig) -> Self {
        Self { config }
    }

    pub fn requirements(&self) -> PaymentRequirements {
        self.config.requirements()
    }

    /// Accept or reject the request's payment proof. Absent, undecodable or
    /// wrong-network proofs all yield the same 402 with machine-readable
    /// requirements.
    pub fn require(&self, headers: &HeaderMap) -> RelayResult<VerifiedPayment> {
        let raw = headers
            .get(PAYMENT_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| self.payment_required("missing payment header"))?;

        self.decode_proof(raw)
            .map_err(|reason| self.payment_required(&reason))
    }

    fn decode_proof(&self, raw: &str) -> Result<VerifiedPayment, String> {
        let bytes = BASE64
            .decode(raw.trim())
            .map_err(|e| format!("payment header is not valid base64: {e}"))?;

        let proof: PaymentProof = serde_json::from_slice(&bytes)
            .map_err(|e| format!("payment proof is not valid JSON: {e}"))?;

        if !proof.network.eq_ignore_ascii_case(&self.config.network) {
            return Err(format!(
                "payment network mismatch: got {}, expected {}",
                proof.network, self.config.network
            ));
        }
        if proof.scheme.is_empty() {
            return Err("payment proof has an empty scheme".to_string());
        }

        // A proof must name the payment it claims; an unidentifiable proof
        // is ambiguous input and fails closed.
        let payment_id = proof
            .payload
            .payment_id
            .clone()
            .filter(|id| !id.is_empty())
            .or_else(|| proof.payload.signature.clone().filter(|s| !s.is_empty()))
            .ok_or_else(|| "payment proof carries no payment id or signature".to_string())?;

        Ok(VerifiedPayment {
            payment_id,
            scheme: proof.scheme,
            network: proof.network,
        })
    }

    fn payment_required(&self, reason: &str) -> RelayError {
        debug!("Payment gate closed: {}", reason);
        RelayError::PaymentRequired {
            requirements: self.requirements(),
        }
    }
}

/// Payment request attached to a newly created trade intent so the caller
/// knows what to pay before asking for execution.
pub fn build_payment_request(
    config: &Config,
    amount: &str,
    description: impl Into<String>,
) -> PaymentRequest {
    PaymentRequest {
        id: uuid::Uuid::new_v4().to_string(),
        amount: amount.to_string(),
        currency: "USDC".to_string(),
        network: config.payment_network.clone(),
        pay_to: config.pay_to_address.clone(),
        description: description.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use rust_decimal_macros::dec;

    fn gate() -> PaymentGate {
        PaymentGate::new(PaymentGateConfig {
            price: dec!(0.10),
            currency: "USDC".to_string(),
            network: "base".to_string(),
            pay_to: "0x0000000000000000000000000000000000000001".to_string(),
            description: "test".to_string(),
            timeout_secs: 300,
        })
    }

    fn proof_header(network: &str, payment_id: &str) -> HeaderValue {
        let body = serde_json::json!({
            "x402Version": 1,
            "scheme": "exact",
            "network": network,
            "payload": { "paymentId": payment_id }
        });
        HeaderValue::from_str(&BASE64.encode(body.to_string())).unwrap()
    }

    #[test]
    fn missing_header_yields_requirements() {
        let headers = HeaderMap::new();
        match gate().require(&headers) {
            Err(RelayError::PaymentRequired { requirements }) => {
                assert_eq!(requirements.price, "0.100000");
                assert_eq!(requirements.network, "base");
            }
            other => panic!("expected PaymentRequired, got {other:?}"),
        }
    }

    #[test]
    fn malformed_header_fails_closed() {
        let mut headers = HeaderMap::new();
        headers.insert(PAYMENT_HEADER, HeaderValue::from_static("%%%not-base64%%%"));
        assert!(matches!(
            gate().require(&headers),
            Err(RelayError::PaymentRequired { .. })
        ));

        headers.insert(
            PAYMENT_HEADER,
            HeaderValue::from_str(&BASE64.encode("{\"not\": \"a proof\"}")).unwrap(),
        );
        assert!(matches!(
            gate().require(&headers),
            Err(RelayError::PaymentRequired { .. })
        ));
    }

    #[test]
    fn wrong_network_fails_closed() {
        let mut headers = HeaderMap::new();
        headers.insert(PAYMENT_HEADER, proof_header("ethereum", "pay-1"));
        assert!(matches!(
            gate().require(&headers),
            Err(RelayError::PaymentRequired { .. })
        ));
    }

    #[test]
    fn proof_without_an_identifying_payload_fails_closed() {
        let body = serde_json::json!({
            "x402Version": 1,
            "scheme": "exact",
            "network": "base",
            "payload": {}
        });
        let mut headers = HeaderMap::new();
        headers.insert(
            PAYMENT_HEADER,
            HeaderValue::from_str(&BASE64.encode(body.to_string())).unwrap(),
        );
        assert!(matches!(
            gate().require(&headers),
            Err(RelayError::PaymentRequired { .. })
        ));

        // An empty-string id is just as unidentifiable
        let body = serde_json::json!({
            "x402Version": 1,
            "scheme": "exact",
            "network": "base",
            "payload": { "paymentId": "" }
        });
        headers.insert(
            PAYMENT_HEADER,
            HeaderValue::from_str(&BASE64.encode(body.to_string())).unwrap(),
        );
        assert!(matches!(
            gate().require(&headers),
            Err(RelayError::PaymentRequired { .. })
        ));
    }

    #[test]
    fn valid_proof_passes_through_payment_id() {
        let mut headers = HeaderMap::new();
        headers.insert(PAYMENT_HEADER, proof_header("base", "pay-42"));

        let verified = gate().require(&headers).unwrap();
        assert_eq!(verified.payment_id, "pay-42");
        assert_eq!(verified.scheme, "exact");
    }
}
