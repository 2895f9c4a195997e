//! Maps relay errors onto HTTP responses

use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::errors::RelayError;

fn status_for(err: &RelayError) -> StatusCode {
    match err {
        RelayError::Validation { .. }
        | RelayError::UnsupportedSymbol { .. }
        | RelayError::InsufficientBalance { .. }
        | RelayError::InsufficientAllowance { .. } => StatusCode::BAD_REQUEST,
        RelayError::NotFound { .. } => StatusCode::NOT_FOUND,
        RelayError::PaymentRequired { .. } => StatusCode::PAYMENT_REQUIRED,
        RelayError::SwapReverted { .. }
        | RelayError::QuoteUnavailable { .. }
        | RelayError::RpcExhausted { .. }
        | RelayError::Network { .. }
        | RelayError::Contract { .. } => StatusCode::BAD_GATEWAY,
        RelayError::Storage { .. } | RelayError::Internal { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// What a production client is allowed to see. Infrastructure errors are
/// collapsed to a generic message so internals never leak.
fn public_message(err: &RelayError) -> String {
    match err {
        RelayError::RpcExhausted { .. } | RelayError::Network { .. } => {
            "upstream network unavailable".to_string()
        }
        RelayError::Contract { .. } => "contract interaction failed".to_string(),
        RelayError::Storage { .. } | RelayError::Internal { .. } => {
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

/// Full error chain, for dev mode only.
fn detailed_message(err: &RelayError) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(&format!(": {cause}"));
        source = cause.source();
    }
    message
}

/// Render a relay error as an HTTP response. A payment-required error
/// carries machine-readable requirements in the x402 shape so the caller
/// can settle and retry; everything else is a plain error body.
pub fn error_response(err: RelayError, dev_mode: bool) -> Response {
    if let RelayError::PaymentRequired { requirements } = &err {
        let challenge = format!(
            "X-402 price=\"{}\", network=\"{}\", payTo=\"{}\"",
            requirements.price, requirements.network, requirements.pay_to
        );
        let body = json!({
            "x402Version": 1,
            "error": "payment required",
            "accepts": [requirements],
        });
        let mut response = (StatusCode::PAYMENT_REQUIRED, Json(body)).into_response();
        if let Ok(value) = header::HeaderValue::from_str(&challenge) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, value);
        }
        return response;
    }

    let status = status_for(&err);
    let message = if dev_mode {
        detailed_message(&err)
    } else {
        public_message(&err)
    };
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentRequirements;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn requirements() -> PaymentRequirements {
        PaymentRequirements {
            price: "0.100000".to_string(),
            currency: "USDC".to_string(),
            network: "base".to_string(),
            pay_to: "0x0000000000000000000000000000000000000001".to_string(),
            description: "test".to_string(),
            timeout_seconds: 300,
        }
    }

    #[tokio::test]
    async fn payment_required_carries_requirements() {
        let response = error_response(
            RelayError::PaymentRequired {
                requirements: requirements(),
            },
            false,
        );
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

        let challenge = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(challenge.contains("price=\"0.100000\""));
        assert!(challenge.contains("network=\"base\""));

        let body = body_json(response).await;
        assert_eq!(body["x402Version"], 1);
        assert_eq!(body["accepts"][0]["price"], "0.100000");
        assert_eq!(body["accepts"][0]["network"], "base");
    }

    #[tokio::test]
    async fn client_errors_keep_their_message() {
        let response = error_response(RelayError::validation("size must be positive"), false);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Validation failed: size must be positive");
    }

    #[tokio::test]
    async fn infrastructure_detail_is_hidden_outside_dev_mode() {
        let err = || RelayError::storage("query failed", anyhow::anyhow!("disk on fire"));

        let body = body_json(error_response(err(), false)).await;
        assert_eq!(body["error"], "internal server error");

        let body = body_json(error_response(err(), true)).await;
        let detail = body["error"].as_str().unwrap();
        assert!(detail.contains("query failed"));
        assert!(detail.contains("disk on fire"));
    }

    #[test]
    fn allowance_shortfalls_surface_with_remediation_detail() {
        use alloy::primitives::address;
        use rust_decimal_macros::dec;

        let err = RelayError::InsufficientAllowance {
            token: "USDC".to_string(),
            router: address!("4752ba5DBc23f44D87826276BF6Fd6b1C372aD24"),
            needed: dec!(25),
            approved: dec!(0),
        };
        assert_eq!(status_for(&err), StatusCode::BAD_REQUEST);
        let message = public_message(&err);
        assert!(message.contains("USDC"));
        assert!(message.contains("need 25"));
    }

    #[test]
    fn upstream_failures_map_to_bad_gateway() {
        let err = RelayError::RpcExhausted {
            endpoints: vec!["http://a".to_string()],
            details: vec!["http://a: refused".to_string()],
        };
        assert_eq!(status_for(&err), StatusCode::BAD_GATEWAY);
        assert_eq!(public_message(&err), "upstream network unavailable");
    }
}
