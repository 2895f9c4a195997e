//! Transient-vs-fatal error classification for retry decisions

/// Error message fragments that indicate a transient condition worth retrying.
const RETRYABLE_PATTERNS: &[&str] = &[
    "timeout",
    "timed out",
    "rate limit",
    "too many requests",
    "429",
    "503",
    "connection reset",
    "connection refused",
    "temporarily unavailable",
    "nonce too low",
    "replacement transaction underpriced",
];

/// Error message fragments that must never be retried.
const FATAL_PATTERNS: &[&str] = &[
    "insufficient funds",
    "execution reverted",
    "user rejected",
    "user denied",
    "invalid signature",
    "invalid address",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Retryable,
    Fatal,
}

/// Classify an error by its message. Anything matching the fatal table, and
/// anything that matches neither table, fails fast.
pub fn classify_error_message(message: &str) -> ErrorClass {
    let lower = message.to_lowercase();

    if FATAL_PATTERNS.iter().any(|p| lower.contains(p)) {
        return ErrorClass::Fatal;
    }
    if RETRYABLE_PATTERNS.iter().any(|p| lower.contains(p)) {
        return ErrorClass::Retryable;
    }
    ErrorClass::Fatal
}

pub fn is_retryable(error: &anyhow::Error) -> bool {
    classify_error_message(&format!("{error:#}")) == ErrorClass::Retryable
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_funds_is_fatal() {
        assert_eq!(
            classify_error_message("insufficient funds for gas * price + value"),
            ErrorClass::Fatal
        );
    }

    #[test]
    fn timeout_is_retryable() {
        assert_eq!(
            classify_error_message("request timeout after 10s"),
            ErrorClass::Retryable
        );
        assert_eq!(
            classify_error_message("deadline timed out"),
            ErrorClass::Retryable
        );
    }

    #[test]
    fn rate_limits_are_retryable() {
        assert_eq!(
            classify_error_message("HTTP 429 Too Many Requests"),
            ErrorClass::Retryable
        );
    }

    #[test]
    fn nonce_errors_are_retryable() {
        assert_eq!(
            classify_error_message("nonce too low: next nonce 42"),
            ErrorClass::Retryable
        );
        assert_eq!(
            classify_error_message("replacement transaction underpriced"),
            ErrorClass::Retryable
        );
    }

    #[test]
    fn reverted_execution_is_fatal_even_with_timeout_noise() {
        // Fatal table wins when both match
        assert_eq!(
            classify_error_message("execution reverted after timeout"),
            ErrorClass::Fatal
        );
    }

    #[test]
    fn unclassified_errors_fail_fast() {
        assert_eq!(
            classify_error_message("something entirely novel happened"),
            ErrorClass::Fatal
        );
    }
}
