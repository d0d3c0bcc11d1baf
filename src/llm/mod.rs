mod client;
mod error;
mod generate;
pub mod types;

pub use client::*;
pub use error::*;
pub use generate::*;
pub use types::*;

/// Failure category of a single completion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Quota,
    RateLimit,
    Auth,
    ModelNotFound,
    Timeout,
    Generic,
}

impl ErrorClass {
    pub fn is_retriable(self) -> bool {
        matches!(self, ErrorClass::RateLimit | ErrorClass::Timeout)
    }

    /// Only quota exhaustion is eligible for the one-shot model fallback.
    pub fn triggers_fallback(self) -> bool {
        matches!(self, ErrorClass::Quota)
    }
}

/// Classify a raw provider error message by case-insensitive substring
/// matching. First match wins; the order resolves messages that match more
/// than one category.
pub fn classify_message(raw: &str) -> ErrorClass {
    let msg = raw.to_lowercase();
    if msg.contains("insufficient_quota") || (msg.contains("quota") && msg.contains("exceeded")) {
        return ErrorClass::Quota;
    }
    if msg.contains("error code: 429") || msg.contains("rate_limit") || msg.contains("rate limit") {
        return ErrorClass::RateLimit;
    }
    if msg.contains("invalid_api_key")
        || msg.contains("authentication")
        || msg.contains("unauthorized")
    {
        return ErrorClass::Auth;
    }
    if msg.contains("model_not_found") || msg.contains("does not exist") {
        return ErrorClass::ModelNotFound;
    }
    if msg.contains("timeout") || msg.contains("timed out") {
        return ErrorClass::Timeout;
    }
    ErrorClass::Generic
}
