use thiserror::Error;

/// Terminal, classified failure of one generate run. Every provider-side
/// variant carries an actionable message and keeps the raw provider text in
/// `detail` for diagnostics.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerateError {
    #[error("{0}")]
    InvalidInput(String),

    #[error(
        "insufficient_quota: your account has reached its quota. \
         Check billing at https://platform.openai.com/account/billing/overview ({detail})"
    )]
    Quota { detail: String },

    #[error(
        "rate limit exceeded after {attempts} attempts. Try again in a few moments. ({detail})"
    )]
    RateLimitExhausted { attempts: u32, detail: String },

    #[error(
        "request timed out after {attempts} attempts. Try again or reduce max tokens. ({detail})"
    )]
    TimeoutExhausted { attempts: u32, detail: String },

    #[error(
        "invalid_api_key: the API key provided is invalid or expired. \
         Get a new key from https://platform.openai.com/account/api-keys ({detail})"
    )]
    Auth { detail: String },

    #[error("model '{model}' is not available or not found. Try a different model. ({detail})")]
    ModelNotFound { model: String, detail: String },

    #[error("API error: {detail}")]
    Generic { detail: String },

    #[error("failed after {attempts} attempts: {detail}")]
    ExhaustedRetries { attempts: u32, detail: String },
}

impl GenerateError {
    /// Local validation failures are rendered without network-error framing.
    pub fn is_input_error(&self) -> bool {
        matches!(self, GenerateError::InvalidInput(_))
    }

    /// Raw provider text preserved for diagnostics, when one exists.
    pub fn detail(&self) -> Option<&str> {
        match self {
            GenerateError::InvalidInput(_) => None,
            GenerateError::Quota { detail }
            | GenerateError::RateLimitExhausted { detail, .. }
            | GenerateError::TimeoutExhausted { detail, .. }
            | GenerateError::Auth { detail }
            | GenerateError::ModelNotFound { detail, .. }
            | GenerateError::Generic { detail }
            | GenerateError::ExhaustedRetries { detail, .. } => Some(detail),
        }
    }
}
