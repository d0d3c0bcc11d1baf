use std::time::Duration;

use tracing::{info, warn};

use crate::llm::{
    AttemptOutcome, CompletionCall, CompletionExecutor, ErrorClass, GenerateError,
    classify_message,
};

/// Per-run sampling parameters. Validated by the config layer before a run
/// starts.
#[derive(Debug, Clone)]
pub struct CompletionParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

/// Drives up to `max_attempts` single-shot completion calls for one
/// question, classifying each failure and deciding retry, fallback, or
/// abort. All retry state lives on the stack of `generate`, so concurrent
/// runs sharing one `Generator` never interfere.
pub struct Generator<E> {
    executor: E,
    policy: RetryPolicy,
    fallback_model: String,
}

impl<E: CompletionExecutor> Generator<E> {
    pub fn new(executor: E, policy: RetryPolicy, fallback_model: impl Into<String>) -> Self {
        Self {
            executor,
            policy,
            fallback_model: fallback_model.into(),
        }
    }

    pub async fn generate(
        &self,
        question: &str,
        credential: &str,
        params: &CompletionParams,
    ) -> Result<String, GenerateError> {
        if credential.trim().is_empty() {
            return Err(GenerateError::InvalidInput(
                "API key is empty. Provide a valid API key.".into(),
            ));
        }
        if question.trim().is_empty() {
            return Err(GenerateError::InvalidInput(
                "Question cannot be empty.".into(),
            ));
        }
        // Stray whitespace around a pasted key would otherwise poison the
        // Authorization header.
        let credential = credential.trim();

        let max_attempts = self.policy.max_attempts;
        let mut backoff = self.policy.initial_backoff;
        let mut last_failure = String::new();

        for attempt in 1..=max_attempts {
            let call = CompletionCall {
                question,
                credential,
                model: &params.model,
                temperature: params.temperature,
                max_tokens: params.max_tokens,
            };
            let raw = match self.executor.invoke(call).await {
                AttemptOutcome::Success(answer) => return Ok(answer),
                AttemptOutcome::Failure(raw) => raw,
            };

            // Classify once; every decision below dispatches on the class.
            let class = classify_message(&raw);
            warn!(attempt, class = ?class, "completion attempt failed");

            if class.triggers_fallback() {
                if params.model != self.fallback_model
                    && let Some(answer) = self.try_fallback(question, credential, params).await
                {
                    return Ok(answer);
                }
                return Err(GenerateError::Quota { detail: raw });
            }

            if class.is_retriable() {
                if attempt == max_attempts {
                    return Err(match class {
                        ErrorClass::RateLimit => GenerateError::RateLimitExhausted {
                            attempts: max_attempts,
                            detail: raw,
                        },
                        _ => GenerateError::TimeoutExhausted {
                            attempts: max_attempts,
                            detail: raw,
                        },
                    });
                }
                info!(attempt, wait_secs = backoff.as_secs(), "backing off before retry");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                last_failure = raw;
                continue;
            }

            return Err(match class {
                ErrorClass::Auth => GenerateError::Auth { detail: raw },
                ErrorClass::ModelNotFound => GenerateError::ModelNotFound {
                    model: params.model.clone(),
                    detail: raw,
                },
                _ => GenerateError::Generic { detail: raw },
            });
        }

        // Unreachable given the dispatch above; kept as a terminal backstop.
        Err(GenerateError::ExhaustedRetries {
            attempts: max_attempts,
            detail: last_failure,
        })
    }

    /// One substitute call against the fallback model. A failure here is
    /// discarded; the original quota error is what the caller acts on.
    async fn try_fallback(
        &self,
        question: &str,
        credential: &str,
        params: &CompletionParams,
    ) -> Option<String> {
        info!(fallback = %self.fallback_model, "quota exhausted, trying fallback model");
        let call = CompletionCall {
            question,
            credential,
            model: &self.fallback_model,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };
        match self.executor.invoke(call).await {
            AttemptOutcome::Success(answer) => Some(format!(
                "{answer}\n\n(Note: response generated using fallback model {} due to quota limits.)",
                self.fallback_model
            )),
            AttemptOutcome::Failure(raw) => {
                warn!(err = %raw, "fallback attempt failed");
                None
            }
        }
    }
}
