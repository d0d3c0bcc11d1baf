use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap};
use tracing::{debug, error};

use crate::llm::types::{ChatMessage, ChatRequest, ChatResponse};

pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that helps people find information.";

/// Outcome of one single-shot completion attempt. A failure preserves the
/// underlying error text verbatim for the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success(String),
    Failure(String),
}

/// Inputs for one attempt. The credential is carried per call and never
/// stored by the executor.
#[derive(Debug, Clone, Copy)]
pub struct CompletionCall<'a> {
    pub question: &'a str,
    pub credential: &'a str,
    pub model: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Single-shot boundary to the completion endpoint. Implementations never
/// retry and never interpret the error text.
#[async_trait]
pub trait CompletionExecutor: Send + Sync {
    async fn invoke(&self, call: CompletionCall<'_>) -> AttemptOutcome;
}

#[async_trait]
impl<T: CompletionExecutor + ?Sized> CompletionExecutor for std::sync::Arc<T> {
    async fn invoke(&self, call: CompletionCall<'_>) -> AttemptOutcome {
        (**self).invoke(call).await
    }
}

#[derive(Debug, Clone)]
pub struct OpenAIClient {
    pub base_url: String,
    inner: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let inner = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            inner,
        })
    }

    pub(crate) fn endpoint(&self) -> String {
        let mut base = self.base_url.trim_end_matches('/').to_string();
        if let Some(pos) = base.rfind("/v1") {
            base.truncate(pos);
            base = base.trim_end_matches('/').to_string();
        }
        format!("{base}/v1/chat/completions")
    }

    async fn send(&self, req: &ChatRequest, credential: &str) -> Result<String> {
        let url = self.endpoint();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "application/json".parse()?);
        headers.insert(AUTHORIZATION, format!("Bearer {credential}").parse()?);

        debug!(endpoint = %url, model = %req.model, "sending chat.completions request");

        let resp = self
            .inner
            .post(&url)
            .headers(headers)
            .json(req)
            .send()
            .await
            .context("send chat request")?;

        let status = resp.status();
        let text = resp.text().await.context("read chat response body")?;
        if !status.is_success() {
            error!(status = %status.as_u16(), body = %text, "chat.completions non-success status");
            anyhow::bail!("chat error: {status} - {text}");
        }

        let body: ChatResponse =
            serde_json::from_str(&text).context("parse chat response")?;
        match body.choices.into_iter().next() {
            Some(c) => Ok(c.message.content),
            None => anyhow::bail!("no choices returned"),
        }
    }
}

#[async_trait]
impl CompletionExecutor for OpenAIClient {
    async fn invoke(&self, call: CompletionCall<'_>) -> AttemptOutcome {
        let req = ChatRequest {
            model: call.model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".into(),
                    content: format!("Question: {}", call.question),
                },
            ],
            temperature: Some(call.temperature),
            max_tokens: Some(call.max_tokens),
        };
        match self.send(&req, call.credential).await {
            Ok(answer) => AttemptOutcome::Success(answer),
            // "{:#}" keeps the full context chain so nothing is lost for
            // downstream classification.
            Err(e) => AttemptOutcome::Failure(format!("{e:#}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httptest::{Expectation, Server, matchers::*, responders::*};

    fn call(question: &'static str) -> CompletionCall<'static> {
        CompletionCall {
            question,
            credential: "test-key",
            model: "gpt-test",
            temperature: 0.7,
            max_tokens: 150,
        }
    }

    #[tokio::test]
    async fn invoke_happy_path() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/v1/chat/completions"),
                request::headers(contains(("authorization", "Bearer test-key"))),
            ])
            .respond_with(json_encoded(serde_json::json!({
                "id": "test",
                "choices": [
                    {"index": 0, "message": {"role": "assistant", "content": "hello"}}
                ]
            }))),
        );

        let client = OpenAIClient::new(
            server.url_str(""),
            Duration::from_secs(5),
        )
        .unwrap();
        let out = client.invoke(call("hi")).await;
        assert_eq!(out, AttemptOutcome::Success("hello".into()));
    }

    #[tokio::test]
    async fn invoke_preserves_status_and_body_on_error() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/v1/chat/completions"))
                .respond_with(status_code(429).body("rate_limit_exceeded: slow down")),
        );

        let client = OpenAIClient::new(
            server.url_str(""),
            Duration::from_secs(5),
        )
        .unwrap();
        let AttemptOutcome::Failure(raw) = client.invoke(call("hi")).await else {
            panic!("expected failure");
        };
        assert!(raw.contains("429"), "missing status in: {raw}");
        assert!(raw.contains("rate_limit_exceeded"), "missing body in: {raw}");
    }

    #[tokio::test]
    async fn invoke_empty_choices_is_failure() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/v1/chat/completions"))
                .respond_with(json_encoded(serde_json::json!({
                    "id": "test",
                    "choices": []
                }))),
        );

        let client = OpenAIClient::new(
            server.url_str(""),
            Duration::from_secs(5),
        )
        .unwrap();
        let AttemptOutcome::Failure(raw) = client.invoke(call("hi")).await else {
            panic!("expected failure");
        };
        assert!(raw.contains("no choices returned"));
    }

    #[test]
    fn endpoint_normalization() {
        let c = OpenAIClient::new("https://api.example.com/v1/", Duration::from_secs(1)).unwrap();
        assert_eq!(c.endpoint(), "https://api.example.com/v1/chat/completions");
        let c2 = OpenAIClient::new("https://api.example.com/", Duration::from_secs(1)).unwrap();
        assert_eq!(c2.endpoint(), "https://api.example.com/v1/chat/completions");
    }
}
