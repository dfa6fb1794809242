#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Narrow synchronous interface to a language-model provider.
//!
//! Everything above this seam (persona selection, step orchestration, JSON
//! parsing) is core logic and is tested against [`ScriptedGateway`]. The
//! live gateway degrades to a deterministic fallback string on any transport
//! failure so every downstream consumer stays reproducible.

use std::{collections::VecDeque, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use thiserror::Error;

/// Deterministic text returned when the provider is unreachable. Shaped as a
/// synthesis payload so the decision pipeline degrades to a zero-confidence
/// HOLD, which the confidence valve always blocks.
pub const FALLBACK_COMPLETION: &str = r#"{
    "kind": "HOLD",
    "parameters": {},
    "confidence": 0.0,
    "reasoning": "Language model unreachable; defaulting to strategic inaction.",
    "risks_mitigated": []
}"#;

/// Default per-call timeout.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors surfaced by gateway construction.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The HTTP client could not be built.
    #[error("gateway client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// One synchronous completion call: `(system, user) -> text`.
#[async_trait]
pub trait LanguageGateway: Send + Sync {
    /// Completes a prompt pair, returning the provider text.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Gateway that always returns [`FALLBACK_COMPLETION`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackGateway;

#[async_trait]
impl LanguageGateway for FallbackGateway {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        Ok(FALLBACK_COMPLETION.to_string())
    }
}

/// Test double replaying a queue of canned completions; once the queue is
/// drained it degrades to the fallback text, like a dead provider.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    replies: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedGateway {
    /// Creates a gateway replaying the given completions in order.
    #[must_use]
    pub fn new(replies: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Prompt pairs observed so far.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl LanguageGateway for ScriptedGateway {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.calls.lock().push((system.to_string(), user.to_string()));
        Ok(self
            .replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| FALLBACK_COMPLETION.to_string()))
    }
}

/// Live HTTP gateway with a per-call timeout and fallback-on-failure.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpGateway {
    /// Creates a gateway posting to the given provider endpoint.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(CALL_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    async fn request(&self, system: &str, user: &str) -> Result<String> {
        let body = json!({
            "contents": [{ "parts": [{ "text": format!("{system}\n\n{user}") }] }]
        });
        let response = self
            .client
            .post(format!("{}?key={}", self.endpoint, self.api_key))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let payload: serde_json::Value = response.json().await?;
        payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| anyhow::anyhow!("provider response missing completion text"))
    }
}

#[async_trait]
impl LanguageGateway for HttpGateway {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        match self.request(system, user).await {
            Ok(text) => Ok(text),
            // Transport or shape failure: degrade deterministically.
            Err(_) => Ok(FALLBACK_COMPLETION.to_string()),
        }
    }
}
