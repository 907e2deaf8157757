//! LLM Client: the single point of entry for all generative backend calls.
//!
//! ARCHITECTURAL RULE: No other module may call a backend API directly.
//! All generation goes through `ProviderGateway::generate`, which walks the
//! backends in fixed priority order and returns the first non-empty answer.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;

pub mod gemini;
pub mod groq;

/// Cap on backend error text carried into the aggregate error.
pub const MAX_ERROR_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Backend '{0}' has no credential configured")]
    NotConfigured(&'static str),
}

impl LlmError {
    /// Builds an `Http` error with the request URL stripped.
    pub fn http(e: reqwest::Error) -> Self {
        LlmError::Http(e.without_url())
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Exhausted(String),
}

/// How a failed attempt is reported. Control flow is identical for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited,
    Other,
}

pub fn classify_failure(err: &LlmError) -> FailureKind {
    if let LlmError::Api { status: 429, .. } = err {
        return FailureKind::RateLimited;
    }
    let text = err.to_string().to_lowercase();
    if text.contains("429") || text.contains("quota") || text.contains("rate limit") {
        FailureKind::RateLimited
    } else {
        FailureKind::Other
    }
}

/// Error body shared by both backends: `{"error": {"message": "..."}}`.
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Turns a non-success response into `LlmError::Api`, preferring the
/// backend's own error message over the raw body.
pub(crate) async fn api_error(response: reqwest::Response) -> LlmError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    LlmError::Api { status, message }
}

/// One generative backend.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    /// Credential presence check. Never touches the network.
    fn is_configured(&self) -> bool;

    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct BackendStatus {
    pub name: String,
    pub available: bool,
    pub last_error: Option<String>,
}

/// Availability and diagnostic record. Last writer wins under concurrency.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub backends: Vec<BackendStatus>,
    pub last_provider: Option<String>,
}

/// A successful generation and the backend that produced it.
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub provider: String,
}

pub struct ProviderGateway {
    providers: Vec<Arc<dyn Provider>>,
    diagnostics: RwLock<Diagnostics>,
}

impl ProviderGateway {
    /// `providers` is the priority order. Availability is computed once here.
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        let backends = providers
            .iter()
            .map(|p| {
                let available = p.is_configured();
                if available {
                    info!("{} backend: initialized", p.name());
                } else {
                    warn!("{} backend: credential not found, skipping", p.name());
                }
                BackendStatus {
                    name: p.name().to_string(),
                    available,
                    last_error: None,
                }
            })
            .collect();

        Self {
            providers,
            diagnostics: RwLock::new(Diagnostics {
                backends,
                last_provider: None,
            }),
        }
    }

    /// Gemini first, Groq second.
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let gemini = gemini::GeminiProvider::new(config.google_api_key.clone())?;
        let groq = groq::GroqProvider::new(config.groq_api_key.clone())?;
        let providers: Vec<Arc<dyn Provider>> = vec![Arc::new(gemini), Arc::new(groq)];
        Ok(Self::new(providers))
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.diagnostics()
            .backends
            .iter()
            .any(|b| b.name == name && b.available)
    }

    /// Attempts each available backend once, in order. Fails only when every
    /// backend was skipped, errored, or answered with nothing.
    pub async fn generate(&self, prompt: &str) -> Result<Generation, GatewayError> {
        let mut last_error: Option<String> = None;

        for (index, provider) in self.providers.iter().enumerate() {
            let name = provider.name();
            if !self.backend_available(index) {
                debug!("Skipping unavailable backend {name}");
                continue;
            }

            info!("Generating with {name} backend");
            let failure = match provider.generate(prompt).await {
                Ok(text) if !text.trim().is_empty() => {
                    info!("{name} generation succeeded: {} characters", text.len());
                    self.record_success(index, name);
                    return Ok(Generation {
                        text,
                        provider: name.to_string(),
                    });
                }
                Ok(_) => LlmError::EmptyContent,
                Err(e) => e,
            };

            let message = failure.to_string();
            match classify_failure(&failure) {
                FailureKind::RateLimited => {
                    warn!("{name} backend rate limited or out of quota, falling back")
                }
                FailureKind::Other => warn!(
                    "{name} backend error, falling back: {}",
                    truncate_chars(&message, MAX_ERROR_CHARS)
                ),
            }
            self.record_failure(index, &message);
            last_error = Some(message);
        }

        let mut error_message = "All AI services unavailable".to_string();
        match last_error {
            Some(e) => {
                error_message.push_str(": ");
                error_message.push_str(&truncate_chars(&e, MAX_ERROR_CHARS));
            }
            None => error_message.push_str(": no backend is configured"),
        }
        warn!("{error_message}");
        Err(GatewayError::Exhausted(error_message))
    }

    fn backend_available(&self, index: usize) -> bool {
        self.diagnostics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .backends
            .get(index)
            .is_some_and(|b| b.available)
    }

    fn record_success(&self, index: usize, name: &str) {
        let mut diag = self
            .diagnostics
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(backend) = diag.backends.get_mut(index) {
            backend.last_error = None;
        }
        diag.last_provider = Some(name.to_string());
    }

    fn record_failure(&self, index: usize, message: &str) {
        let mut diag = self
            .diagnostics
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(backend) = diag.backends.get_mut(index) {
            backend.last_error = Some(message.to_string());
        }
    }
}

/// Truncates to at most `max` characters without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
