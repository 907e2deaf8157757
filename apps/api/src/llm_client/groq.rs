//! Groq backend (OpenAI-compatible chat completions). Secondary backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{api_error, LlmError, Provider};

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const MODEL: &str = "meta-llama/llama-4-maverick-17b-128e-instruct";
const MAX_TOKENS: u32 = 4000;
const TEMPERATURE: f32 = 0.7;
const TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

impl ChatResponse {
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Clone)]
pub struct GroqProvider {
    client: Client,
    api_key: Option<String>,
}

impl GroqProvider {
    pub fn new(api_key: Option<String>) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(TIMEOUT_SECS))
                .build()
                .map_err(LlmError::http)?,
            api_key,
        })
    }
}

#[async_trait]
impl Provider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::NotConfigured("groq"))?;
        let body = ChatRequest {
            model: MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(GROQ_API_URL)
            .bearer_auth(api_key.trim())
            .json(&body)
            .send()
            .await
            .map_err(LlmError::http)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let parsed: ChatResponse = response.json().await.map_err(LlmError::http)?;
        debug!("Groq returned {} choices", parsed.choices.len());
        parsed
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }
}
