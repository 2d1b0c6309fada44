pub mod error;
pub mod json;
pub mod peers;

pub use error::{LlmError, LlmResult};
pub use json::extract_json_object;
pub use peers::parse_peer_response;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the chat-completion provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("PERPLEXITY_BASE_URL")
                .unwrap_or_else(|_| "https://api.perplexity.ai".to_string()),
            model: std::env::var("PERPLEXITY_MODEL").unwrap_or_else(|_| "sonar-pro".to_string()),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Chat-completion client. One request per call, no retries.
#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    api_key: String,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(api_key: String, config: LlmConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(config.timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_key,
            config,
        }
    }

    pub fn from_env() -> LlmResult<Self> {
        let api_key = std::env::var("PERPLEXITY_API_KEY").map_err(|_| LlmError::MissingApiKey)?;
        Ok(Self::new(api_key, LlmConfig::default()))
    }

    /// Send a system + user message pair and return the assistant's text.
    pub async fn chat(&self, system: &str, user: &str) -> LlmResult<String> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LlmError::ProviderStatus(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("no completion choices".to_string()))
    }
}
