use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::PipelineError;
use crate::models::StageId;

const GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";

/// Errors from a single text-generation call
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{provider} API error: {status} - {body}")]
    Api {
        provider: Provider,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("malformed response: {0}")]
    Parse(String),
    #[error("no text content in response")]
    EmptyResponse,
    /// Failure reported by a non-HTTP generator (tests, local stubs)
    #[error("{0}")]
    Other(String),
}

/// Prompt pair for one stage invocation
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub stage: StageId,
    pub system: String,
    pub user: String,
}

/// Opaque text-in/text-out model service
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model identifier recorded in stage traces
    fn model(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Hosted model provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Groq's OpenAI-compatible chat completions API
    Groq,
    /// Anthropic Messages API
    Anthropic,
}

impl Provider {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "groq" => Some(Provider::Groq),
            "anthropic" => Some(Provider::Anthropic),
            _ => None,
        }
    }

    fn api_key_var(self) -> &'static str {
        match self {
            Provider::Groq => "GROQ_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            Provider::Groq => "llama-3.1-8b-instant",
            Provider::Anthropic => "claude-sonnet-4-20250514",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Groq => write!(f, "Groq"),
            Provider::Anthropic => write!(f, "Anthropic"),
        }
    }
}

/// Configuration for the model client
#[derive(Clone)]
pub struct GenerationConfig {
    pub provider: Provider,
    /// API key (from GROQ_API_KEY or ANTHROPIC_API_KEY)
    pub api_key: String,
    /// Model to use (e.g., "llama-3.1-8b-instant")
    pub model: String,
    /// Temperature (0 = deterministic)
    pub temperature: f64,
    /// Maximum tokens in response
    pub max_tokens: u32,
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl GenerationConfig {
    /// Create config from process environment variables
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match lookup("JAVALIFT_PROVIDER") {
            Some(value) if !value.trim().is_empty() => Provider::parse(&value).ok_or_else(|| {
                PipelineError::Configuration(format!("unknown provider {:?}", value))
            })?,
            _ => Provider::Groq,
        };

        let key_var = provider.api_key_var();
        let api_key = lookup(key_var)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                PipelineError::Configuration(format!("{} environment variable not set", key_var))
            })?;

        let model = lookup("JAVALIFT_MODEL")
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .map(|m| normalize_model(provider, &m))
            .unwrap_or_else(|| provider.default_model().to_string());

        Ok(Self::new(provider, api_key, model))
    }

    /// Create with custom settings
    pub fn new(provider: Provider, api_key: String, model: String) -> Self {
        Self {
            provider,
            api_key,
            model,
            temperature: 0.0,
            max_tokens: 4096,
        }
    }
}

/// Drop a `groq/` routing prefix from model identifiers
fn normalize_model(provider: Provider, model: &str) -> String {
    match provider {
        Provider::Groq => model.strip_prefix("groq/").unwrap_or(model).to_string(),
        Provider::Anthropic => model.to_string(),
    }
}

/// HTTP client for the configured provider
pub struct LlmClient {
    client: Client,
    config: GenerationConfig,
}

impl LlmClient {
    pub fn new(config: GenerationConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    async fn send_groq(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
        };

        let response = self
            .client
            .post(GROQ_URL)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let response = check_status(Provider::Groq, response).await?;
        let response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GenerationError::EmptyResponse)
    }

    async fn send_anthropic(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        let request = AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
            system: Some(system.to_string()),
            messages: vec![Message {
                role: "user".to_string(),
                content: user.to_string(),
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_URL)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let response = check_status(Provider::Anthropic, response).await?;
        let response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        // Concatenate text blocks; other block types are ignored
        let text: String = response
            .content
            .iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
            .collect();

        if text.is_empty() {
            Err(GenerationError::EmptyResponse)
        } else {
            Ok(text)
        }
    }
}

async fn check_status(
    provider: Provider,
    response: reqwest::Response,
) -> Result<reqwest::Response, GenerationError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(GenerationError::Api {
        provider,
        status,
        body,
    })
}

#[async_trait]
impl TextGenerator for LlmClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        match self.config.provider {
            Provider::Groq => self.send_groq(&request.system, &request.user).await,
            Provider::Anthropic => self.send_anthropic(&request.system, &request.user).await,
        }
    }
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}
