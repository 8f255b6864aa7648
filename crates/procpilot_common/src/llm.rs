//! LLM Abstraction Layer
//!
//! The engine treats the model as an optional capability: it is held as
//! `Option<Arc<dyn AiProvider>>` and every caller keeps a heuristic path for
//! when it is absent or failing.
//!
//! Safety guarantees:
//! - Model output is text only, never executed
//! - Backend disabled by default
//! - No network calls unless explicitly configured
//! - API keys read from environment variables, never from the config file

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::env;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Default Ollama API endpoint
pub const OLLAMA_DEFAULT_URL: &str = "http://127.0.0.1:11434";

/// Default timeout for a completion (ms)
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default completion length
pub const DEFAULT_MAX_TOKENS: u32 = 500;

/// Sampling temperature; low for consistent JSON
const TEMPERATURE: f32 = 0.2;

// ============================================================================
// Configuration
// ============================================================================

/// LLM backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LlmBackendKind {
    /// No LLM backend (default)
    #[default]
    Disabled,
    /// Local Ollama server
    Ollama,
    /// OpenAI-compatible `/chat/completions` API
    OpenaiCompatible,
}

impl LlmBackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmBackendKind::Disabled => "disabled",
            LlmBackendKind::Ollama => "ollama",
            LlmBackendKind::OpenaiCompatible => "openai_compatible",
        }
    }
}

/// `[llm]` section of the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub backend: LlmBackendKind,
    /// Examples: "http://127.0.0.1:11434" (Ollama), "https://api.openai.com/v1"
    pub base_url: Option<String>,
    /// Model name (e.g. "llama3.2", "gpt-4o-mini")
    pub model: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    pub timeout_ms: u64,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackendKind::Disabled,
            base_url: None,
            model: None,
            api_key_env: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl LlmConfig {
    /// Local Ollama configuration
    pub fn ollama(model: impl Into<String>) -> Self {
        Self {
            backend: LlmBackendKind::Ollama,
            base_url: Some(OLLAMA_DEFAULT_URL.to_string()),
            model: Some(model.into()),
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend != LlmBackendKind::Disabled
    }
}

// ============================================================================
// Provider trait
// ============================================================================

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String, // "system", "user", "assistant"
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// LLM errors
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM backend is disabled")]
    Disabled,

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else if e.is_decode() {
            LlmError::ParseError(e.to_string())
        } else {
            LlmError::HttpError(e.to_string())
        }
    }
}

/// Text-completion capability.
///
/// Replies are free text and must be validated before structural use.
#[async_trait]
pub trait AiProvider: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn query(&self, prompt: &str, context: Option<&str>) -> Result<String, LlmError>;

    /// History-aware variant. Backends without a chat endpoint get the
    /// transcript folded into the context string.
    async fn query_with_history(
        &self,
        prompt: &str,
        history: &[ChatMessage],
    ) -> Result<String, LlmError> {
        if history.is_empty() {
            return self.query(prompt, None).await;
        }
        let context = fold_history(history);
        self.query(prompt, Some(&context)).await
    }
}

/// Render a transcript as "role: content" lines
pub fn fold_history(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// HTTP Provider (Production)
// ============================================================================

/// Request for Ollama /api/generate
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

/// Request for Ollama /api/chat
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

/// Response from /api/generate (non-streaming)
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Response from /api/chat (non-streaming)
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

/// Ollama or OpenAI-compatible HTTP backend
pub struct HttpAiProvider {
    backend: LlmBackendKind,
    base_url: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
    client: reqwest::Client,
}

impl HttpAiProvider {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        if !config.is_enabled() {
            return Err(LlmError::Disabled);
        }

        let base_url = match (&config.base_url, config.backend) {
            (Some(url), _) => url.trim_end_matches('/').to_string(),
            (None, LlmBackendKind::Ollama) => OLLAMA_DEFAULT_URL.to_string(),
            (None, _) => {
                return Err(LlmError::ConfigError(
                    "base_url is required for openai_compatible backend".to_string(),
                ))
            }
        };

        let model = config
            .model
            .clone()
            .ok_or_else(|| LlmError::ConfigError("model is required".to_string()))?;

        let api_key = match &config.api_key_env {
            Some(var) => match env::var(var) {
                Ok(key) if !key.is_empty() => Some(key),
                _ if config.backend == LlmBackendKind::Ollama => None,
                _ => {
                    return Err(LlmError::ConfigError(format!(
                        "API key env var {} is not set",
                        var
                    )))
                }
            },
            None => None,
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| LlmError::ConfigError(e.to_string()))?;

        Ok(Self {
            backend: config.backend,
            base_url,
            model,
            api_key,
            max_tokens: config.max_tokens,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn options(&self) -> GenerateOptions {
        GenerateOptions {
            temperature: TEMPERATURE,
            num_predict: self.max_tokens,
        }
    }

    async fn ollama_generate(&self, prompt: String) -> Result<String, LlmError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: self.options(),
        };
        let url = format!("{}/api/generate", self.base_url);
        let resp = self.client.post(&url).json(&request).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::HttpError(format!("Status {}: {}", status, body)));
        }
        let body: GenerateResponse = resp.json().await?;
        Ok(body.response)
    }

    async fn ollama_chat(&self, messages: Vec<ChatMessage>) -> Result<String, LlmError> {
        let request = OllamaChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: self.options(),
        };
        let url = format!("{}/api/chat", self.base_url);
        let resp = self.client.post(&url).json(&request).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::HttpError(format!("Status {}: {}", status, body)));
        }
        let body: OllamaChatResponse = resp.json().await?;
        Ok(body.message.content)
    }

    async fn openai_chat(&self, messages: Vec<ChatMessage>) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request_body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": self.max_tokens,
            "temperature": TEMPERATURE,
        });

        let mut req = self.client.post(&url).json(&request_body);
        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::HttpError(format!("HTTP {}: {}", status, body)));
        }

        let json: serde_json::Value = resp.json().await?;
        json["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LlmError::ParseError("No content in response".to_string()))
    }
}

#[async_trait]
impl AiProvider for HttpAiProvider {
    fn is_configured(&self) -> bool {
        true
    }

    async fn query(&self, prompt: &str, context: Option<&str>) -> Result<String, LlmError> {
        debug!(backend = self.backend.as_str(), model = %self.model, "LLM query");
        match self.backend {
            LlmBackendKind::Disabled => Err(LlmError::Disabled),
            LlmBackendKind::Ollama => {
                let full = match context {
                    Some(ctx) => format!("{}\n\n{}", ctx, prompt),
                    None => prompt.to_string(),
                };
                self.ollama_generate(full).await
            }
            LlmBackendKind::OpenaiCompatible => {
                let mut messages = Vec::new();
                if let Some(ctx) = context {
                    messages.push(ChatMessage {
                        role: "system".to_string(),
                        content: ctx.to_string(),
                    });
                }
                messages.push(ChatMessage::user(prompt));
                self.openai_chat(messages).await
            }
        }
    }

    async fn query_with_history(
        &self,
        prompt: &str,
        history: &[ChatMessage],
    ) -> Result<String, LlmError> {
        let mut messages = history.to_vec();
        messages.push(ChatMessage::user(prompt));
        match self.backend {
            LlmBackendKind::Disabled => Err(LlmError::Disabled),
            LlmBackendKind::Ollama => self.ollama_chat(messages).await,
            LlmBackendKind::OpenaiCompatible => self.openai_chat(messages).await,
        }
    }
}

// ============================================================================
// Fake Provider (Testing)
// ============================================================================

/// Scripted provider for tests.
///
/// Replies are consumed in order; once exhausted the provider fails.
#[derive(Default)]
pub struct FakeAiProvider {
    configured: bool,
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl FakeAiProvider {
    pub fn new() -> Self {
        Self {
            configured: true,
            ..Self::default()
        }
    }

    /// A provider that reports itself unconfigured
    pub fn unconfigured() -> Self {
        Self::default()
    }

    /// A configured provider whose every call fails
    pub fn failing() -> Self {
        Self::new()
    }

    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.push(Ok(reply.into()));
        self
    }

    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.push(Err(message.into()));
        self
    }

    fn push(&self, reply: Result<String, String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts().len()
    }
}

#[async_trait]
impl AiProvider for FakeAiProvider {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn query(&self, prompt: &str, _context: Option<&str>) -> Result<String, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let next = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front());
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(LlmError::HttpError(message)),
            None => Err(LlmError::HttpError("no scripted reply".to_string())),
        }
    }
}
