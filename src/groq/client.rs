//! GroqClient - script generation through Groq's chat completions API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::generation::ScriptGenerator;

/// The environment variable name for the Groq API key.
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";

/// Default base URL for Groq's OpenAI-compatible API.
pub const GROQ_API_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default chat model.
pub const DEFAULT_MODEL: &str = "mixtral-8x7b-32768";

/// Default system instruction sent ahead of the user prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a creative scriptwriter. Write a very short \
    script, about 30 seconds long, based on the given prompt. Include scene descriptions and \
    character dialogues.";

/// Default timeout for HTTP requests (60 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    /// Text of the first choice, or an empty string when there is none.
    fn into_text(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default()
    }
}

/// Client for Groq chat completions.
pub struct GroqClient {
    api_key: String,
    base_url: String,
    model: String,
    system_prompt: String,
    http_client: reqwest::Client,
}

impl GroqClient {
    pub fn with_api_key(api_key: String) -> Result<Self, GroqError> {
        Self::with_base_url(api_key, GROQ_API_BASE_URL.to_string())
    }

    /// Create a client against a custom base URL (mock servers, proxies).
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, GroqError> {
        if api_key.is_empty() {
            return Err(GroqError::MissingApiKey);
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            http_client,
        })
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model_id(&self) -> &str {
        &self.model
    }

    /// Ask the model for a script. An answer without text yields `""`.
    pub async fn complete(&self, prompt: &str) -> Result<String, GroqError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GroqError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let chat: ChatResponse = response.json().await?;
        let text = chat.into_text();
        log::debug!("Script generated ({} characters)", text.len());
        Ok(text)
    }
}

#[async_trait]
impl ScriptGenerator for GroqClient {
    async fn generate_script(&self, prompt: &str) -> Result<String, GenerationError> {
        Ok(self.complete(prompt).await?)
    }
}

/// Errors that can occur talking to Groq.
#[derive(Debug, thiserror::Error)]
pub enum GroqError {
    #[error("Groq API key not configured")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Groq API returned {status}: {message}")]
    ApiError { status: u16, message: String },
}
