//! FalClient - handles communication with the fal.ai queue API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::generation::ImageGenerator;
use crate::media::MediaHandle;

/// The environment variable name for the fal.ai API key.
pub const FAL_API_KEY_ENV: &str = "FAL_API_KEY";

/// Default base URL for the fal.ai API.
pub const FAL_API_BASE_URL: &str = "https://queue.fal.run";

/// Default model for image generation.
pub const DEFAULT_MODEL: &str = "fal-ai/lora";

/// Default diffusion weights loaded by the LoRA endpoint.
pub const DEFAULT_MODEL_NAME: &str = "stabilityai/stable-diffusion-xl-base-1.0";

/// Default timeout for HTTP requests (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for image generation (120 seconds).
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Default polling interval for status checks (1 second).
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// HTTP status code for rate limiting.
const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// HTTP status code for bad request (often content policy).
const HTTP_STATUS_BAD_REQUEST: u16 = 400;

/// HTTP status code for forbidden (content policy violation).
const HTTP_STATUS_FORBIDDEN: u16 = 403;

/// Keywords that indicate a content policy violation in error messages.
const CONTENT_POLICY_KEYWORDS: &[&str] = &[
    "content policy",
    "policy violation",
    "inappropriate",
    "not allowed",
    "prohibited",
    "blocked",
    "unsafe",
    "violates",
    "moderation",
    "nsfw",
];

fn is_content_policy_error(error_text: &str) -> bool {
    let lower = error_text.to_lowercase();
    CONTENT_POLICY_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// Reject empty or whitespace-only prompts before they reach the API.
pub fn validate_prompt(prompt: &str) -> Result<(), FalError> {
    if prompt.trim().is_empty() {
        return Err(FalError::EmptyPrompt);
    }
    Ok(())
}

/// Request body for image generation.
#[derive(Debug, Serialize)]
struct GenerateRequest {
    /// The text prompt to generate an image from.
    prompt: String,
    /// Base weights for the LoRA endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    model_name: Option<String>,
}

/// Response from queue submission.
#[derive(Debug, Deserialize)]
pub struct QueueResponse {
    /// The unique request ID for polling.
    pub request_id: String,
    #[serde(default)]
    pub status_url: Option<String>,
    #[serde(default)]
    pub response_url: Option<String>,
}

/// Response from status polling endpoint.
#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
}

/// Result payload of a completed request.
#[derive(Debug, Deserialize)]
struct ImageResult {
    #[serde(default)]
    images: Vec<ImageOutput>,
}

#[derive(Debug, Deserialize)]
struct ImageOutput {
    url: String,
}

/// Status of a generation request.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationStatus {
    /// Request is queued for processing.
    Pending,
    /// Image is being generated.
    InProgress,
    /// Generation completed; the result can be fetched.
    Completed,
    /// Generation failed with an error.
    Failed { error: String },
}

/// Client for communicating with the fal.ai API.
pub struct FalClient {
    api_key: String,
    base_url: String,
    model: String,
    model_name: Option<String>,
    generation_timeout: Duration,
    poll_interval: Duration,
    http_client: reqwest::Client,
}

impl FalClient {
    /// Create a new FalClient with an explicit API key.
    pub fn with_api_key(api_key: String) -> Result<Self, FalError> {
        Self::with_base_url(api_key, FAL_API_BASE_URL.to_string())
    }

    /// Create a new FalClient with a custom base URL.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, FalError> {
        if api_key.is_empty() {
            return Err(FalError::MissingApiKey);
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
            model_name: Some(DEFAULT_MODEL_NAME.to_string()),
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            http_client,
        })
    }

    /// Use a different fal.ai endpoint.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set or clear the `model_name` request field.
    pub fn model_name(mut self, model_name: Option<String>) -> Self {
        self.model_name = model_name;
        self
    }

    pub fn generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model_id(&self) -> &str {
        &self.model
    }

    fn request_url(&self, request_id: &str) -> String {
        format!("{}/{}/requests/{}", self.base_url, self.model, request_id)
    }

    /// Submit an image generation request to the fal.ai queue.
    ///
    /// # Errors
    ///
    /// `EmptyPrompt` for an empty prompt, `ContentPolicyViolation` if the API
    /// rejects the prompt, `RateLimit` on 429, `ApiError` for other error
    /// responses, `HttpError` if the request fails.
    pub async fn submit_generation(&self, prompt: &str) -> Result<QueueResponse, FalError> {
        validate_prompt(prompt)?;

        let url = format!("{}/{}", self.base_url, self.model);
        let request_body = GenerateRequest {
            prompt: prompt.to_string(),
            model_name: self.model_name.clone(),
        };

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Key {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();

            if status.as_u16() == HTTP_STATUS_TOO_MANY_REQUESTS {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Rate limit exceeded".to_string());
                log::warn!("Rate limited by fal.ai API");
                return Err(FalError::RateLimit {
                    message: error_text,
                });
            }

            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            if (status.as_u16() == HTTP_STATUS_BAD_REQUEST
                || status.as_u16() == HTTP_STATUS_FORBIDDEN)
                && is_content_policy_error(&error_text)
            {
                log::warn!("Prompt rejected by content policy: {}", error_text);
                return Err(FalError::ContentPolicyViolation {
                    message: error_text,
                });
            }

            return Err(FalError::ApiError(format!(
                "API request failed with status {}: {}",
                status, error_text
            )));
        }

        let queue_response: QueueResponse = response.json().await?;
        Ok(queue_response)
    }

    /// Check the status of a submitted request.
    pub async fn poll_status(&self, request_id: &str) -> Result<GenerationStatus, FalError> {
        let url = format!("{}/status", self.request_url(request_id));

        let response = self
            .http_client
            .get(&url)
            .header("Authorization", format!("Key {}", self.api_key))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FalError::ApiError(format!(
                "Status check failed with status {}: {}",
                status, error_text
            )));
        }

        let status_response: StatusResponse = response.json().await?;

        match status_response.status.to_uppercase().as_str() {
            "PENDING" | "IN_QUEUE" => Ok(GenerationStatus::Pending),
            "PROCESSING" | "IN_PROGRESS" => Ok(GenerationStatus::InProgress),
            "COMPLETED" | "OK" => Ok(GenerationStatus::Completed),
            "FAILED" | "ERROR" => Ok(GenerationStatus::Failed {
                error: status_response
                    .error
                    .unwrap_or_else(|| "Unknown error occurred during generation".to_string()),
            }),
            unknown => Err(FalError::ApiError(format!(
                "Unknown generation status: {}",
                unknown
            ))),
        }
    }

    /// Fetch the result of a completed request and return the first image URL.
    pub async fn fetch_image_url(&self, request_id: &str) -> Result<String, FalError> {
        let response = self
            .http_client
            .get(self.request_url(request_id))
            .header("Authorization", format!("Key {}", self.api_key))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FalError::ApiError(format!(
                "Result fetch failed with status {}: {}",
                status, error_text
            )));
        }

        let result: ImageResult = response.json().await?;
        result
            .images
            .into_iter()
            .next()
            .map(|image| image.url)
            .ok_or(FalError::NoImages)
    }

    /// Submit, wait for completion, and return the URL of the generated image.
    ///
    /// # Errors
    ///
    /// Any submission or polling error, `Timeout` if the request does not
    /// finish within the generation timeout, `ApiError` if generation fails
    /// on the server, `NoImages` if the result holds no image.
    pub async fn generate_image_url(&self, prompt: &str) -> Result<String, FalError> {
        use tokio::time::Instant;

        log::debug!("Submitting image generation for prompt: {}", prompt);
        let queue_response = self.submit_generation(prompt).await?;
        let request_id = &queue_response.request_id;
        log::debug!("Generation submitted, request_id: {}", request_id);

        let start_time = Instant::now();
        loop {
            if start_time.elapsed() > self.generation_timeout {
                log::error!("Generation timed out after {:?}", self.generation_timeout);
                return Err(FalError::Timeout);
            }

            match self.poll_status(request_id).await? {
                GenerationStatus::Pending => log::debug!("Status: queued, waiting..."),
                GenerationStatus::InProgress => log::debug!("Status: generating..."),
                GenerationStatus::Completed => break,
                GenerationStatus::Failed { error } => {
                    log::error!("Generation failed: {}", error);
                    return Err(FalError::ApiError(format!("Generation failed: {}", error)));
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }

        self.fetch_image_url(request_id).await
    }
}

#[async_trait]
impl ImageGenerator for FalClient {
    async fn generate_image(&self, description: &str) -> Result<MediaHandle, GenerationError> {
        let url = self.generate_image_url(description).await?;
        Ok(MediaHandle::remote(url))
    }
}

/// Errors that can occur during fal.ai operations.
#[derive(Debug, thiserror::Error)]
pub enum FalError {
    #[error("API key not configured")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Generation timed out")]
    Timeout,

    #[error("Rate limited: {message}")]
    RateLimit { message: String },

    #[error("Content policy violation: {message}")]
    ContentPolicyViolation { message: String },

    #[error("Empty prompt")]
    EmptyPrompt,

    #[error("Generation completed without any images")]
    NoImages,
}
