//! ElevenLabsClient - text-to-speech for dialogue lines.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::GenerationError;
use crate::generation::SpeechSynthesizer;
use crate::media::MediaHandle;

/// The environment variable name for the ElevenLabs API key.
pub const ELEVENLABS_API_KEY_ENV: &str = "ELEVENLABS_API_KEY";

/// Default base URL for the ElevenLabs API.
pub const ELEVENLABS_API_BASE_URL: &str = "https://api.elevenlabs.io";

/// Voice used when none is configured.
pub const DEFAULT_VOICE_ID: &str = "pMsXgVXv3BLzUgSXRplE";

/// MP3, 22.05 kHz, 32 kbps.
pub const DEFAULT_OUTPUT_FORMAT: &str = "mp3_22050_32";

/// Default timeout for HTTP requests (60 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Voice tuning sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.1,
            similarity_boost: 0.3,
            style: 0.2,
        }
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_id: Option<&'a str>,
    voice_settings: VoiceSettings,
}

/// Client for ElevenLabs text-to-speech.
pub struct ElevenLabsClient {
    api_key: String,
    base_url: String,
    model_id: Option<String>,
    output_format: String,
    voice_settings: VoiceSettings,
    clips: AtomicUsize,
    http_client: reqwest::Client,
}

impl ElevenLabsClient {
    pub fn with_api_key(api_key: String) -> Result<Self, ElevenLabsError> {
        Self::with_base_url(api_key, ELEVENLABS_API_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, ElevenLabsError> {
        if api_key.is_empty() {
            return Err(ElevenLabsError::MissingApiKey);
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model_id: None,
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            voice_settings: VoiceSettings::default(),
            clips: AtomicUsize::new(0),
            http_client,
        })
    }

    pub fn model_id(mut self, model_id: Option<String>) -> Self {
        self.model_id = model_id;
        self
    }

    pub fn output_format(mut self, output_format: impl Into<String>) -> Self {
        self.output_format = output_format.into();
        self
    }

    pub fn voice_settings(mut self, settings: VoiceSettings) -> Self {
        self.voice_settings = settings;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert `text` to speech and return the encoded audio.
    ///
    /// # Errors
    ///
    /// `EmptyText` for blank input, `ApiError` for an error response,
    /// `EmptyAudio` if the response body is empty, `HttpError` if the request
    /// fails.
    pub async fn convert(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, ElevenLabsError> {
        if text.trim().is_empty() {
            return Err(ElevenLabsError::EmptyText);
        }

        let url = format!("{}/v1/text-to-speech/{}", self.base_url, voice_id);
        let request = SpeechRequest {
            text,
            model_id: self.model_id.as_deref(),
            voice_settings: self.voice_settings,
        };

        let response = self
            .http_client
            .post(&url)
            .query(&[
                ("optimize_streaming_latency", "0"),
                ("output_format", self.output_format.as_str()),
            ])
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ElevenLabsError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(ElevenLabsError::EmptyAudio);
        }
        Ok(audio.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<MediaHandle, GenerationError> {
        let audio = self.convert(text, voice_id).await?;
        let clip = self.clips.fetch_add(1, Ordering::SeqCst);
        Ok(MediaHandle::inline(
            format!("elevenlabs:{}:{}", voice_id, clip),
            audio,
        ))
    }
}

/// Errors that can occur talking to ElevenLabs.
#[derive(Debug, thiserror::Error)]
pub enum ElevenLabsError {
    #[error("ElevenLabs API key not configured")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("ElevenLabs API returned {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Cannot synthesize empty text")]
    EmptyText,

    #[error("ElevenLabs returned no audio")]
    EmptyAudio,
}
