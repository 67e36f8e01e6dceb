//! Configuration file handling for scene-reel.
//!
//! Loads configuration from `<config dir>/scene-reel/config.toml` or a custom
//! path. Every field has a default, so an absent file is a valid setup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::assembler::{DEFAULT_AUDIO_CODEC, DEFAULT_FFMPEG_BINARY, DEFAULT_VIDEO_CODEC};
use crate::elevenlabs::{DEFAULT_OUTPUT_FORMAT, DEFAULT_VOICE_ID, ELEVENLABS_API_BASE_URL};
use crate::fal::{DEFAULT_GENERATION_TIMEOUT, FAL_API_BASE_URL};
use crate::orchestrator::{PipelineConfig, DEFAULT_CALL_TIMEOUT, DEFAULT_TARGET_DURATION};

/// Shortest per-call timeout a config file can ask for.
pub const MIN_CALL_TIMEOUT_SECS: u64 = 1;

/// Configuration file structure for scene-reel.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub script: ScriptSection,
    #[serde(default)]
    pub image: ImageSection,
    #[serde(default)]
    pub speech: SpeechSection,
    #[serde(default)]
    pub encoder: EncoderSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PipelineSection {
    /// Length of the final video in seconds.
    pub target_duration: f64,
    pub max_scenes: Option<usize>,
    pub voice_id: String,
    pub output: PathBuf,
    /// Parent directory for per-run scratch directories.
    pub work_dir: Option<PathBuf>,
    pub keep_scratch: bool,
    /// Limit for each service call; values below 1 are raised to 1.
    pub call_timeout_secs: u64,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            target_duration: DEFAULT_TARGET_DURATION,
            max_scenes: None,
            voice_id: DEFAULT_VOICE_ID.to_string(),
            output: PathBuf::from("output.mp4"),
            work_dir: None,
            keep_scratch: false,
            call_timeout_secs: DEFAULT_CALL_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ScriptSection {
    pub model: String,
    pub system_prompt: String,
    pub base_url: String,
}

impl Default for ScriptSection {
    fn default() -> Self {
        Self {
            model: crate::groq::DEFAULT_MODEL.to_string(),
            system_prompt: crate::groq::DEFAULT_SYSTEM_PROMPT.to_string(),
            base_url: crate::groq::GROQ_API_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ImageSection {
    /// fal.ai endpoint.
    pub model: String,
    /// Base weights for endpoints that accept `model_name`.
    pub model_name: Option<String>,
    pub base_url: String,
    pub generation_timeout_secs: u64,
}

impl Default for ImageSection {
    fn default() -> Self {
        Self {
            model: crate::fal::DEFAULT_MODEL.to_string(),
            model_name: Some(crate::fal::DEFAULT_MODEL_NAME.to_string()),
            base_url: FAL_API_BASE_URL.to_string(),
            generation_timeout_secs: DEFAULT_GENERATION_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SpeechSection {
    pub model_id: Option<String>,
    pub output_format: String,
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub base_url: String,
}

impl Default for SpeechSection {
    fn default() -> Self {
        let voice = crate::elevenlabs::VoiceSettings::default();
        Self {
            model_id: None,
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            stability: voice.stability,
            similarity_boost: voice.similarity_boost,
            style: voice.style,
            base_url: ELEVENLABS_API_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EncoderSection {
    pub binary: String,
    pub video_codec: String,
    pub audio_codec: String,
}

impl Default for EncoderSection {
    fn default() -> Self {
        Self {
            binary: DEFAULT_FFMPEG_BINARY.to_string(),
            video_codec: DEFAULT_VIDEO_CODEC.to_string(),
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
                path: path.clone(),
                source: e,
            })?;
            Self::from_toml(&content).map_err(|e| ConfigError::ParseError {
                path: path.clone(),
                source: e,
            })
        } else {
            log::debug!("No config file at {}, using defaults", path.display());
            Ok(Config::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Render as TOML, as written by `config init`.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Settings for a run, before command-line overrides.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let pipeline = &self.pipeline;
        if pipeline.call_timeout_secs < MIN_CALL_TIMEOUT_SECS {
            log::warn!(
                "call_timeout_secs = {} is too short, using {}s",
                pipeline.call_timeout_secs,
                MIN_CALL_TIMEOUT_SECS
            );
        }
        PipelineConfig {
            target_total_duration: pipeline.target_duration,
            max_scenes: pipeline.max_scenes,
            voice_id: pipeline.voice_id.clone(),
            output_path: pipeline.output.clone(),
            work_dir: pipeline
                .work_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            keep_scratch: pipeline.keep_scratch,
            call_timeout: Duration::from_secs(
                pipeline.call_timeout_secs.max(MIN_CALL_TIMEOUT_SECS),
            ),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("scene-reel").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/scene-reel/config.toml")
        })
}
