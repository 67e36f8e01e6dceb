//! Error taxonomy for a pipeline run.
//!
//! Every stage fails fast: the first error aborts the run and reaches the
//! caller unchanged.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::elevenlabs::ElevenLabsError;
use crate::fal::FalError;
use crate::groq::GroqError;
use crate::media::MediaKind;

/// The external generation step a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    Script,
    Image,
    Speech,
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationStage::Script => write!(f, "script"),
            GenerationStage::Image => write!(f, "image"),
            GenerationStage::Speech => write!(f, "speech"),
        }
    }
}

/// Errors returned by a generation collaborator.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Fal(#[from] FalError),

    #[error(transparent)]
    Groq(#[from] GroqError),

    #[error(transparent)]
    ElevenLabs(#[from] ElevenLabsError),

    #[error("service returned an empty result")]
    EmptyResult,

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Service(String),
}

/// Errors writing a generated asset to local storage.
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("download failed with status {status}")]
    Status { status: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the external video encoder.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("encoder binary '{0}' not found")]
    NotFound(String),

    #[error("failed to spawn encoder: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("encoder exited with code {exit_code:?}\n{stderr}")]
    ProcessFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("encoder reported success but wrote nothing to {0}")]
    MissingOutput(PathBuf),

    #[error("failed to write manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{stage} generation failed: {source}")]
    GenerationFailure {
        stage: GenerationStage,
        #[source]
        source: GenerationError,
    },

    #[error("script contains no scenes")]
    EmptyScript,

    #[error("timeline has no images")]
    EmptyTimeline,

    #[error("target duration must be a positive number of seconds, got {0}")]
    InvalidDuration(f64),

    #[error("failed to materialize {kind} from {handle}: {source}")]
    AssetMaterializationFailure {
        kind: MediaKind,
        handle: String,
        #[source]
        source: MaterializeError,
    },

    #[error("encoding failed: {0}")]
    EncodingFailed(#[from] EncodeError),

    #[error("failed to create scratch directory in {path}: {source}")]
    Scratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("run cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn generation(stage: GenerationStage, source: impl Into<GenerationError>) -> Self {
        PipelineError::GenerationFailure {
            stage,
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_failure_display() {
        let err = PipelineError::generation(GenerationStage::Image, GenerationError::EmptyResult);
        assert_eq!(
            err.to_string(),
            "image generation failed: service returned an empty result"
        );
    }

    #[test]
    fn test_structural_errors_are_distinct() {
        assert_eq!(PipelineError::EmptyScript.to_string(), "script contains no scenes");
        assert_eq!(PipelineError::EmptyTimeline.to_string(), "timeline has no images");
    }

    #[test]
    fn test_encoding_failed_carries_exit_code() {
        let err = PipelineError::from(EncodeError::ProcessFailed {
            exit_code: Some(1),
            stderr: "Invalid data found".to_string(),
        });
        let text = err.to_string();
        assert!(text.contains("Some(1)"));
        assert!(text.contains("Invalid data found"));
    }

    #[test]
    fn test_timeout_display() {
        let err = GenerationError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "no response within 5s");
    }
}
