//! In-memory collaborators shared by the pipeline and orchestrator tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use scene_reel::error::{EncodeError, GenerationError, MaterializeError};
use scene_reel::generation::{AssetStore, ImageGenerator, SpeechSynthesizer};
use scene_reel::media::MediaHandle;
use scene_reel::progress::{Progress, ProgressObserver};

/// Every service call, in the order it was made.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub struct FakeImages {
    pub log: CallLog,
    pub fail_on: Option<String>,
    pub delay: Option<Duration>,
}

impl FakeImages {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: Arc::clone(log),
            fail_on: None,
            delay: None,
        }
    }

    pub fn failing_on(log: &CallLog, description: &str) -> Self {
        Self {
            fail_on: Some(description.to_string()),
            ..Self::new(log)
        }
    }
}

#[async_trait]
impl ImageGenerator for FakeImages {
    async fn generate_image(&self, description: &str) -> Result<MediaHandle, GenerationError> {
        let n = {
            let mut log = self.log.lock().unwrap();
            log.push(format!("image:{}", description));
            log.len()
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_on.as_deref() == Some(description) {
            return Err(GenerationError::Service("image service unavailable".to_string()));
        }
        Ok(MediaHandle::remote(format!("mem://images/{}.png", n)))
    }
}

pub struct FakeSpeech {
    pub log: CallLog,
    pub fail_on: Option<String>,
}

impl FakeSpeech {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: Arc::clone(log),
            fail_on: None,
        }
    }

    pub fn failing_on(log: &CallLog, text: &str) -> Self {
        Self {
            log: Arc::clone(log),
            fail_on: Some(text.to_string()),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<MediaHandle, GenerationError> {
        let n = {
            let mut log = self.log.lock().unwrap();
            log.push(format!("audio:{}", text));
            log.len()
        };
        if self.fail_on.as_deref() == Some(text) {
            return Err(GenerationError::Service("quota exceeded".to_string()));
        }
        Ok(MediaHandle::inline(
            format!("{}:{}", voice_id, n),
            text.as_bytes().to_vec(),
        ))
    }
}

/// Writes handles to disk without touching the network.
pub struct MemoryStore {
    pub fail: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { fail: false }
    }
}

#[async_trait]
impl AssetStore for MemoryStore {
    async fn materialize(
        &self,
        handle: &MediaHandle,
        dest: &Path,
    ) -> Result<PathBuf, MaterializeError> {
        if self.fail {
            return Err(MaterializeError::Status { status: 404 });
        }
        let bytes = match handle {
            MediaHandle::Remote { url } => url.as_bytes().to_vec(),
            MediaHandle::Inline { bytes, .. } => bytes.clone(),
        };
        tokio::fs::write(dest, bytes).await?;
        Ok(dest.to_path_buf())
    }
}

/// What the encoder was asked to do.
#[derive(Debug, Clone)]
pub struct EncodeCall {
    pub manifest: String,
    pub audio_paths: Vec<PathBuf>,
    pub output_path: PathBuf,
}

pub type EncodeLog = Arc<Mutex<Vec<EncodeCall>>>;

/// Records each request and writes a placeholder video.
pub struct FakeEncoder {
    pub log: EncodeLog,
    pub fail: bool,
}

impl FakeEncoder {
    pub fn new() -> (Self, EncodeLog) {
        let log: EncodeLog = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                log: Arc::clone(&log),
                fail: false,
            },
            log,
        )
    }

    pub fn failing() -> (Self, EncodeLog) {
        let (mut encoder, log) = Self::new();
        encoder.fail = true;
        (encoder, log)
    }
}

#[async_trait]
impl scene_reel::assembler::VideoEncoder for FakeEncoder {
    async fn encode(
        &self,
        manifest_path: &Path,
        audio_paths: &[PathBuf],
        output_path: &Path,
    ) -> Result<(), EncodeError> {
        let manifest = tokio::fs::read_to_string(manifest_path).await?;
        self.log.lock().unwrap().push(EncodeCall {
            manifest,
            audio_paths: audio_paths.to_vec(),
            output_path: output_path.to_path_buf(),
        });

        // A crashing encoder still leaves a partial file behind.
        tokio::fs::write(output_path, b"partial").await?;
        if self.fail {
            return Err(EncodeError::ProcessFailed {
                exit_code: Some(1),
                stderr: "Invalid data found when processing input".to_string(),
            });
        }
        tokio::fs::write(output_path, b"video").await?;
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct RecordingProgress {
    pub events: Arc<Mutex<Vec<Progress>>>,
}

impl ProgressObserver for RecordingProgress {
    fn on_progress(&self, event: &Progress) {
        self.events.lock().unwrap().push(event.clone());
    }
}
