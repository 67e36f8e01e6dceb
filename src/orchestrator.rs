//! Runs one prompt through the whole pipeline.
//!
//! script -> scenes -> images and narration -> timeline -> encoded video.
//! Stages run one after another; the first failure ends the run and is
//! returned unchanged.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use crate::assembler::{VideoAssembler, VideoEncoder};
use crate::elevenlabs::DEFAULT_VOICE_ID;
use crate::error::{GenerationStage, PipelineError};
use crate::generation::{
    call_with_timeout, AssetGenerationPipeline, AssetStore, ImageGenerator, ScriptGenerator,
    SpeechSynthesizer,
};
use crate::progress::{LogProgress, Progress, ProgressObserver, Stage};
use crate::scene::parse_script;
use crate::timeline::build_timeline;

/// Upper bound on any single generation call (3 minutes).
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(180);

/// Length of the final video when not configured (30 seconds).
pub const DEFAULT_TARGET_DURATION: f64 = 30.0;

/// Prefix of the per-run scratch directory.
const SCRATCH_PREFIX: &str = "scene-reel-";

/// Settings for a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Length of the final video in seconds.
    pub target_total_duration: f64,
    /// Keep only the first N scenes of the script.
    pub max_scenes: Option<usize>,
    /// Voice used for every dialogue line.
    pub voice_id: String,
    /// Where the finished video is written.
    pub output_path: PathBuf,
    /// Parent of the per-run scratch directory.
    pub work_dir: PathBuf,
    /// Leave the scratch directory on disk after the run.
    pub keep_scratch: bool,
    /// Upper bound on each external generation call.
    pub call_timeout: Duration,
}

impl PipelineConfig {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            ..Self::default()
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_total_duration: DEFAULT_TARGET_DURATION,
            max_scenes: None,
            voice_id: DEFAULT_VOICE_ID.to_string(),
            output_path: PathBuf::from("output.mp4"),
            work_dir: std::env::temp_dir(),
            keep_scratch: false,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// Owns the collaborators and sequences the stages of a run.
pub struct Orchestrator {
    script: Box<dyn ScriptGenerator>,
    images: Box<dyn ImageGenerator>,
    speech: Box<dyn SpeechSynthesizer>,
    store: Box<dyn AssetStore>,
    encoder: Box<dyn VideoEncoder>,
    progress: Box<dyn ProgressObserver>,
    cancel: Arc<AtomicBool>,
}

impl Orchestrator {
    pub fn new(
        script: Box<dyn ScriptGenerator>,
        images: Box<dyn ImageGenerator>,
        speech: Box<dyn SpeechSynthesizer>,
        store: Box<dyn AssetStore>,
        encoder: Box<dyn VideoEncoder>,
    ) -> Self {
        Self {
            script,
            images,
            speech,
            store,
            encoder,
            progress: Box::new(LogProgress),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressObserver>) -> Self {
        self.progress = progress;
        self
    }

    /// Share a flag that stops the run at the next stage or scene boundary.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Generate a script for `prompt` and turn it into a video.
    pub async fn run(&self, prompt: &str, config: &PipelineConfig) -> Result<PathBuf, PipelineError> {
        validate_duration(config.target_total_duration)?;
        self.check_cancelled()?;

        self.stage(Stage::GeneratingScript);
        let script = call_with_timeout(
            GenerationStage::Script,
            config.call_timeout,
            self.script.generate_script(prompt),
        )
        .await?;
        log::info!("Script generated ({} characters)", script.len());

        self.run_script(&script, config).await
    }

    /// Turn an already written script into a video.
    ///
    /// # Errors
    ///
    /// `EmptyScript` when the script has no scenes (no service is called),
    /// otherwise the first error raised by any stage.
    pub async fn run_script(
        &self,
        script: &str,
        config: &PipelineConfig,
    ) -> Result<PathBuf, PipelineError> {
        validate_duration(config.target_total_duration)?;

        self.stage(Stage::ParsingScript);
        let scenes = parse_script(script, config.max_scenes);
        if scenes.is_empty() {
            return Err(PipelineError::EmptyScript);
        }
        log::info!("Parsed {} scenes", scenes.len());
        self.check_cancelled()?;

        let scratch = create_scratch_dir(&config.work_dir, config.keep_scratch).await?;
        let scratch_path = scratch.path().to_path_buf();
        log::debug!("Scratch directory: {}", scratch_path.display());

        self.stage(Stage::GeneratingAssets);
        let assets = AssetGenerationPipeline::new(
            self.images.as_ref(),
            self.speech.as_ref(),
            self.store.as_ref(),
            &scratch_path,
            self.progress.as_ref(),
        )
        .with_call_timeout(config.call_timeout)
        .with_cancel_flag(self.cancel.as_ref())
        .run(&scenes, &config.voice_id)
        .await?;
        self.check_cancelled()?;

        self.stage(Stage::BuildingTimeline);
        let timeline = build_timeline(&assets, config.target_total_duration)?;
        self.check_cancelled()?;

        self.stage(Stage::Encoding);
        let output = VideoAssembler::new(self.encoder.as_ref(), &scratch_path)
            .assemble(&timeline, &config.output_path)
            .await?;

        if config.keep_scratch {
            log::info!("Kept scratch directory {}", scratch_path.display());
        }
        drop(scratch);

        self.progress.on_progress(&Progress::Finished {
            output: output.clone(),
        });
        Ok(output)
    }

    fn stage(&self, stage: Stage) {
        self.progress.on_progress(&Progress::StageStarted(stage));
    }

    fn check_cancelled(&self) -> Result<(), PipelineError> {
        if self.cancel.load(Ordering::SeqCst) {
            return Err(PipelineError::Cancelled);
        }
        Ok(())
    }
}

fn validate_duration(target: f64) -> Result<(), PipelineError> {
    if !target.is_finite() || target <= 0.0 {
        return Err(PipelineError::InvalidDuration(target));
    }
    Ok(())
}

/// Per-run scratch directory, removed on drop unless kept.
enum ScratchDir {
    Temporary(TempDir),
    Kept(PathBuf),
}

impl ScratchDir {
    fn path(&self) -> &Path {
        match self {
            ScratchDir::Temporary(dir) => dir.path(),
            ScratchDir::Kept(path) => path,
        }
    }
}

/// Create a fresh, uniquely named directory under `work_dir` for one run.
///
/// The path is made absolute so the manifest can reference assets no matter
/// where the encoder resolves relative paths from.
async fn create_scratch_dir(work_dir: &Path, keep: bool) -> Result<ScratchDir, PipelineError> {
    let scratch_error = |source| PipelineError::Scratch {
        path: work_dir.to_path_buf(),
        source,
    };

    tokio::fs::create_dir_all(work_dir)
        .await
        .map_err(scratch_error)?;
    let work_dir = tokio::fs::canonicalize(work_dir)
        .await
        .map_err(scratch_error)?;

    let dir = tokio::task::spawn_blocking(move || {
        tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(&work_dir)
    })
    .await
    .map_err(|e| scratch_error(std::io::Error::other(e)))?
    .map_err(scratch_error)?;

    if keep {
        Ok(ScratchDir::Kept(dir.keep()))
    } else {
        Ok(ScratchDir::Temporary(dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::new("/videos/fox.mp4");
        assert_eq!(config.output_path, PathBuf::from("/videos/fox.mp4"));
        assert_eq!(config.target_total_duration, 30.0);
        assert_eq!(config.voice_id, DEFAULT_VOICE_ID);
        assert!(config.max_scenes.is_none());
        assert!(!config.keep_scratch);
    }

    #[test]
    fn test_validate_duration() {
        assert!(validate_duration(30.0).is_ok());
        assert!(validate_duration(0.5).is_ok());
        assert!(matches!(
            validate_duration(0.0),
            Err(PipelineError::InvalidDuration(_))
        ));
        assert!(validate_duration(f64::NAN).is_err());
    }

    #[tokio::test]
    async fn test_scratch_dirs_are_unique_and_absolute() {
        let work = TempDir::new().unwrap();
        let a = create_scratch_dir(work.path(), false).await.unwrap();
        let b = create_scratch_dir(work.path(), false).await.unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a.path().is_absolute());
        assert!(a
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(SCRATCH_PREFIX));
    }

    #[tokio::test]
    async fn test_scratch_dir_removed_unless_kept() {
        let work = TempDir::new().unwrap();

        let dropped = create_scratch_dir(work.path(), false).await.unwrap();
        let dropped_path = dropped.path().to_path_buf();
        drop(dropped);
        assert!(!dropped_path.exists());

        let kept = create_scratch_dir(work.path(), true).await.unwrap();
        let kept_path = kept.path().to_path_buf();
        drop(kept);
        assert!(kept_path.exists());
    }

    #[tokio::test]
    async fn test_scratch_dir_creates_missing_work_dir() {
        let root = TempDir::new().unwrap();
        let work_dir = root.path().join("nested").join("work");

        let scratch = create_scratch_dir(&work_dir, false).await.unwrap();
        assert!(scratch.path().is_dir());
        assert_eq!(
            scratch.path().parent().unwrap(),
            work_dir.canonicalize().unwrap()
        );
    }

    #[tokio::test]
    async fn test_scratch_dir_under_a_file_fails() {
        let root = TempDir::new().unwrap();
        let blocker = root.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let result = create_scratch_dir(&blocker.join("work"), false).await;
        match result {
            Err(PipelineError::Scratch { path, .. }) => {
                assert_eq!(path, blocker.join("work"));
            }
            Err(other) => panic!("Expected Scratch error, got {:?}", other),
            Ok(_) => panic!("Expected Scratch error"),
        }
    }
}
