//! Per-scene asset generation.
//!
//! Scenes are processed strictly in order. For each scene the image is
//! generated and written to local storage first, then one narration clip per
//! dialogue line, in line order. The first failure aborts the whole run.

mod store;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{GenerationError, GenerationStage, MaterializeError, PipelineError};
use crate::media::{MediaAsset, MediaHandle, MediaKind};
use crate::progress::{Progress, ProgressObserver};
use crate::scene::Scene;

pub use store::HttpAssetStore;

/// Turns a prompt into a raw script.
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate_script(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// A script written ahead of time. The prompt is ignored.
#[derive(Debug, Clone)]
pub struct FixedScript(pub String);

#[async_trait]
impl ScriptGenerator for FixedScript {
    async fn generate_script(&self, _prompt: &str) -> Result<String, GenerationError> {
        Ok(self.0.clone())
    }
}

/// Turns a scene description into an image.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(&self, description: &str) -> Result<MediaHandle, GenerationError>;
}

/// Turns a line of dialogue into narration.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<MediaHandle, GenerationError>;
}

/// Writes generated media to local storage.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Write `handle` to `dest` and return the path written.
    async fn materialize(
        &self,
        handle: &MediaHandle,
        dest: &Path,
    ) -> Result<PathBuf, MaterializeError>;
}

/// Output of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedAssets {
    /// One image per scene, in scene order.
    pub images: Vec<MediaAsset>,
    /// Every narration clip, scene order then dialogue order.
    pub audio: Vec<MediaAsset>,
}

/// Await `fut`, giving up after `limit`.
pub(crate) async fn call_with_timeout<T, F>(
    stage: GenerationStage,
    limit: Duration,
    fut: F,
) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, GenerationError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(|e| PipelineError::generation(stage, e)),
        Err(_) => Err(PipelineError::generation(
            stage,
            GenerationError::Timeout(limit),
        )),
    }
}

/// A handle with nothing in it is as good as a failed call.
fn ensure_usable(stage: GenerationStage, handle: &MediaHandle) -> Result<(), PipelineError> {
    let empty = match handle {
        MediaHandle::Remote { url } => url.trim().is_empty(),
        MediaHandle::Inline { bytes, .. } => bytes.is_empty(),
    };
    if empty {
        return Err(PipelineError::generation(stage, GenerationError::EmptyResult));
    }
    Ok(())
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// File extension for a downloaded image, taken from the URL when it names one.
fn image_extension(handle: &MediaHandle) -> &'static str {
    if let MediaHandle::Remote { url } = handle {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        if let Some((_, ext)) = path.rsplit_once('.') {
            let ext = ext.to_ascii_lowercase();
            if let Some(known) = IMAGE_EXTENSIONS.iter().find(|k| **k == ext) {
                return *known;
            }
        }
    }
    "png"
}

/// Drives the image and speech services over a list of scenes.
pub struct AssetGenerationPipeline<'a> {
    images: &'a dyn ImageGenerator,
    speech: &'a dyn SpeechSynthesizer,
    store: &'a dyn AssetStore,
    scratch_dir: PathBuf,
    call_timeout: Duration,
    progress: &'a dyn ProgressObserver,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> AssetGenerationPipeline<'a> {
    pub fn new(
        images: &'a dyn ImageGenerator,
        speech: &'a dyn SpeechSynthesizer,
        store: &'a dyn AssetStore,
        scratch_dir: impl Into<PathBuf>,
        progress: &'a dyn ProgressObserver,
    ) -> Self {
        Self {
            images,
            speech,
            store,
            scratch_dir: scratch_dir.into(),
            call_timeout: crate::orchestrator::DEFAULT_CALL_TIMEOUT,
            progress,
            cancel: None,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Abort before the next scene once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Generate and store every asset for `scenes`.
    ///
    /// # Errors
    ///
    /// Returns the first `GenerationFailure` or `AssetMaterializationFailure`
    /// encountered. Nothing is generated for any scene after the failing one.
    pub async fn run(
        &self,
        scenes: &[Scene],
        voice_id: &str,
    ) -> Result<GeneratedAssets, PipelineError> {
        let mut assets = GeneratedAssets::default();
        let total = scenes.len();

        for (index, scene) in scenes.iter().enumerate() {
            self.check_cancelled()?;

            self.progress.on_progress(&Progress::SceneStarted {
                index: index + 1,
                total,
                description: scene.description.clone(),
            });

            let handle = call_with_timeout(
                GenerationStage::Image,
                self.call_timeout,
                self.images.generate_image(&scene.description),
            )
            .await?;
            ensure_usable(GenerationStage::Image, &handle)?;

            let dest = self
                .scratch_dir
                .join(format!("image_{:03}.{}", index, image_extension(&handle)));
            let image = self.store_asset(MediaKind::Image, &handle, &dest).await?;
            assets.images.push(image);

            for (line, dialogue) in scene.dialogues.iter().enumerate() {
                self.progress.on_progress(&Progress::DialogueStarted {
                    scene: index + 1,
                    line: line + 1,
                    text: dialogue.clone(),
                });

                let handle = call_with_timeout(
                    GenerationStage::Speech,
                    self.call_timeout,
                    self.speech.synthesize(dialogue, voice_id),
                )
                .await?;
                ensure_usable(GenerationStage::Speech, &handle)?;

                let dest = self
                    .scratch_dir
                    .join(format!("audio_{:03}.mp3", assets.audio.len()));
                let clip = self.store_asset(MediaKind::Audio, &handle, &dest).await?;
                assets.audio.push(clip);
            }
        }

        log::info!(
            "Generated {} images and {} audio clips",
            assets.images.len(),
            assets.audio.len()
        );
        Ok(assets)
    }

    async fn store_asset(
        &self,
        kind: MediaKind,
        handle: &MediaHandle,
        dest: &Path,
    ) -> Result<MediaAsset, PipelineError> {
        let path = self.store.materialize(handle, dest).await.map_err(|source| {
            PipelineError::AssetMaterializationFailure {
                kind,
                handle: handle.source().to_string(),
                source,
            }
        })?;
        log::debug!("Stored {} {} at {}", kind, handle.source(), path.display());
        Ok(MediaAsset::materialized(kind, handle.source(), path))
    }

    fn check_cancelled(&self) -> Result<(), PipelineError> {
        match self.cancel {
            Some(flag) if flag.load(Ordering::SeqCst) => Err(PipelineError::Cancelled),
            _ => Ok(()),
        }
    }
}
