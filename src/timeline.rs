//! Timing for the final video.
//!
//! Every image is shown for the same amount of time: the target duration
//! split evenly across the images. Audio tracks are passed through in the
//! order they were generated.

use std::path::PathBuf;

use crate::error::{MaterializeError, PipelineError};
use crate::generation::GeneratedAssets;
use crate::media::MediaAsset;

/// One image and how long it stays on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineSegment {
    pub image_path: PathBuf,
    pub duration_seconds: f64,
}

/// Everything the assembler needs, in final order.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    /// One segment per scene image, in scene order.
    pub segments: Vec<TimelineSegment>,
    /// Narration clips in generation order.
    pub audio_track_paths: Vec<PathBuf>,
}

impl Timeline {
    /// Sum of all segment durations.
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration_seconds).sum()
    }
}

/// Build the timeline for a set of generated assets.
///
/// # Errors
///
/// `EmptyTimeline` if there are no images, `InvalidDuration` if the target is
/// not a positive finite number, `AssetMaterializationFailure` if any asset
/// has not been written to local storage.
pub fn build_timeline(
    assets: &GeneratedAssets,
    target_total_duration: f64,
) -> Result<Timeline, PipelineError> {
    if assets.images.is_empty() {
        return Err(PipelineError::EmptyTimeline);
    }
    if !target_total_duration.is_finite() || target_total_duration <= 0.0 {
        return Err(PipelineError::InvalidDuration(target_total_duration));
    }

    let per_image = target_total_duration / assets.images.len() as f64;

    let segments = assets
        .images
        .iter()
        .map(|image| {
            Ok(TimelineSegment {
                image_path: require_local_path(image)?,
                duration_seconds: per_image,
            })
        })
        .collect::<Result<Vec<_>, PipelineError>>()?;

    let audio_track_paths = assets
        .audio
        .iter()
        .map(require_local_path)
        .collect::<Result<Vec<_>, PipelineError>>()?;

    log::debug!(
        "Timeline: {} segments of {}s, {} audio tracks",
        segments.len(),
        per_image,
        audio_track_paths.len()
    );

    Ok(Timeline {
        segments,
        audio_track_paths,
    })
}

fn require_local_path(asset: &MediaAsset) -> Result<PathBuf, PipelineError> {
    asset
        .local_path
        .clone()
        .ok_or_else(|| PipelineError::AssetMaterializationFailure {
            kind: asset.kind,
            handle: asset.source_handle.clone(),
            source: MaterializeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "asset was never written to local storage",
            )),
        })
}
