//! Final assembly: manifest on disk, one encoder run, atomic publish.
//!
//! The encoder writes to a hidden sibling of the requested output path.
//! Only a successful encode is renamed into place, so a failed run never
//! leaves a truncated video behind.

mod encoder;
mod manifest;

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::error::{EncodeError, PipelineError};
use crate::timeline::Timeline;

pub use encoder::{
    FfmpegEncoder, VideoEncoder, DEFAULT_AUDIO_CODEC, DEFAULT_FFMPEG_BINARY, DEFAULT_VIDEO_CODEC,
};
pub use manifest::render_manifest;

/// File name of the manifest inside the scratch directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.txt";

/// Temporary path the encoder writes to before the final rename.
///
/// Lives next to `output` so the rename stays on one filesystem, and keeps
/// the extension so the encoder can pick the container format.
pub fn staging_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match output.extension() {
        Some(ext) => format!(".{}.partial.{}", stem, ext.to_string_lossy()),
        None => format!(".{}.partial", stem),
    };
    output.with_file_name(name)
}

pub struct VideoAssembler<'a> {
    encoder: &'a dyn VideoEncoder,
    scratch_dir: PathBuf,
}

impl<'a> VideoAssembler<'a> {
    pub fn new(encoder: &'a dyn VideoEncoder, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            encoder,
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.scratch_dir.join(MANIFEST_FILE_NAME)
    }

    /// Write the manifest, run the encoder once and publish the result.
    ///
    /// # Errors
    ///
    /// `EmptyTimeline` for a timeline without segments, `EncodingFailed` when
    /// the manifest cannot be written, the encoder fails, or the result cannot
    /// be moved into place.
    pub async fn assemble(
        &self,
        timeline: &Timeline,
        output_path: &Path,
    ) -> Result<PathBuf, PipelineError> {
        if timeline.segments.is_empty() {
            return Err(PipelineError::EmptyTimeline);
        }

        let manifest_path = self.manifest_path();
        write_manifest(&manifest_path, &render_manifest(&timeline.segments)).await?;
        log::info!(
            "Wrote manifest with {} segments to {}",
            timeline.segments.len(),
            manifest_path.display()
        );

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(EncodeError::Io)?;
            }
        }

        let staging = staging_path(output_path);
        let _ = tokio::fs::remove_file(&staging).await;

        if let Err(e) = self
            .encoder
            .encode(&manifest_path, &timeline.audio_track_paths, &staging)
            .await
        {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }

        match tokio::fs::metadata(&staging).await {
            Ok(meta) if meta.is_file() => {}
            _ => {
                let _ = tokio::fs::remove_file(&staging).await;
                return Err(EncodeError::MissingOutput(output_path.to_path_buf()).into());
            }
        }

        if let Err(e) = tokio::fs::rename(&staging, output_path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(EncodeError::Io(e).into());
        }

        Ok(output_path.to_path_buf())
    }
}

/// Write and sync the manifest; the encoder opens it by path afterwards.
async fn write_manifest(path: &Path, contents: &str) -> Result<(), EncodeError> {
    let to_manifest_error = |source| EncodeError::Manifest {
        path: path.to_path_buf(),
        source,
    };

    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(to_manifest_error)?;
    file.write_all(contents.as_bytes())
        .await
        .map_err(to_manifest_error)?;
    file.flush().await.map_err(to_manifest_error)?;
    file.sync_all().await.map_err(to_manifest_error)?;
    Ok(())
}
