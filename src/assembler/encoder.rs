//! FFmpeg process management for the final encode.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;

use crate::error::EncodeError;

/// Number of trailing stderr lines kept when FFmpeg fails.
const STDERR_TAIL_LINES: usize = 20;

pub const DEFAULT_FFMPEG_BINARY: &str = "ffmpeg";
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
pub const DEFAULT_AUDIO_CODEC: &str = "aac";

/// Produces a video from an image manifest and a list of audio tracks.
#[async_trait]
pub trait VideoEncoder: Send + Sync {
    /// Encode into `output_path`. Returns once the encoder has exited.
    async fn encode(
        &self,
        manifest_path: &Path,
        audio_paths: &[PathBuf],
        output_path: &Path,
    ) -> Result<(), EncodeError>;
}

/// Runs the `ffmpeg` binary with the concat demuxer.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: String,
    video_codec: String,
    audio_codec: String,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_FFMPEG_BINARY, DEFAULT_VIDEO_CODEC, DEFAULT_AUDIO_CODEC)
    }
}

impl FfmpegEncoder {
    pub fn new(
        binary: impl Into<String>,
        video_codec: impl Into<String>,
        audio_codec: impl Into<String>,
    ) -> Self {
        Self {
            binary: binary.into(),
            video_codec: video_codec.into(),
            audio_codec: audio_codec.into(),
        }
    }

    /// Build the FFmpeg command line (excluding the binary itself).
    ///
    /// Audio tracks are joined with the `concat:` protocol into one input,
    /// played back to back in list order. With no tracks the video is silent.
    pub fn build_args(
        &self,
        manifest_path: &Path,
        audio_paths: &[PathBuf],
        output_path: &Path,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-y".into(),
            "-hide_banner".into(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            manifest_path.as_os_str().to_owned(),
        ];

        if !audio_paths.is_empty() {
            let joined = audio_paths
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("|");
            args.push("-i".into());
            args.push(format!("concat:{}", joined).into());
        }

        args.push("-c:v".into());
        args.push(self.video_codec.clone().into());
        args.push("-pix_fmt".into());
        args.push("yuv420p".into());

        if !audio_paths.is_empty() {
            args.push("-c:a".into());
            args.push(self.audio_codec.clone().into());
        }

        args.push(output_path.as_os_str().to_owned());
        args
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[async_trait]
impl VideoEncoder for FfmpegEncoder {
    async fn encode(
        &self,
        manifest_path: &Path,
        audio_paths: &[PathBuf],
        output_path: &Path,
    ) -> Result<(), EncodeError> {
        let args = self.build_args(manifest_path, audio_paths, output_path);
        log::debug!("Running {} {:?}", self.binary, args);

        let output = tokio::process::Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EncodeError::NotFound(self.binary.clone())
                } else {
                    EncodeError::SpawnFailed(e)
                }
            })?;

        if !output.status.success() {
            return Err(EncodeError::ProcessFailed {
                exit_code: output.status.code(),
                stderr: stderr_tail(&output.stderr),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_as_strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_args_with_audio() {
        let encoder = FfmpegEncoder::default();
        let args = args_as_strings(encoder.build_args(
            Path::new("/scratch/manifest.txt"),
            &[
                PathBuf::from("/scratch/audio_000.mp3"),
                PathBuf::from("/scratch/audio_001.mp3"),
            ],
            Path::new("/out/.video.partial.mp4"),
        ));
        assert_eq!(
            args,
            vec![
                "-y",
                "-hide_banner",
                "-f",
                "concat",
                "-safe",
                "0",
                "-i",
                "/scratch/manifest.txt",
                "-i",
                "concat:/scratch/audio_000.mp3|/scratch/audio_001.mp3",
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-c:a",
                "aac",
                "/out/.video.partial.mp4",
            ]
        );
    }

    #[test]
    fn test_args_without_audio_have_no_audio_input() {
        let encoder = FfmpegEncoder::new("ffmpeg", "libx265", "libopus");
        let args = args_as_strings(encoder.build_args(
            Path::new("m.txt"),
            &[],
            Path::new("out.mp4"),
        ));
        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 1);
        assert!(!args.contains(&"-c:a".to_string()));
        assert!(args.contains(&"libx265".to_string()));
        assert_eq!(args.last().unwrap(), "out.mp4");
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let stderr = (0..50)
            .map(|i| format!("line {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        let tail = stderr_tail(stderr.as_bytes());
        assert_eq!(tail.lines().count(), STDERR_TAIL_LINES);
        assert!(tail.ends_with("line 49"));
        assert!(tail.starts_with("line 30"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        let encoder = FfmpegEncoder::new("scene-reel-no-such-ffmpeg", "libx264", "aac");
        let result = encoder
            .encode(Path::new("m.txt"), &[], Path::new("out.mp4"))
            .await;
        assert!(matches!(result, Err(EncodeError::NotFound(name)) if name == "scene-reel-no-such-ffmpeg"));
    }
}
