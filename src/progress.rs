//! Progress notifications emitted while a run is in flight.
//!
//! Observers only watch; nothing they do can change the course of a run.

use std::fmt;

/// Coarse stages of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    GeneratingScript,
    ParsingScript,
    GeneratingAssets,
    BuildingTimeline,
    Encoding,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::GeneratingScript => "generating script",
            Stage::ParsingScript => "parsing script",
            Stage::GeneratingAssets => "generating assets",
            Stage::BuildingTimeline => "building timeline",
            Stage::Encoding => "encoding video",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    StageStarted(Stage),
    /// `index` is 1-based.
    SceneStarted {
        index: usize,
        total: usize,
        description: String,
    },
    DialogueStarted {
        scene: usize,
        line: usize,
        text: String,
    },
    Finished {
        output: std::path::PathBuf,
    },
}

pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: &Progress);
}

/// Writes progress to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_progress(&self, event: &Progress) {
        match event {
            Progress::StageStarted(stage) => log::info!("Stage: {}", stage),
            Progress::SceneStarted {
                index,
                total,
                description,
            } => log::info!("Scene {}/{}: {}", index, total, description),
            Progress::DialogueStarted { scene, line, text } => {
                log::info!("  Narrating scene {} line {}: {}", scene, line, text)
            }
            Progress::Finished { output } => log::info!("Video created: {}", output.display()),
        }
    }
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressObserver for SilentProgress {
    fn on_progress(&self, _event: &Progress) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::GeneratingScript.to_string(), "generating script");
        assert_eq!(Stage::Encoding.to_string(), "encoding video");
    }
}
