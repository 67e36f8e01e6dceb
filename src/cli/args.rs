//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::orchestrator::PipelineConfig;

/// Turn a text prompt into a narrated slideshow video
#[derive(Parser, Debug)]
#[command(name = "scene-reel")]
#[command(version, about = "Turn a text prompt into a narrated slideshow video", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Write a script, illustrate it, narrate it, encode it
    scene-reel generate \"A short story about a magical forest adventure\"

    # 60 second video from the first 4 scenes
    scene-reel generate \"A fox learns to fly\" -d 60 -n 4 -o fox.mp4

    # Skip script generation and use a script you wrote
    scene-reel generate --script-file story.txt

    # Check how a script will be split into scenes
    scene-reel scenes story.txt")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a video from a prompt or an existing script
    Generate(GenerateArgs),
    /// Show how a script file splits into scenes
    Scenes {
        /// Script file to parse
        file: PathBuf,

        /// Only keep the first N scenes
        #[arg(long, short = 'n')]
        max_scenes: Option<usize>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug, Clone, PartialEq)]
pub struct GenerateArgs {
    /// Prompt for the script writer
    #[arg(required_unless_present = "script_file", conflicts_with = "script_file")]
    pub prompt: Option<String>,

    /// Use this script instead of generating one
    #[arg(long, short = 'f')]
    pub script_file: Option<PathBuf>,

    /// Length of the final video in seconds
    #[arg(long, short, value_parser = parse_duration)]
    pub duration: Option<f64>,

    /// Only keep the first N scenes
    #[arg(long, short = 'n')]
    pub max_scenes: Option<usize>,

    /// Voice for the narration
    #[arg(long, short)]
    pub voice: Option<String>,

    /// Output video path
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Directory for per-run scratch files
    #[arg(long, short)]
    pub work_dir: Option<PathBuf>,

    /// Keep the scratch directory after the run
    #[arg(long)]
    pub keep_scratch: bool,
}

impl GenerateArgs {
    /// Apply command-line overrides on top of configured values.
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(duration) = self.duration {
            config.target_total_duration = duration;
        }
        if let Some(max_scenes) = self.max_scenes {
            config.max_scenes = Some(max_scenes);
        }
        if let Some(voice) = &self.voice {
            config.voice_id = voice.clone();
        }
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if let Some(work_dir) = &self.work_dir {
            config.work_dir = work_dir.clone();
        }
        if self.keep_scratch {
            config.keep_scratch = true;
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

/// Parse and validate a duration in seconds (positive, finite)
fn parse_duration(s: &str) -> Result<f64, String> {
    let secs: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number of seconds", s))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("Duration must be greater than 0, got {}", s));
    }
    Ok(secs)
}
