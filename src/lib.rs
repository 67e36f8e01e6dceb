//! scene-reel library crate.
//!
//! Turns a text prompt into a narrated slideshow video: a script is written,
//! split into scenes, each scene is illustrated and its dialogue narrated,
//! and the results are encoded into a single video with ffmpeg.

pub mod assembler;
pub mod cli;
pub mod config;
pub mod elevenlabs;
pub mod error;
pub mod fal;
pub mod generation;
pub mod groq;
pub mod media;
pub mod orchestrator;
pub mod progress;
pub mod scene;
pub mod timeline;

pub use error::{GenerationError, GenerationStage, PipelineError};
pub use generation::GeneratedAssets;
pub use media::{MediaAsset, MediaHandle, MediaKind};
pub use orchestrator::{Orchestrator, PipelineConfig};
pub use scene::{parse_script, Scene};
pub use timeline::{build_timeline, Timeline, TimelineSegment};
