//! Command-line interface definitions and helpers.
//!
//! This module contains all CLI argument parsing and subcommand handlers.

mod args;
mod commands;

pub use args::{Args, Command, ConfigAction, GenerateArgs};
pub use commands::{handle_config_action, print_scenes, run_generate};
