use clap::Parser;
use tracing_subscriber::EnvFilter;

use scene_reel::cli::{self, Args, Command};
use scene_reel::config::Config;
use scene_reel::elevenlabs::ELEVENLABS_API_KEY_ENV;
use scene_reel::fal::FAL_API_KEY_ENV;
use scene_reel::groq::GROQ_API_KEY_ENV;

/// Load environment variables from .env file.
/// Logs a warning for each service key that is not set.
fn load_env() {
    // dotenv::dotenv() returns Err if .env doesn't exist, which is fine
    let _ = dotenv::dotenv();

    for var in [GROQ_API_KEY_ENV, FAL_API_KEY_ENV, ELEVENLABS_API_KEY_ENV] {
        if std::env::var(var).is_err() {
            log::warn!("{} environment variable not set", var);
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();

    let args = Args::parse();

    let result = match &args.command {
        Command::Generate(generate) => {
            load_env();
            match Config::load(args.config.as_deref()) {
                Ok(config) => cli::run_generate(generate, &config),
                Err(e) => Err(e.to_string()),
            }
        }
        Command::Scenes { file, max_scenes } => cli::print_scenes(file, *max_scenes),
        Command::Config { action } => cli::handle_config_action(action, args.config.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
