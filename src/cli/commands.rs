//! Subcommand handlers for generate, scenes and config actions.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::args::{ConfigAction, GenerateArgs};
use crate::assembler::FfmpegEncoder;
use crate::config::{default_path, Config};
use crate::elevenlabs::{self, ElevenLabsClient, VoiceSettings};
use crate::fal::{self, FalClient};
use crate::generation::{FixedScript, HttpAssetStore, ScriptGenerator};
use crate::groq::{self, GroqClient};
use crate::orchestrator::Orchestrator;
use crate::scene::parse_script;

/// Generate a video and print where it was written.
pub fn run_generate(args: &GenerateArgs, config: &Config) -> Result<(), String> {
    let mut pipeline_config = config.pipeline_config();
    args.apply(&mut pipeline_config);

    let (script, prompt): (Box<dyn ScriptGenerator>, String) = match &args.script_file {
        Some(path) => (Box::new(FixedScript(read_script(path)?)), String::new()),
        None => (
            Box::new(build_groq_client(config)?),
            args.prompt.clone().unwrap_or_default(),
        ),
    };

    let images = build_fal_client(config)?;
    let speech = build_elevenlabs_client(config)?;
    let store = HttpAssetStore::new()
        .map_err(|e| format!("Failed to create download client: {}", e))?;
    let encoder = FfmpegEncoder::new(
        config.encoder.binary.clone(),
        config.encoder.video_codec.clone(),
        config.encoder.audio_codec.clone(),
    );

    let cancel = Arc::new(AtomicBool::new(false));
    if let Err(e) = setup_ctrlc_handler(Arc::clone(&cancel)) {
        eprintln!("Warning: Could not set up Ctrl+C handler: {}", e);
    }

    let orchestrator = Orchestrator::new(
        script,
        Box::new(images),
        Box::new(speech),
        Box::new(store),
        Box::new(encoder),
    )
    .with_cancel_flag(cancel);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to create async runtime: {}", e))?;

    let output = rt
        .block_on(orchestrator.run(&prompt, &pipeline_config))
        .map_err(|e| e.to_string())?;

    println!("Video written to {}", output.display());
    Ok(())
}

/// Print the scenes a script file splits into.
pub fn print_scenes(file: &Path, max_scenes: Option<usize>) -> Result<(), String> {
    let script = read_script(file)?;
    let scenes = parse_script(&script, max_scenes);

    if scenes.is_empty() {
        println!("No scenes found in {}.", file.display());
        return Ok(());
    }

    for (index, scene) in scenes.iter().enumerate() {
        println!("Scene {}: {}", index + 1, scene.description);
        for line in &scene.dialogues {
            println!("  - {}", line);
        }
    }
    println!();

    let lines: usize = scenes.iter().map(|s| s.dialogues.len()).sum();
    println!(
        "{} scene{}, {} dialogue line{}.",
        scenes.len(),
        if scenes.len() == 1 { "" } else { "s" },
        lines,
        if lines == 1 { "" } else { "s" }
    );
    Ok(())
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: &ConfigAction, path: Option<&Path>) -> Result<(), String> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(default_path);

    match action {
        ConfigAction::Show => {
            let config = Config::load(Some(config_path.as_path())).map_err(|e| e.to_string())?;
            let rendered = config
                .to_toml()
                .map_err(|e| format!("Failed to render config: {}", e))?;

            println!("Current configuration:");
            println!();
            println!("{}", rendered.trim_end());
            println!();
            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
            Ok(())
        }
        ConfigAction::Init => {
            if config_path.exists() {
                return Err(format!(
                    "Config file already exists: {}\nUse 'scene-reel config show' to view current settings.",
                    config_path.display()
                ));
            }

            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Error creating config directory: {}", e))?;
            }

            let rendered = Config::default()
                .to_toml()
                .map_err(|e| format!("Failed to render config: {}", e))?;
            let content = format!("# scene-reel configuration\n\n{}", rendered);
            std::fs::write(&config_path, content)
                .map_err(|e| format!("Error writing config file: {}", e))?;

            println!("Created config file: {}", config_path.display());
            Ok(())
        }
    }
}

/// Stop the run at the next boundary when Ctrl+C is pressed.
///
/// Can only be installed once per process.
fn setup_ctrlc_handler(cancel: Arc<AtomicBool>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        cancel.store(true, Ordering::SeqCst);
        eprintln!("\nReceived Ctrl+C, stopping after the current step...");
    })
}

fn read_script(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read script '{}': {}", path.display(), e))
}

fn missing_key_message(var: &str, service: &str, url: &str) -> String {
    format!(
        "{var} environment variable is not set.\n\n\
        To use {service}, add your API key to a .env file:\n    \
            echo '{var}=your-api-key-here' >> .env\n\n\
        Or set it as an environment variable:\n    \
            export {var}=\"your-api-key-here\"\n\n\
        Get your API key at: {url}"
    )
}

fn require_env(var: &str, service: &str, url: &str) -> Result<String, String> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(missing_key_message(var, service, url)),
    }
}

fn build_groq_client(config: &Config) -> Result<GroqClient, String> {
    let api_key = require_env(groq::GROQ_API_KEY_ENV, "Groq", "https://console.groq.com/")?;
    let client = GroqClient::with_base_url(api_key, config.script.base_url.clone())
        .map_err(|e| format!("Failed to create Groq client: {}", e))?;
    Ok(client
        .model(config.script.model.clone())
        .system_prompt(config.script.system_prompt.clone()))
}

fn build_fal_client(config: &Config) -> Result<FalClient, String> {
    let api_key = require_env(fal::FAL_API_KEY_ENV, "fal.ai", "https://fal.ai/")?;
    let client = FalClient::with_base_url(api_key, config.image.base_url.clone())
        .map_err(|e| format!("Failed to create fal.ai client: {}", e))?;
    Ok(client
        .model(config.image.model.clone())
        .model_name(config.image.model_name.clone())
        .generation_timeout(Duration::from_secs(config.image.generation_timeout_secs)))
}

fn build_elevenlabs_client(config: &Config) -> Result<ElevenLabsClient, String> {
    let api_key = require_env(
        elevenlabs::ELEVENLABS_API_KEY_ENV,
        "ElevenLabs",
        "https://elevenlabs.io/",
    )?;
    let speech = &config.speech;
    let client = ElevenLabsClient::with_base_url(api_key, speech.base_url.clone())
        .map_err(|e| format!("Failed to create ElevenLabs client: {}", e))?;
    Ok(client
        .model_id(speech.model_id.clone())
        .output_format(speech.output_format.clone())
        .voice_settings(VoiceSettings {
            stability: speech.stability,
            similarity_boost: speech.similarity_boost,
            style: speech.style,
        }))
}
