//! Dialogue narration through ElevenLabs text-to-speech.

mod client;

pub use client::{
    ElevenLabsClient, ElevenLabsError, VoiceSettings, DEFAULT_OUTPUT_FORMAT, DEFAULT_VOICE_ID,
    ELEVENLABS_API_BASE_URL, ELEVENLABS_API_KEY_ENV,
};
