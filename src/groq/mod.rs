//! Script generation through Groq.

mod client;

pub use client::{
    GroqClient, GroqError, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT, GROQ_API_BASE_URL,
    GROQ_API_KEY_ENV,
};
