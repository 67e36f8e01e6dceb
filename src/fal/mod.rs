//! fal.ai image generation.
//!
//! Scene descriptions are submitted to fal.ai's queue API; the client polls
//! until the request completes and returns the URL of the first image.

mod client;

pub use client::{
    validate_prompt, FalClient, FalError, GenerationStatus, QueueResponse,
    DEFAULT_GENERATION_TIMEOUT, DEFAULT_MODEL, DEFAULT_MODEL_NAME, FAL_API_BASE_URL,
    FAL_API_KEY_ENV,
};
