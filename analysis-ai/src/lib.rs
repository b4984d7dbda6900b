//! Conversation analysis abstraction layer for transcription, emotion and coaching providers.
//!
//! This crate provides trait-based abstractions for the three external analyzers a
//! conversation passes through:
//! - Speech-to-text transcription with speaker diarization
//! - Emotion inference producing per-utterance emotion score vectors
//! - An LLM coach that returns a structured communication assessment
//!
//! The design is provider-agnostic, enabling applications to swap between
//! different service providers (AssemblyAI, Hume, Anthropic, etc.) without
//! changing application code.

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::Error;
pub use types::media::Audio;
