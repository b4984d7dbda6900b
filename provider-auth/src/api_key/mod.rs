//! API key authentication for service providers.
//!
//! Provides the trait and implementation for authenticating requests to the
//! transcription, emotion and coach services, all of which use API keys.

mod auth;

pub use auth::{ApiKeyAuth, ApiKeyProvider, AuthMethod, ProviderAuth};
