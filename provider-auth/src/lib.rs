//! # provider-auth
//!
//! Authentication and HTTP plumbing for the external analysis providers:
//! - API key authentication for the transcription, emotion and coach services
//! - HTTP client building with retry middleware
//! - Retrying of requests whose bodies cannot be cloned (multipart uploads)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use provider_auth::{
//!     api_key::{ApiKeyAuth, ApiKeyProvider, ProviderAuth},
//!     http::AuthenticatedClientBuilder,
//! };
//!
//! let auth = ApiKeyAuth::new(ApiKeyProvider::AssemblyAi, SecretString::from(key));
//! let client = AuthenticatedClientBuilder::new().with_max_retries(3).build()?;
//! let response = auth.authenticate(client.get(url)).send().await?;
//! ```

pub mod api_key;
pub mod error;
pub mod http;
pub mod providers;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
