//! Pre-defined provider configurations.

mod config;

pub use config::{anthropic_config, assemblyai_config, hume_config, ProviderConfig};
