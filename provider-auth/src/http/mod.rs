//! HTTP client building with middleware.

mod client;
mod resend;
mod retry;

pub use client::{AuthenticatedClient, AuthenticatedClientBuilder, HttpClientConfig, ProviderClients};
pub use resend::send_with_retry;
pub use retry::ProviderBackoff;
