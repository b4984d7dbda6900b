//! HTTP clients for the external analysis providers.
//!
//! Each gateway implements one of the `analysis-ai` provider traits and reduces every
//! provider-specific failure to `analysis_ai::Error` before returning.

use analysis_ai::Error as AnalysisError;
use log::*;
use provider_auth::api_key::{ApiKeyAuth, ApiKeyProvider};
use provider_auth::http::{AuthenticatedClientBuilder, ProviderClients};
use provider_auth::providers::ProviderConfig;
use serde::de::DeserializeOwned;
use service::config::Config;

use crate::error::Error;

pub mod anthropic;
pub mod assembly_ai;
pub mod hume;
pub mod polling;

/// Build the shared HTTP clients with the configured timeout and retry ceiling.
pub fn http_clients(config: &Config) -> Result<ProviderClients, Error> {
    AuthenticatedClientBuilder::new()
        .with_timeout(config.http_timeout())
        .with_max_retries(config.http_max_retries)
        .with_user_agent(format!(
            "conversation-insights/{}",
            env!("CARGO_PKG_VERSION")
        ))
        .build_with_base()
        .map_err(|e| provider_auth::Error::from(e).into())
}

/// Authentication for `provider`, or `None` when no usable key is configured.
///
/// A missing key is not fatal here; the gateway reports it when first used.
pub fn api_key_auth(provider: ApiKeyProvider, api_key: Option<&str>) -> Option<ApiKeyAuth> {
    match ApiKeyAuth::from_config(provider, api_key) {
        Ok(auth) => Some(auth),
        Err(e) => {
            warn!("{} is not usable: {}", provider.as_str(), e);
            None
        }
    }
}

pub(crate) fn require_auth<'a>(
    auth: &'a Option<ApiKeyAuth>,
    provider: &ProviderConfig,
) -> Result<&'a ApiKeyAuth, AnalysisError> {
    auth.as_ref().ok_or_else(|| {
        AnalysisError::Authentication(format!(
            "no API key configured for {}",
            provider.provider.as_str()
        ))
    })
}

/// Decode a successful JSON response, mapping error statuses and undecodable bodies.
pub(crate) async fn read_json<T: DeserializeOwned>(
    provider: &str,
    response: reqwest::Response,
) -> Result<T, AnalysisError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AnalysisError::from(provider_auth::Error::from(e)))?;

    if !status.is_success() {
        warn!("{} returned {}: {}", provider, status, body);
        return Err(AnalysisError::from_status(status.as_u16(), body));
    }

    serde_json::from_str(&body).map_err(|e| {
        warn!("Failed to parse {} response: {:?}", provider, e);
        AnalysisError::MalformedUpstreamJson(format!("{} response: {}", provider, e))
    })
}

pub(crate) fn transport(err: reqwest_middleware::Error) -> AnalysisError {
    provider_auth::Error::from(err).into()
}

pub(crate) fn with_default_headers(
    config: &ProviderConfig,
    mut request: reqwest_middleware::RequestBuilder,
) -> reqwest_middleware::RequestBuilder {
    for (name, value) in &config.default_headers {
        request = request.header(*name, *value);
    }
    request
}
