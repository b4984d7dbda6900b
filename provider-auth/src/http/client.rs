//! Authenticated HTTP client builder with middleware.

use std::time::Duration;

use reqwest_middleware::ClientBuilder;
use reqwest_retry::RetryTransientMiddleware;

use super::ProviderBackoff;

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum number of retries.
    pub max_retries: u32,
    /// First backoff delay; doubles on every retry.
    pub base_retry_delay: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_retries: 3,
            base_retry_delay: Duration::from_secs(1),
            user_agent: format!("provider-auth/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Authenticated HTTP client with middleware.
pub type AuthenticatedClient = reqwest_middleware::ClientWithMiddleware;

/// Clients produced by [`AuthenticatedClientBuilder::build_with_base`].
///
/// `base` shares the connection pool of `client` but has no middleware, so it can
/// send bodies that cannot be cloned; pair it with `policy` and [`super::send_with_retry`].
#[derive(Clone)]
pub struct ProviderClients {
    pub client: AuthenticatedClient,
    pub base: reqwest::Client,
    pub policy: ProviderBackoff,
}

/// Builder for creating HTTP clients with middleware.
///
/// Provides a fluent API for constructing HTTP clients with:
/// - Retry logic with exponential backoff
/// - Timeout configuration
/// - User agent
pub struct AuthenticatedClientBuilder {
    config: HttpClientConfig,
}

impl AuthenticatedClientBuilder {
    /// Create a new client builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: HttpClientConfig::default(),
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Set the first backoff delay.
    pub fn with_base_retry_delay(mut self, delay: Duration) -> Self {
        self.config.base_retry_delay = delay;
        self
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.config.user_agent = user_agent;
        self
    }

    fn retry_policy(&self) -> ProviderBackoff {
        ProviderBackoff::new(self.config.max_retries)
            .with_delays(self.config.base_retry_delay, Duration::from_secs(60))
    }

    /// Build the configured HTTP client.
    ///
    /// # Returns
    ///
    /// An HTTP client with retry middleware configured.
    pub fn build(self) -> Result<AuthenticatedClient, reqwest::Error> {
        Ok(self.build_with_base()?.client)
    }

    /// Build the middleware client together with its bare counterpart and retry policy.
    pub fn build_with_base(self) -> Result<ProviderClients, reqwest::Error> {
        // Build the base reqwest client
        let base = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .user_agent(self.config.user_agent.clone())
            .build()?;

        let policy = self.retry_policy();
        let client = ClientBuilder::new(base.clone())
            .with(RetryTransientMiddleware::new_with_policy(policy.clone()))
            .build();

        Ok(ProviderClients {
            client,
            base,
            policy,
        })
    }
}

impl Default for AuthenticatedClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_default() {
        let builder = AuthenticatedClientBuilder::new();
        assert_eq!(builder.config.timeout, Duration::from_secs(60));
        assert_eq!(builder.config.max_retries, 3);
    }

    #[test]
    fn test_builder_with_timeout() {
        let builder = AuthenticatedClientBuilder::new().with_timeout(Duration::from_secs(5));
        assert_eq!(builder.config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_builder_with_max_retries() {
        let builder = AuthenticatedClientBuilder::new().with_max_retries(5);
        assert_eq!(builder.retry_policy().max_retries(), 5);
    }

    #[tokio::test]
    async fn test_build_client() {
        let builder = AuthenticatedClientBuilder::new();
        let result = builder.build();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_middleware_retries_server_errors() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("GET", "/flaky")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client = AuthenticatedClientBuilder::new()
            .with_max_retries(2)
            .with_base_retry_delay(Duration::from_millis(1))
            .build()
            .unwrap();

        let response = client
            .get(format!("{}/flaky", server.url()))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 503);
        failing.assert_async().await;
    }

    #[tokio::test]
    async fn test_middleware_does_not_retry_client_errors() {
        let mut server = mockito::Server::new_async().await;
        let rejected = server
            .mock("GET", "/bad")
            .with_status(400)
            .expect(1)
            .create_async()
            .await;

        let client = AuthenticatedClientBuilder::new()
            .with_base_retry_delay(Duration::from_millis(1))
            .build()
            .unwrap();

        let response = client
            .get(format!("{}/bad", server.url()))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 400);
        rejected.assert_async().await;
    }
}
