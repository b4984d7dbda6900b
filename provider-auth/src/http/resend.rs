//! Retry loop for requests that cannot pass through the retry middleware.
//!
//! The middleware clones each request before sending it, which is impossible for
//! streaming bodies such as multipart forms. Here the request is rebuilt from
//! scratch on every attempt and classified with the same rules the middleware uses.

use std::time::SystemTime;

use log::*;
use reqwest_retry::{
    default_on_request_failure, default_on_request_success, RetryDecision, RetryPolicy, Retryable,
};

use super::ProviderBackoff;
use crate::error::Error;

/// Send the request produced by `make_request`, rebuilding and resending it while
/// the outcome is transient and the policy allows another attempt.
pub async fn send_with_retry<F>(
    policy: &ProviderBackoff,
    mut make_request: F,
) -> Result<reqwest::Response, Error>
where
    F: FnMut() -> reqwest::RequestBuilder,
{
    let start = SystemTime::now();
    let mut n_past_retries = 0;

    loop {
        let result = make_request()
            .send()
            .await
            .map_err(reqwest_middleware::Error::from);
        let retryable = match &result {
            Ok(response) => default_on_request_success(response),
            Err(err) => default_on_request_failure(err),
        };

        if matches!(retryable, Some(Retryable::Transient)) {
            if let RetryDecision::Retry { execute_after } =
                policy.should_retry(start, n_past_retries)
            {
                let wait = execute_after
                    .duration_since(SystemTime::now())
                    .unwrap_or_default();
                warn!(
                    "Transient failure on attempt {}, retrying in {:?}",
                    n_past_retries + 1,
                    wait
                );
                tokio::time::sleep(wait).await;
                n_past_retries += 1;
                continue;
            }
        }

        return result.map_err(Error::from);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_policy(max_retries: u32) -> ProviderBackoff {
        ProviderBackoff::new(max_retries)
            .with_delays(Duration::from_millis(1), Duration::from_millis(5))
    }

    fn multipart_form() -> reqwest::multipart::Form {
        reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(b"RIFF....".to_vec()).file_name("call.wav"),
        )
    }

    #[tokio::test]
    async fn test_retries_multipart_until_success() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("POST", "/upload")
            .with_status(502)
            .expect(2)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/upload", server.url());
        let mut attempts = 0;

        let result = send_with_retry(&fast_policy(1), || {
            attempts += 1;
            client.post(&url).multipart(multipart_form())
        })
        .await
        .unwrap();

        assert_eq!(result.status().as_u16(), 502);
        assert_eq!(attempts, 2);
        failing.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_error_is_returned_without_retry() {
        let mut server = mockito::Server::new_async().await;
        let rejected = server
            .mock("POST", "/upload")
            .with_status(422)
            .expect(1)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/upload", server.url());

        let response = send_with_retry(&fast_policy(3), || {
            client.post(&url).multipart(multipart_form())
        })
        .await
        .unwrap();

        assert_eq!(response.status().as_u16(), 422);
        rejected.assert_async().await;
    }
}
