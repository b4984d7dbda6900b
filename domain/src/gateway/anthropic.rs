//! Anthropic Messages API client acting as the conversation coach.

use std::time::Instant;

use analysis_ai::traits::coach::Provider;
use analysis_ai::types::coach::{extract_json, Options};
use analysis_ai::Error as AnalysisError;
use async_trait::async_trait;
use log::*;
use provider_auth::api_key::{ApiKeyAuth, ApiKeyProvider, ProviderAuth};
use provider_auth::http::ProviderClients;
use provider_auth::providers::{anthropic_config, ProviderConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use service::config::Config;

use super::{api_key_auth, read_json, require_auth, transport, with_default_headers};

const PROVIDER_ID: &str = "anthropic";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

pub struct AnthropicClient {
    clients: ProviderClients,
    auth: Option<ApiKeyAuth>,
    config: ProviderConfig,
}

impl AnthropicClient {
    pub fn new(clients: ProviderClients, auth: Option<ApiKeyAuth>, config: ProviderConfig) -> Self {
        Self {
            clients,
            auth,
            config,
        }
    }

    pub fn from_config(config: &Config, clients: ProviderClients) -> Self {
        let auth = api_key_auth(ApiKeyProvider::Anthropic, config.coach_api_key().as_deref());
        Self::new(
            clients,
            auth,
            anthropic_config().with_base_url(config.coach_base_url()),
        )
    }
}

#[async_trait]
impl Provider for AnthropicClient {
    async fn analyze(
        &self,
        transcript: &str,
        instruction: &str,
        options: &Options,
    ) -> Result<Value, AnalysisError> {
        if transcript.trim().is_empty() {
            return Err(AnalysisError::InvalidInput("transcript is empty".to_string()));
        }
        let auth = require_auth(&self.auth, &self.config)?;
        let started = Instant::now();

        let body = MessagesRequest {
            model: &options.model,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            system: options.system_prompt.as_deref(),
            messages: vec![Message {
                role: "user",
                content: format!("{}\n\nTranscript:\n{}", instruction, transcript),
            }],
        };
        let request = with_default_headers(
            &self.config,
            self.clients
                .client
                .post(self.config.endpoint("messages"))
                .json(&body),
        );

        let response = auth.authenticate(request).send().await.map_err(transport)?;
        let reply: MessagesResponse = read_json(PROVIDER_ID, response).await?;
        if reply.stop_reason.as_deref() == Some("max_tokens") {
            warn!(
                "Coach reply was cut off at {} tokens; JSON may be incomplete",
                options.max_tokens
            );
        }

        let text = reply
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        debug!("Coach reply is {} characters", text.len());

        let document = extract_json(&text)?;
        info!(
            "Anthropic {} analyzed transcript in {:?}",
            options.model,
            started.elapsed()
        );
        Ok(document)
    }

    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::test_support::clients;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn client(base_url: &str) -> AnthropicClient {
        AnthropicClient::new(
            clients(0),
            ApiKeyAuth::from_config(ApiKeyProvider::Anthropic, Some("sk-test")).ok(),
            anthropic_config().with_base_url(base_url),
        )
    }

    fn reply(text: &str) -> String {
        json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": text}],
            "stop_reason": "end_turn"
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_extracts_fenced_json_from_prose() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .match_header("x-api-key", "sk-test")
            .match_header("anthropic-version", "2023-06-01")
            .match_body(Matcher::PartialJson(json!({
                "model": "claude-3-7-sonnet-20250219",
                "max_tokens": 4096,
                "system": "Be a coach"
            })))
            .with_body(reply(
                "Here is the analysis:\n```json\n{\"conversation_summary\": \"ok\"}\n```\nThanks!",
            ))
            .create_async()
            .await;

        let options = Options {
            system_prompt: Some("Be a coach".to_string()),
            ..Options::default()
        };
        let value = client(&server.url())
            .analyze("[A]: hi", "Analyze this", &options)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(value, json!({"conversation_summary": "ok"}));
    }

    #[tokio::test]
    async fn test_prose_without_json_is_malformed() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/messages")
            .with_body(reply("I cannot analyze this conversation."))
            .create_async()
            .await;

        let err = client(&server.url())
            .analyze("[A]: hi", "Analyze this", &Options::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedUpstreamJson(_)));
    }

    #[tokio::test]
    async fn test_rate_limit_is_upstream_and_transient() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/messages")
            .with_status(429)
            .with_body(r#"{"type": "error", "error": {"type": "rate_limit_error"}}"#)
            .create_async()
            .await;

        let err = client(&server.url())
            .analyze("[A]: hi", "Analyze this", &Options::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Upstream { status: 429, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed_not_network() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/messages")
            .with_body("<html>gateway</html>")
            .create_async()
            .await;

        let err = client(&server.url())
            .analyze("[A]: hi", "Analyze this", &Options::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedUpstreamJson(_)));
    }
}
