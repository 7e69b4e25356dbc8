use crate::http::{decode, send};
use async_trait::async_trait;
use config::ClaudeConfig;
use dv_core::{Instructions, ModelGateway, Provider};
use errors::GatewayError;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API gateway.
pub struct ClaudeGateway {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: String
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>
}

impl ClaudeGateway {
    pub fn new(api_key: impl Into<String>, config: &ClaudeConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_tokens: config.max_tokens
        }
    }

    /// Builds the gateway when an API key is configured.
    pub fn from_config(config: &ClaudeConfig) -> Option<Self> {
        config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .map(|key| Self::new(key, config))
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
    }
}

#[async_trait]
impl ModelGateway for ClaudeGateway {
    fn provider(&self) -> Provider {
        Provider::Claude
    }

    async fn complete(
        &self,
        instructions: &Instructions,
        content: &str
    ) -> Result<String, GatewayError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: instructions.system.as_deref(),
            messages: vec![Message {
                role: "user",
                content: instructions.render(content)
            }]
        };

        tracing::debug!(model = %self.model, "Sending Claude messages request");
        let response = send(
            Provider::Claude,
            self.request(reqwest::Method::POST, "/v1/messages").json(&body)
        )
        .await?;

        let parsed: MessagesResponse = decode(Provider::Claude, response).await?;
        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.trim().is_empty() {
            return Err(GatewayError::Parse {
                provider: Provider::Claude.to_string(),
                reason: "response contained no text".to_string()
            });
        }
        Ok(text)
    }

    async fn health_check(&self) -> bool {
        let path = format!("/v1/models/{}", self.model);
        match send(Provider::Claude, self.request(reqwest::Method::GET, &path)).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Claude health check failed");
                false
            }
        }
    }
}
