use crate::http::{decode, send};
use async_trait::async_trait;
use config::GeminiConfig;
use dv_core::{Instructions, ModelGateway, Provider};
use errors::GatewayError;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Google Generative Language API gateway.
pub struct GeminiGateway {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<serde_json::Value>
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>
}

impl GeminiGateway {
    pub fn new(api_key: impl Into<String>, config: &GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_tokens: config.max_tokens
        }
    }

    /// Builds the gateway when an API key is configured.
    pub fn from_config(config: &GeminiConfig) -> Option<Self> {
        config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .map(|key| Self::new(key, config))
    }

    fn model_url(&self) -> String {
        format!("{}/v1beta/models/{}", self.base_url, self.model)
    }
}

fn text_content(role: Option<&str>, text: String) -> Content {
    Content {
        role: role.map(ToString::to_string),
        parts: vec![Part { text: Some(text) }]
    }
}

#[async_trait]
impl ModelGateway for GeminiGateway {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn complete(
        &self,
        instructions: &Instructions,
        content: &str
    ) -> Result<String, GatewayError> {
        let body = GenerateRequest {
            contents: vec![text_content(Some("user"), instructions.render(content))],
            system_instruction: instructions
                .system
                .clone()
                .map(|system| text_content(None, system)),
            generation_config: GenerationConfig {
                max_output_tokens: self.max_tokens
            }
        };

        tracing::debug!(model = %self.model, "Sending Gemini generateContent request");
        let request = self
            .client
            .post(format!("{}:generateContent", self.model_url()))
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        let response = send(Provider::Gemini, request).await?;

        let parsed: GenerateResponse = decode(Provider::Gemini, response).await?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = match parsed.prompt_feedback {
                Some(feedback) => format!("no candidates returned: {feedback}"),
                None => "response contained no text".to_string()
            };
            return Err(GatewayError::Parse {
                provider: Provider::Gemini.to_string(),
                reason
            });
        }
        Ok(text)
    }

    async fn health_check(&self) -> bool {
        let request = self
            .client
            .get(self.model_url())
            .header("x-goog-api-key", &self.api_key);
        match send(Provider::Gemini, request).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Gemini health check failed");
                false
            }
        }
    }
}
