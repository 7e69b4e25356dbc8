//! Core traits for the Discharge Validator

use crate::response::{IssueDraft, parse_issue_list};
use crate::types::{Instructions, Provider};
use async_trait::async_trait;
use errors::{GatewayError, ValidationError};

/// Uniform interface to one model provider.
///
/// Implementations only need to provide [`ModelGateway::complete`]; the
/// default [`ModelGateway::analyze`] turns the raw completion into issue
/// drafts.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    fn provider(&self) -> Provider;

    /// Sends the rendered instructions and returns the complete response text.
    async fn complete(
        &self,
        instructions: &Instructions,
        content: &str
    ) -> Result<String, GatewayError>;

    /// Runs the instructions against the content and parses the issue list.
    async fn analyze(
        &self,
        instructions: &Instructions,
        content: &str
    ) -> Result<Vec<IssueDraft>, GatewayError> {
        let text = self.complete(instructions, content).await?;
        parse_issue_list(&text).map_err(|reason| {
            tracing::debug!(
                provider = %self.provider(),
                preview = %text.chars().take(200).collect::<String>(),
                "Unparseable model response"
            );
            GatewayError::Parse {
                provider: self.provider().to_string(),
                reason
            }
        })
    }

    /// Cheap round trip used by health reporting.
    async fn health_check(&self) -> bool;
}

/// Source of per-provider check instructions.
pub trait PromptSource: Send + Sync {
    fn instructions(&self, provider: Provider, check: &str) -> Option<Instructions>;
}

/// Turns an uploaded file into plain text before the engine sees it.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, ValidationError>;
}

/// Accepts UTF-8 text files as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, _file_name: &str, bytes: Vec<u8>) -> Result<String, ValidationError> {
        String::from_utf8(bytes).map_err(|e| ValidationError::InvalidEncoding {
            valid_up_to: e.utf8_error().valid_up_to()
        })
    }
}
