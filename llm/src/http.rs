//! Request plumbing shared by the HTTP gateways.

use dv_core::Provider;
use errors::GatewayError;
use reqwest::{RequestBuilder, Response, StatusCode};

const ERROR_BODY_PREVIEW: usize = 300;

/// Sends a request and returns the response only when it is a 2xx.
pub(crate) async fn send(provider: Provider, request: RequestBuilder) -> Result<Response, GatewayError> {
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(provider, &e))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(provider, status, &body))
}

/// Maps a transport-level failure (no HTTP status) to a gateway error.
///
/// The call deadline is enforced by the engine, so a timeout raised inside
/// the HTTP client is reported as a network failure.
pub(crate) fn transport_error(provider: Provider, err: &reqwest::Error) -> GatewayError {
    let reason = if err.is_timeout() {
        format!("client timeout: {err}")
    } else {
        err.to_string()
    };
    GatewayError::Network {
        provider: provider.to_string(),
        reason
    }
}

/// Maps a non-success HTTP status to a gateway error.
///
/// 408, 429 and 5xx (including Anthropic's 529) are transient; credentials
/// problems and any other 4xx are configuration errors.
pub(crate) fn status_error(provider: Provider, status: StatusCode, body: &str) -> GatewayError {
    let reason: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
    let code = status.as_u16();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Unauthorized {
            provider: provider.to_string(),
            status: code
        },
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            GatewayError::Unavailable {
                provider: provider.to_string(),
                status: code,
                reason
            }
        }
        s if s.is_server_error() => GatewayError::Unavailable {
            provider: provider.to_string(),
            status: code,
            reason
        },
        _ => GatewayError::Misconfigured {
            provider: provider.to_string(),
            reason: format!("HTTP {code}: {reason}")
        }
    }
}

/// Decodes a success body, treating a schema mismatch as a parse failure.
pub(crate) async fn decode<T: serde::de::DeserializeOwned>(
    provider: Provider,
    response: Response
) -> Result<T, GatewayError> {
    let text = response
        .text()
        .await
        .map_err(|e| transport_error(provider, &e))?;
    serde_json::from_str(&text).map_err(|e| GatewayError::Parse {
        provider: provider.to_string(),
        reason: format!("unexpected response envelope: {e}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use errors::ErrorKind;

    #[test]
    fn test_status_classification() {
        let kind = |code: u16| {
            status_error(
                Provider::Claude,
                StatusCode::from_u16(code).unwrap(),
                "body"
            )
            .kind()
        };

        assert_eq!(kind(401), ErrorKind::FatalConfig);
        assert_eq!(kind(403), ErrorKind::FatalConfig);
        assert_eq!(kind(400), ErrorKind::FatalConfig);
        assert_eq!(kind(404), ErrorKind::FatalConfig);
        assert_eq!(kind(408), ErrorKind::Transient);
        assert_eq!(kind(429), ErrorKind::Transient);
        assert_eq!(kind(500), ErrorKind::Transient);
        assert_eq!(kind(503), ErrorKind::Transient);
        assert_eq!(kind(529), ErrorKind::Transient);
    }

    #[tokio::test]
    async fn test_client_timeout_is_network_error() {
        use std::time::Duration;
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        let err = send(Provider::Gemini, client.get(server.uri()))
            .await
            .unwrap_err();

        match &err {
            GatewayError::Network { reason, .. } => assert!(reason.starts_with("client timeout")),
            other => panic!("unexpected error: {other:?}")
        }
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(!err.to_string().contains("0ms"));
    }

    #[test]
    fn test_error_body_is_truncated() {
        let body = "x".repeat(5000);
        match status_error(Provider::Gemini, StatusCode::BAD_GATEWAY, &body) {
            GatewayError::Unavailable { reason, .. } => {
                assert_eq!(reason.len(), ERROR_BODY_PREVIEW);
            }
            other => panic!("unexpected error: {other:?}")
        }
    }
}
