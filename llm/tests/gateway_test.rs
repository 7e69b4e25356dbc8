use config::{ClaudeConfig, GeminiConfig};
use dv_core::{Instructions, ModelGateway, Severity};
use errors::{ErrorKind, GatewayError};
use llm::{ClaudeGateway, GeminiGateway};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ISSUES: &str = r#"```json
{"issues": [{"type": "dose_error", "severity": "HIGH", "location": "Medications", "current": "Warfarin 50mg", "suggestion": "Warfarin 5mg", "explanation": "Tenfold dose"}]}
```"#;

fn instructions() -> Instructions {
    Instructions::new(
        Some("You are a clinical safety reviewer.".to_string()),
        "Review the following discharge summary:\n{content}"
    )
}

fn claude(server: &MockServer) -> ClaudeGateway {
    let config = ClaudeConfig {
        api_key: Some("sk-ant-test".to_string()),
        base_url: server.uri(),
        ..ClaudeConfig::default()
    };
    ClaudeGateway::from_config(&config).unwrap()
}

fn gemini(server: &MockServer) -> GeminiGateway {
    let config = GeminiConfig {
        api_key: Some("g-test".to_string()),
        base_url: server.uri(),
        ..GeminiConfig::default()
    };
    GeminiGateway::from_config(&config).unwrap()
}

#[tokio::test]
async fn test_claude_analyze_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-3-5-sonnet-20241022",
            "max_tokens": 4096,
            "system": "You are a clinical safety reviewer.",
            "messages": [{
                "role": "user",
                "content": "Review the following discharge summary:\nWarfarin 50mg daily"
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_01",
            "type": "message",
            "content": [{ "type": "text", "text": ISSUES }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let drafts = claude(&server)
        .analyze(&instructions(), "Warfarin 50mg daily")
        .await
        .unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].issue_type, "dose_error");
    assert_eq!(drafts[0].severity, Severity::High);
}

#[tokio::test]
async fn test_claude_status_mapping() {
    let cases = [
        (401, ErrorKind::FatalConfig),
        (400, ErrorKind::FatalConfig),
        (429, ErrorKind::Transient),
        (529, ErrorKind::Transient)
    ];

    for (status, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(json!({"error": {"message": "nope"}}))
            )
            .mount(&server)
            .await;

        let err = claude(&server)
            .analyze(&instructions(), "doc")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), expected, "status {status}");
    }
}

#[tokio::test]
async fn test_claude_prose_reply_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": "The summary looks fine to me." }]
        })))
        .mount(&server)
        .await;

    let err = claude(&server)
        .analyze(&instructions(), "doc")
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Parse { .. }));
}

#[tokio::test]
async fn test_gemini_analyze_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(header("x-goog-api-key", "g-test"))
        .and(body_partial_json(json!({
            "systemInstruction": { "parts": [{ "text": "You are a clinical safety reviewer." }] },
            "generationConfig": { "maxOutputTokens": 4096 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": ISSUES }] },
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let drafts = gemini(&server)
        .analyze(&instructions(), "Warfarin 50mg daily")
        .await
        .unwrap();
    assert_eq!(drafts[0].current, "Warfarin 50mg");
}

#[tokio::test]
async fn test_gemini_blocked_prompt_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&server)
        .await;

    let err = gemini(&server)
        .complete(&instructions(), "doc")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(err.to_string().contains("SAFETY"));
}

#[tokio::test]
async fn test_gemini_forbidden_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = gemini(&server)
        .complete(&instructions(), "doc")
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Unauthorized { status: 403, .. }));
}

#[tokio::test]
async fn test_unreachable_server_is_transient() {
    let server = MockServer::start().await;
    let gateway = claude(&server);
    drop(server);

    let err = gateway
        .complete(&instructions(), "doc")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transient);
}

#[tokio::test]
async fn test_health_checks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models/claude-3-5-sonnet-20241022"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "claude-3-5-sonnet-20241022"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models/gemini-1.5-flash"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    assert!(claude(&server).health_check().await);
    assert!(!gemini(&server).health_check().await);
}
