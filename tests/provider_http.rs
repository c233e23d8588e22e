//! Bridge against a mock OpenAI-compatible server

use ark_bridge::{
    ArkBridge, BridgeConfig, ChatEvent, ChatRequest, History, ModelParams, TurnStatus,
    MODEL_SENTINEL,
};
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn bridge(server: &MockServer, key: &str) -> ArkBridge {
    let config = BridgeConfig::default()
        .with_api_key(key)
        .with_base_url(server.uri())
        .with_default_model("ep-test");
    ArkBridge::new(config).unwrap()
}

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "ep-test",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
    })
}

fn sse(chunks: &[&str]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        let data = json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "created": 1_700_000_000,
            "model": "ep-test",
            "choices": [{"index": 0, "delta": {"content": chunk}, "finish_reason": null}]
        });
        body.push_str(&format!("data: {}\n\n", data));
    }
    body.push_str("data: {\"choices\":[],\"usage\":{\"prompt_tokens\":5,\"completion_tokens\":2,\"total_tokens\":7}}\n\n");
    body.push_str("data: [DONE]\n\n");
    body
}

async fn run_predict(bridge: &ArkBridge, request: ChatRequest) -> (ark_bridge::TurnOutcome, Vec<ChatEvent>) {
    let (tx, mut rx) = mpsc::channel(64);
    let outcome = bridge.predict(request, tx).await;
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (outcome, events)
}

#[tokio::test]
async fn blocking_call_sends_resolved_model_and_returns_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({"model": "ep-test", "max_tokens": 2048})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Hi there")))
        .expect(1)
        .mount(&server)
        .await;

    let request = ChatRequest::new("hello")
        .with_params(ModelParams::default().with_model(MODEL_SENTINEL));
    let reply = bridge(&server, "test-key").complete(request, None, false).await;

    assert_eq!(reply, "Hi there");
}

#[tokio::test]
async fn blocking_call_reports_api_error_as_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "message": "invalid api key",
                "type": "invalid_request_error",
                "param": null,
                "code": null
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = bridge(&server, "bad-key")
        .complete(ChatRequest::new("hello"), None, false)
        .await;

    assert!(reply.starts_with("Request failed:"), "got: {reply}");
    assert!(reply.contains("invalid api key"), "got: {reply}");
}

#[tokio::test]
async fn streaming_call_forwards_each_chunk() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({"model": "ep-test", "stream": true})))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse(&["Hi", "", " there"]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let request = ChatRequest::new("hello").with_history(History::from(["q1", "a1"]));
    let (outcome, events) = run_predict(&bridge(&server, "test-key"), request).await;

    assert_eq!(outcome.status, TurnStatus::Completed);
    assert_eq!(outcome.output, "Hi there");
    assert_eq!(outcome.history.len(), 4);

    let texts: Vec<&str> = events
        .iter()
        .filter_map(|event| match event {
            ChatEvent::Delta { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(texts, vec!["Hi", "Hi there"]);
    assert!(matches!(events.last(), Some(ChatEvent::TurnComplete { output, .. }) if output == "Hi there"));
}

#[tokio::test]
async fn streaming_http_error_fails_the_turn() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal failure"))
        .expect(1)
        .mount(&server)
        .await;

    let (outcome, events) = run_predict(&bridge(&server, "test-key"), ChatRequest::new("hello")).await;

    assert_eq!(outcome.status, TurnStatus::Failed);
    assert!(outcome.output.starts_with("[Error] API request failed"));
    assert!(outcome.output.contains("500"));
    assert!(outcome.output.contains("internal failure"));
    assert!(events.iter().any(|e| matches!(e, ChatEvent::Error { .. })));
}

#[tokio::test]
async fn error_event_inside_stream_fails_the_turn() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"par\"}}]}\n\n",
        "data: {\"error\":{\"message\":\"quota exceeded\"}}\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let (outcome, _) = run_predict(&bridge(&server, "test-key"), ChatRequest::new("hello")).await;

    assert_eq!(outcome.status, TurnStatus::Failed);
    assert!(outcome.output.contains("quota exceeded"));
}

#[tokio::test]
async fn missing_key_never_reaches_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let bridge = bridge(&server, "   ");
    let reply = bridge.complete(ChatRequest::new("hello"), None, false).await;
    assert_eq!(reply, "[Local Message] Please configure ARK_API_KEY");

    let (outcome, events) = run_predict(&bridge, ChatRequest::new("hello")).await;
    assert_eq!(outcome.status, TurnStatus::Rejected);
    assert!(matches!(&events[1], ChatEvent::Notice { message } if message.contains("ARK_API_KEY")));
}
