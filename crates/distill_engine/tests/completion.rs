use std::sync::{Mutex, Once};

use distill_engine::{
    CallOptions, CancellationToken, ChunkSink, CompletionBackend, CompletionError, CompletionSettings,
    FallbackCompletionClient, OpenRouterClient,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHAT_PATH: &str = "/api/v1/chat/completions";

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(distill_logging::initialize_for_tests);
}

fn client(server: &MockServer) -> OpenRouterClient {
    init_logging();
    let settings = CompletionSettings {
        endpoint: format!("{}{CHAT_PATH}", server.uri()),
        ..CompletionSettings::default()
    };
    OpenRouterClient::new("test-key", settings).expect("client")
}

/// Records chunks; optionally cancels the call once `cancel_after` chunks arrived.
#[derive(Default)]
struct RecordingSink {
    chunks: Mutex<Vec<String>>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl RecordingSink {
    fn chunks(&self) -> Vec<String> {
        self.chunks.lock().unwrap().clone()
    }
}

impl ChunkSink for RecordingSink {
    fn emit(&self, chunk: &str) {
        let mut chunks = self.chunks.lock().unwrap();
        chunks.push(chunk.to_string());
        if let Some((limit, token)) = &self.cancel_after {
            if chunks.len() >= *limit {
                token.cancel();
            }
        }
    }
}

fn delta_frame(text: &str) -> String {
    format!(
        "data: {}\n\n",
        json!({"model": "vendor/model-echo", "choices": [{"delta": {"content": text}}]})
    )
}

fn sse_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
}

#[tokio::test]
async fn non_streaming_request_shape_and_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "vendor/model",
            "max_tokens": 1024,
            "messages": [{"role": "user", "content": "Summarize this."}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "vendor/model-2024",
            "choices": [{"message": {"role": "assistant", "content": "A summary."}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server)
        .complete("vendor/model", "Summarize this.", &CallOptions::new())
        .await
        .unwrap();
    assert_eq!(result.content, "A summary.");
    assert_eq!(result.model, "vendor/model-2024");
    assert!(!result.cancelled);

    let requests = server.received_requests().await.expect("recording enabled");
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("stream").is_none());
}

#[tokio::test]
async fn missing_choice_yields_empty_content_and_requested_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let result = client(&server)
        .complete("m", "p", &CallOptions::new())
        .await
        .unwrap();
    assert_eq!(result.content, "");
    assert_eq!(result.model, "m");
}

#[tokio::test]
async fn status_429_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"message": "Rate limit exceeded: free-models-per-min", "code": 429}
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .complete("vendor/free", "p", &CallOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(&err, CompletionError::RateLimited { model, .. } if model == "vendor/free"));
    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn other_status_is_fatal_with_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "model not found", "code": 400}
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .complete("nope", "p", &CallOptions::new())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CompletionError::Fatal {
            message: "HTTP 400 Bad Request: model not found (code 400)".to_string()
        }
    );
    assert!(!err.is_rate_limited());
}

#[tokio::test]
async fn error_inside_success_body_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"message": "Provider returned error", "code": 502}
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .complete("m", "p", &CallOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Provider returned error (code 502)");
}

#[tokio::test]
async fn streaming_forwards_chunks_in_order_and_skips_malformed_frames() {
    let server = MockServer::start().await;
    let body = [
        ": OPENROUTER PROCESSING\n\n".to_string(),
        delta_frame("Hel"),
        "data: {not json\n\n".to_string(),
        delta_frame(""),
        delta_frame("lo"),
        "data: [DONE]\n\n".to_string(),
        delta_frame(" ignored"),
    ]
    .concat();
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(sse_response(body))
        .expect(1)
        .mount(&server)
        .await;

    let sink = RecordingSink::default();
    let options = CallOptions::new().with_sink(&sink);
    let result = client(&server).complete("vendor/model", "p", &options).await.unwrap();

    assert_eq!(sink.chunks(), vec!["Hel".to_string(), "lo".to_string()]);
    assert_eq!(result.content, "Hello");
    assert_eq!(result.model, "vendor/model-echo");
    assert!(!result.cancelled);
}

#[tokio::test]
async fn stream_without_done_marker_still_completes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(sse_response(format!("{}{}", delta_frame("a"), delta_frame("b").trim_end())))
        .mount(&server)
        .await;

    let sink = RecordingSink::default();
    let options = CallOptions::new().with_sink(&sink);
    let result = client(&server).complete("m", "p", &options).await.unwrap();
    assert_eq!(result.content, "ab");
}

#[tokio::test]
async fn error_frame_is_fatal() {
    let server = MockServer::start().await;
    let body = format!(
        "{}data: {}\n\n",
        delta_frame("partial"),
        json!({"error": {"message": "Upstream overloaded", "code": 503}})
    );
    Mock::given(method("POST"))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    let sink = RecordingSink::default();
    let options = CallOptions::new().with_sink(&sink);
    let err = client(&server).complete("m", "p", &options).await.unwrap_err();
    assert_eq!(err.to_string(), "Upstream overloaded (code 503)");
    assert_eq!(sink.chunks(), vec!["partial".to_string()]);
}

#[tokio::test]
async fn in_band_rate_limit_frame_is_detected_by_message() {
    let server = MockServer::start().await;
    let body = format!("data: {}\n\n", json!({"error": {"message": "Too Many Requests", "code": 429}}));
    Mock::given(method("POST"))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    let sink = RecordingSink::default();
    let options = CallOptions::new().with_sink(&sink);
    let err = client(&server).complete("m", "p", &options).await.unwrap_err();
    assert!(matches!(err, CompletionError::Fatal { .. }));
    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn cancelling_after_two_chunks_keeps_exactly_those_chunks() {
    let server = MockServer::start().await;
    let body = ["one ", "two ", "three ", "four"]
        .iter()
        .map(|text| delta_frame(text))
        .chain(std::iter::once("data: [DONE]\n\n".to_string()))
        .collect::<String>();
    Mock::given(method("POST"))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let sink = RecordingSink {
        cancel_after: Some((2, token.clone())),
        ..RecordingSink::default()
    };
    let options = CallOptions::new().with_sink(&sink).with_cancel(token);
    let result = client(&server).complete("m", "p", &options).await.unwrap();

    assert!(result.cancelled);
    assert_eq!(result.content, "one two ");
    assert_eq!(sink.chunks(), vec!["one ".to_string(), "two ".to_string()]);
}

#[tokio::test]
async fn already_cancelled_call_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    token.cancel();
    let options = CallOptions::new().with_cancel(token);
    let result = client(&server).complete("m", "p", &options).await.unwrap();
    assert!(result.cancelled);
    assert_eq!(result.content, "");
    assert_eq!(result.model, "m");
}

#[tokio::test]
async fn transport_failure_is_network_error() {
    init_logging();
    let settings = CompletionSettings {
        endpoint: "http://127.0.0.1:9/unreachable".to_string(),
        ..CompletionSettings::default()
    };
    let client = OpenRouterClient::new("k", settings).unwrap();
    let err = client.complete("m", "p", &CallOptions::new()).await.unwrap_err();
    assert!(matches!(err, CompletionError::Network(_)), "{err:?}");
}

fn rate_limit_frame() -> String {
    format!(
        "data: {}\n\n",
        json!({"error": {"message": "Rate limit exceeded", "code": 429}})
    )
}

async fn mount_model(server: &MockServer, model: &str, body: String, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(body_partial_json(json!({"model": model})))
        .respond_with(sse_response(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn rate_limit_after_streamed_text_stops_the_fallback() {
    let server = MockServer::start().await;
    let partial = format!("{}{}", delta_frame("Partial from A "), rate_limit_frame());
    mount_model(&server, "a", partial, 1).await;
    let full = format!("{}data: [DONE]\n\n", delta_frame("Full from B"));
    mount_model(&server, "b", full, 0).await;

    let sink = RecordingSink::default();
    let fallback = FallbackCompletionClient::new(client(&server));
    let models = vec!["a".to_string(), "b".to_string()];
    let err = fallback
        .complete_with_fallback("p", &models, &CallOptions::new().with_sink(&sink))
        .await
        .unwrap_err();

    assert!(matches!(&err, CompletionError::StreamInterrupted { model, .. } if model == "a"));
    assert!(!err.is_rate_limited());
    assert_eq!(sink.chunks(), vec!["Partial from A ".to_string()]);
}

#[tokio::test]
async fn rate_limit_before_any_text_moves_to_next_model() {
    let server = MockServer::start().await;
    mount_model(&server, "a", rate_limit_frame(), 1).await;
    let full = format!("{}data: [DONE]\n\n", delta_frame("Full from B"));
    mount_model(&server, "b", full, 1).await;

    let sink = RecordingSink::default();
    let fallback = FallbackCompletionClient::new(client(&server));
    let models = vec!["a".to_string(), "b".to_string()];
    let result = fallback
        .complete_with_fallback("p", &models, &CallOptions::new().with_sink(&sink))
        .await
        .unwrap();

    assert_eq!(result.content, "Full from B");
    assert_eq!(sink.chunks().concat(), result.content);
}
