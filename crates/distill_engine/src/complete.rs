use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use distill_logging::{distill_debug, distill_info};

use crate::sse::{SseDecoder, SseEvent};
use crate::{CompletionError, CompletionResult};

pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Receives streamed text in arrival order. Called synchronously from the read
/// loop, so a slow sink slows the stream.
pub trait ChunkSink: Send + Sync {
    fn emit(&self, chunk: &str);
}

/// Per-call switches: a sink turns streaming on, the token aborts the call.
#[derive(Clone, Default)]
pub struct CallOptions<'a> {
    pub sink: Option<&'a dyn ChunkSink>,
    pub cancel: CancellationToken,
}

impl<'a> CallOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: &'a dyn ChunkSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// One model invocation.
#[async_trait::async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        options: &CallOptions<'_>,
    ) -> Result<CompletionResult, CompletionError>;
}

#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub endpoint: String,
    pub max_tokens: u32,
    pub connect_timeout: Duration,
    /// Longest silence tolerated between bytes of a response.
    pub read_timeout: Duration,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Shape shared by full responses and stream frames; every field is optional
/// because providers omit them freely.
#[derive(Debug, Default, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatContent>,
    #[serde(default)]
    delta: Option<ChatContent>,
}

#[derive(Debug, Deserialize)]
struct ChatContent {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    fn message_content(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default()
    }

    fn delta_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.as_ref())
            .and_then(|delta| delta.content.as_deref())
            .filter(|content| !content.is_empty())
    }
}

/// Readable text for an `error` value: either a bare string or an object with
/// `message` and optional `code`.
fn describe_error(error: &serde_json::Value) -> String {
    match error {
        serde_json::Value::String(message) => message.clone(),
        serde_json::Value::Object(fields) => {
            let message = fields
                .get("message")
                .and_then(|value| value.as_str())
                .map(ToOwned::to_owned)
                .unwrap_or_else(|| error.to_string());
            match fields.get("code").filter(|code| !code.is_null()) {
                Some(serde_json::Value::String(code)) => format!("{message} (code {code})"),
                Some(code) => format!("{message} (code {code})"),
                None => message,
            }
        }
        other => other.to_string(),
    }
}

/// Client for an OpenAI-compatible chat completions endpoint (OpenRouter by default).
#[derive(Clone)]
pub struct OpenRouterClient {
    http: reqwest::Client,
    api_key: String,
    settings: CompletionSettings,
}

impl std::fmt::Debug for OpenRouterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterClient")
            .field("endpoint", &self.settings.endpoint)
            .field("max_tokens", &self.settings.max_tokens)
            .finish_non_exhaustive()
    }
}

impl OpenRouterClient {
    pub fn new(api_key: impl Into<String>, settings: CompletionSettings) -> Result<Self, CompletionError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(CompletionError::MissingApiKey);
        }
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .read_timeout(settings.read_timeout)
            .build()
            .map_err(network_error)?;
        Ok(Self {
            http,
            api_key,
            settings,
        })
    }

    async fn send(&self, model: &str, prompt: &str, stream: bool) -> Result<reqwest::Response, CompletionError> {
        let body = ChatRequest {
            model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.settings.max_tokens,
            stream,
        };
        let accept = if stream { "text/event-stream" } else { "application/json" };
        let response = self
            .http
            .post(&self.settings.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(ACCEPT, accept)
            .header("X-Title", "distill")
            .json(&body)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ChatResponse>(&text)
            .ok()
            .and_then(|parsed| parsed.error)
            .map(|error| describe_error(&error))
            .unwrap_or_else(|| text.trim().to_string());
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CompletionError::RateLimited {
                model: model.to_string(),
                message: detail,
            });
        }
        Err(CompletionError::fatal(format!("HTTP {status}: {detail}")))
    }

    async fn complete_once(&self, model: &str, prompt: &str) -> Result<CompletionResult, CompletionError> {
        let response = self.send(model, prompt, false).await?;
        let parsed: ChatResponse = response.json().await.map_err(|err| {
            if err.is_decode() {
                CompletionError::fatal(format!("invalid completion response: {err}"))
            } else {
                network_error(err)
            }
        })?;
        if let Some(error) = &parsed.error {
            return Err(CompletionError::fatal(describe_error(error)));
        }
        let echoed = parsed.model.clone().filter(|echoed| !echoed.is_empty());
        Ok(CompletionResult {
            content: parsed.message_content(),
            model: echoed.unwrap_or_else(|| model.to_string()),
            cancelled: false,
        })
    }

    async fn complete_streaming(
        &self,
        model: &str,
        prompt: &str,
        sink: &dyn ChunkSink,
        cancel: &CancellationToken,
    ) -> Result<CompletionResult, CompletionError> {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                distill_info!("completion with {model} cancelled before the stream opened");
                return Ok(CompletionResult::cancelled(String::new(), model));
            }
            response = self.send(model, prompt, true) => response?,
        };

        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut content = String::new();
        let mut echoed: Option<String> = None;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = stream.next() => Some(next),
            };
            let Some(next) = next else {
                distill_info!("completion with {model} cancelled after {} chars", content.len());
                return Ok(CompletionResult::cancelled(content, echoed.as_deref().unwrap_or(model)));
            };
            let (events, exhausted) = match next {
                Some(chunk) => (decoder.push(&chunk.map_err(network_error)?), false),
                None => (decoder.finish(), true),
            };

            for event in events {
                if cancel.is_cancelled() {
                    distill_info!("completion with {model} cancelled after {} chars", content.len());
                    return Ok(CompletionResult::cancelled(content, echoed.as_deref().unwrap_or(model)));
                }
                let data = match event {
                    SseEvent::Done => return Ok(finished(content, echoed, model)),
                    SseEvent::Data(data) => data,
                };
                let frame: ChatResponse = match serde_json::from_str(&data) {
                    Ok(frame) => frame,
                    Err(err) => {
                        distill_debug!("skipping malformed stream frame ({err}): {data}");
                        continue;
                    }
                };
                if let Some(error) = &frame.error {
                    return Err(CompletionError::fatal(describe_error(error)));
                }
                if echoed.is_none() {
                    echoed = frame.model.clone().filter(|echoed| !echoed.is_empty());
                }
                if let Some(delta) = frame.delta_content() {
                    content.push_str(delta);
                    sink.emit(delta);
                }
            }

            if exhausted {
                return Ok(finished(content, echoed, model));
            }
        }
    }
}

fn finished(content: String, echoed: Option<String>, requested: &str) -> CompletionResult {
    CompletionResult {
        content,
        model: echoed.unwrap_or_else(|| requested.to_string()),
        cancelled: false,
    }
}

fn network_error(err: reqwest::Error) -> CompletionError {
    CompletionError::Network(err.to_string())
}

#[async_trait::async_trait]
impl CompletionBackend for OpenRouterClient {
    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        options: &CallOptions<'_>,
    ) -> Result<CompletionResult, CompletionError> {
        if options.is_cancelled() {
            return Ok(CompletionResult::cancelled(String::new(), model));
        }
        match options.sink {
            Some(sink) => self.complete_streaming(model, prompt, sink, &options.cancel).await,
            None => tokio::select! {
                biased;
                _ = options.cancel.cancelled() => {
                    distill_info!("completion with {model} cancelled");
                    Ok(CompletionResult::cancelled(String::new(), model))
                }
                result = self.complete_once(model, prompt) => result,
            },
        }
    }
}
