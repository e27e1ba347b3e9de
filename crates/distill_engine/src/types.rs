use std::fmt;

use distill_core::ClassifyError;

/// Normalized result of one extraction. `word_count` is computed once, when
/// the value is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub title: String,
    pub content: String,
    pub url: String,
    pub word_count: usize,
}

impl ExtractedContent {
    pub fn new(title: impl Into<String>, content: impl Into<String>, url: impl Into<String>) -> Self {
        let content = content.into();
        let word_count = distill_core::count_words(&content);
        Self {
            title: title.into(),
            content,
            url: url.into(),
            word_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub redirect_count: usize,
    pub content_type: Option<String>,
    pub byte_len: u64,
    pub encoding_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub body: String,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self.kind {
            FailureKind::HttpStatus(code) => Some(code),
            _ => None,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for FetchError {}

impl From<ClassifyError> for FetchError {
    fn from(err: ClassifyError) -> Self {
        FetchError::new(FailureKind::InvalidUrl, err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Outcome of one completion call. `cancelled` marks a call stopped by the
/// abort signal; `content` then holds what arrived before the stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult {
    pub content: String,
    pub model: String,
    pub cancelled: bool,
}

impl CompletionResult {
    pub fn cancelled(content: String, model: impl Into<String>) -> Self {
        Self {
            content,
            model: model.into(),
            cancelled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    #[error("model {model} is rate limited (429): {message}")]
    RateLimited { model: String, message: String },
    #[error("{message}")]
    Fatal { message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("no ranked models configured for automatic fallback")]
    NoRankedModels,
    #[error("all ranked models are rate limited; last error: {last_error}")]
    AllModelsRateLimited { last_error: String },
    #[error("no API key configured")]
    MissingApiKey,
    /// The model failed after part of its answer already reached the sink.
    #[error("model {model} failed mid-stream: {message}")]
    StreamInterrupted { model: String, message: String },
}

const RATE_LIMIT_MARKERS: &[&str] = &["429", "rate limit", "too many requests"];

impl CompletionError {
    pub(crate) fn fatal(message: impl Into<String>) -> Self {
        CompletionError::Fatal {
            message: message.into(),
        }
    }

    /// Rate-limit classification used by the fallback client: the structural
    /// variant, or any error whose text mentions a rate limit. The text match
    /// depends on upstream wording and may drift.
    pub fn is_rate_limited(&self) -> bool {
        if matches!(self, CompletionError::RateLimited { .. }) {
            return true;
        }
        if matches!(
            self,
            CompletionError::NoRankedModels
                | CompletionError::AllModelsRateLimited { .. }
                | CompletionError::MissingApiKey
                | CompletionError::StreamInterrupted { .. }
        ) {
            return false;
        }
        let text = self.to_string().to_ascii_lowercase();
        RATE_LIMIT_MARKERS.iter().any(|marker| text.contains(marker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_count_matches_content_tokens() {
        let content = ExtractedContent::new("T", "one two\n\nthree", "https://a.example");
        assert_eq!(content.word_count, 3);
    }

    #[test]
    fn rate_limit_detection_uses_variant_and_text() {
        let structural = CompletionError::RateLimited {
            model: "m".into(),
            message: String::new(),
        };
        assert!(structural.is_rate_limited());
        assert!(CompletionError::fatal("Provider says: Rate Limit exceeded").is_rate_limited());
        assert!(CompletionError::fatal("upstream error (code 429)").is_rate_limited());
        assert!(CompletionError::Network("Too Many Requests".into()).is_rate_limited());
        assert!(!CompletionError::fatal("invalid model id").is_rate_limited());
        let exhausted = CompletionError::AllModelsRateLimited {
            last_error: "429".into(),
        };
        assert!(!exhausted.is_rate_limited());
        let interrupted = CompletionError::StreamInterrupted {
            model: "m".into(),
            message: "Rate limit exceeded (code 429)".into(),
        };
        assert!(!interrupted.is_rate_limited());
    }
}
