//! Distill engine: content acquisition over HTTP and the completion clients.
mod complete;
mod convert;
mod decode;
mod extract;
mod extractor;
mod fallback;
mod fetch;
mod sse;
mod summarize;
mod types;

pub use complete::{
    CallOptions, ChunkSink, CompletionBackend, CompletionSettings, OpenRouterClient, DEFAULT_ENDPOINT,
    DEFAULT_MAX_TOKENS,
};
pub use convert::{html_to_text, Converter, Html2MdConverter, PlainText};
pub use decode::{decode_body, DecodedBody};
pub use extract::{
    extract_title, select_content_html, ContainerExtractor, ExtractedHtml, Extractor,
    CONTENT_SELECTORS, MIN_CONTAINER_WORDS, UNTITLED,
};
pub use extractor::{ContentExtractor, DEFAULT_POST_TITLE};
pub use fallback::FallbackCompletionClient;
pub use fetch::{
    reader_url, FetchProfile, FetchSettings, Fetcher, ProbeMethod, ReqwestFetcher, DEFAULT_READER_BASE,
};
pub use sse::{SseDecoder, SseEvent};
pub use summarize::{SummarizeOptions, Summarizer, SummaryDefaults};
pub use types::{
    CompletionError, CompletionResult, ExtractedContent, FailureKind, FetchError, FetchMetadata,
    FetchOutput,
};

pub use tokio_util::sync::CancellationToken;
