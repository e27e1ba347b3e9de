use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};

use crate::decode::decode_body;
use crate::{FailureKind, FetchError, FetchMetadata, FetchOutput};

pub const DEFAULT_READER_BASE: &str = "https://r.jina.ai/";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub user_agent: String,
    /// Prefix the target URL is appended to when a page needs server-side rendering.
    pub reader_base: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 10,
            max_bytes: 5 * 1024 * 1024,
            user_agent: BROWSER_USER_AGENT.to_string(),
            reader_base: DEFAULT_READER_BASE.to_string(),
        }
    }
}

impl FetchSettings {
    pub fn reader_url(&self, target: &str) -> String {
        reader_url(&self.reader_base, target)
    }
}

/// The reader service takes the full target URL as its path.
pub fn reader_url(base: &str, target: &str) -> String {
    if base.ends_with('/') {
        format!("{base}{target}")
    } else {
        format!("{base}/{target}")
    }
}

/// What kind of document a request asks for; decides the `Accept` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchProfile {
    Html,
    PlainText,
    Reader,
}

impl FetchProfile {
    fn accept(self) -> &'static str {
        match self {
            FetchProfile::Html => "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            FetchProfile::PlainText => "text/plain,text/markdown;q=0.9,*/*;q=0.5",
            FetchProfile::Reader => "text/markdown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeMethod {
    Head,
    Get,
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Downloads `url` and decodes the body to text.
    async fn fetch(&self, url: &str, profile: FetchProfile) -> Result<FetchOutput, FetchError>;

    /// Follows redirects from `url` and returns where they end. The status of
    /// the final response is not checked.
    async fn final_url(&self, url: &str, method: ProbeMethod) -> Result<String, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    fn build_client(&self, redirect_counter: Arc<AtomicUsize>) -> Result<reqwest::Client, FetchError> {
        let redirect_limit = self.settings.redirect_limit;
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            let count = attempt.previous().len();
            redirect_counter.store(count, Ordering::Relaxed);
            if count >= redirect_limit {
                attempt.error("redirect limit exceeded")
            } else {
                attempt.follow()
            }
        });

        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(policy)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }

    fn too_large(&self, actual: u64) -> FetchError {
        FetchError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual: Some(actual),
            },
            "response too large",
        )
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str, profile: FetchProfile) -> Result<FetchOutput, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let redirect_counter = Arc::new(AtomicUsize::new(0));
        let client = self.build_client(redirect_counter.clone())?;

        let response = client
            .get(parsed)
            .header(USER_AGENT, self.settings.user_agent.as_str())
            .header(ACCEPT, profile.accept())
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(self.too_large(content_len));
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(self.too_large(next_len));
            }
            bytes.extend_from_slice(&chunk);
        }

        let decoded = decode_body(&bytes, content_type.as_deref());
        let metadata = FetchMetadata {
            original_url: url.to_string(),
            final_url,
            redirect_count: redirect_counter.load(Ordering::Relaxed),
            content_type,
            byte_len: bytes.len() as u64,
            encoding_label: decoded.encoding_label,
        };
        distill_logging::distill_debug!(
            "fetched {} ({} bytes, {} redirects)",
            metadata.final_url,
            metadata.byte_len,
            metadata.redirect_count
        );

        Ok(FetchOutput {
            body: decoded.text,
            metadata,
        })
    }

    async fn final_url(&self, url: &str, method: ProbeMethod) -> Result<String, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let client = self.build_client(Arc::new(AtomicUsize::new(0)))?;
        let request = match method {
            ProbeMethod::Head => client.head(parsed),
            ProbeMethod::Get => client.get(parsed),
        };
        let response = request
            .header(USER_AGENT, self.settings.user_agent.as_str())
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Ok(response.url().to_string())
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_url_appends_target_once() {
        let settings = FetchSettings::default();
        assert_eq!(
            settings.reader_url("https://x.com/a/status/1"),
            "https://r.jina.ai/https://x.com/a/status/1"
        );
        let custom = FetchSettings {
            reader_base: "http://127.0.0.1:9000".to_string(),
            ..FetchSettings::default()
        };
        assert_eq!(custom.reader_url("https://x.com/a"), "http://127.0.0.1:9000/https://x.com/a");
    }
}
