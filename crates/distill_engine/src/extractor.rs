use distill_core::{
    clean_markdown, first_followable_link, first_heading, first_non_empty_line, parse_web_url,
    rewrite_github_blob, UrlClassifier, UrlKind,
};
use distill_logging::{distill_debug, distill_info, distill_warn};
use percent_encoding::percent_decode_str;
use url::Url;

use crate::convert::{html_to_text, Converter, Html2MdConverter};
use crate::extract::{ContainerExtractor, Extractor};
use crate::fetch::{reader_url, FetchProfile, FetchSettings, Fetcher, ProbeMethod, ReqwestFetcher};
use crate::{ExtractedContent, FetchError};

/// Title used for reader-proxied posts that expose neither a heading nor text.
pub const DEFAULT_POST_TITLE: &str = "Tweet";

/// Turns a URL into [`ExtractedContent`], choosing the strategy from the URL's
/// classification. Holds no per-call state, so one instance can serve
/// concurrent requests.
pub struct ContentExtractor<F = ReqwestFetcher> {
    fetcher: F,
    classifier: UrlClassifier,
    reader_base: String,
    extractor: Box<dyn Extractor>,
    converter: Box<dyn Converter>,
}

impl ContentExtractor<ReqwestFetcher> {
    pub fn new(settings: FetchSettings) -> Self {
        let reader_base = settings.reader_base.clone();
        Self::with_fetcher(ReqwestFetcher::new(settings), reader_base)
    }
}

impl<F: Fetcher> ContentExtractor<F> {
    pub fn with_fetcher(fetcher: F, reader_base: impl Into<String>) -> Self {
        Self {
            fetcher,
            classifier: UrlClassifier::default(),
            reader_base: reader_base.into(),
            extractor: Box::new(ContainerExtractor),
            converter: Box::new(Html2MdConverter),
        }
    }

    pub fn with_classifier(mut self, classifier: UrlClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn classifier(&self) -> &UrlClassifier {
        &self.classifier
    }

    /// Extracts `url`. With `follow_links`, a reader-proxied post that embeds
    /// an article link gets that article appended; the linked extraction
    /// itself never follows further, and its failure is logged and dropped.
    pub async fn extract_from_url(
        &self,
        url: &str,
        follow_links: bool,
    ) -> Result<ExtractedContent, FetchError> {
        let (kind, primary) = self.extract_once(url).await?;
        if !follow_links || kind != UrlKind::JsHeavy {
            return Ok(primary);
        }
        let Some(link) = first_followable_link(&primary.content, &self.classifier) else {
            distill_debug!("no followable link in {}", primary.url);
            return Ok(primary);
        };

        distill_info!("following linked article {link}");
        match self.extract_once(&link).await {
            Ok((_, linked)) => Ok(combine_with_linked(primary, linked)),
            Err(err) => {
                distill_warn!("linked article {link} skipped: {err}");
                Ok(primary)
            }
        }
    }

    async fn extract_once(&self, url: &str) -> Result<(UrlKind, ExtractedContent), FetchError> {
        let mut target = parse_web_url(url)?;
        let mut kind = self.classifier.classify_parsed(&target);

        if kind == UrlKind::Shortener {
            let resolved = self.resolve_shortener(target.as_str()).await;
            if let Ok(resolved) = parse_web_url(&resolved) {
                target = resolved;
            }
            kind = match self.classifier.classify_parsed(&target) {
                UrlKind::Shortener => UrlKind::Generic,
                other => other,
            };
        }

        if kind == UrlKind::GitHubBlob {
            target = rewrite_github_blob(&target);
            kind = self.classifier.classify_parsed(&target);
        }

        distill_debug!("extracting {target} as {kind:?}");
        let content = match kind {
            UrlKind::RawText => self.extract_raw(&target).await?,
            UrlKind::JsHeavy => self.extract_via_reader(&target).await?,
            UrlKind::Generic | UrlKind::Shortener | UrlKind::GitHubBlob => {
                self.extract_html(&target).await?
            }
        };
        Ok((kind, content))
    }

    /// HEAD, then one GET retry, then the original URL. Never fails.
    async fn resolve_shortener(&self, url: &str) -> String {
        match self.fetcher.final_url(url, ProbeMethod::Head).await {
            Ok(resolved) => return resolved,
            Err(err) => distill_warn!("HEAD {url} failed ({err}); retrying with GET"),
        }
        match self.fetcher.final_url(url, ProbeMethod::Get).await {
            Ok(resolved) => resolved,
            Err(err) => {
                distill_warn!("could not resolve {url} ({err}); using it unresolved");
                url.to_string()
            }
        }
    }

    async fn extract_raw(&self, target: &Url) -> Result<ExtractedContent, FetchError> {
        let output = self.fetcher.fetch(target.as_str(), FetchProfile::PlainText).await?;
        let body = output.body.trim();
        let title = first_heading(body)
            .or_else(|| last_path_segment(target))
            .unwrap_or_else(|| target.as_str().to_string());
        Ok(ExtractedContent::new(title, body, target.as_str()))
    }

    async fn extract_via_reader(&self, target: &Url) -> Result<ExtractedContent, FetchError> {
        let proxied = reader_url(&self.reader_base, target.as_str());
        let output = self.fetcher.fetch(&proxied, FetchProfile::Reader).await?;
        let content = clean_markdown(&output.body);
        let title = first_heading(&content)
            .or_else(|| first_non_empty_line(&content))
            .unwrap_or_else(|| DEFAULT_POST_TITLE.to_string());
        Ok(ExtractedContent::new(title, content, target.as_str()))
    }

    async fn extract_html(&self, target: &Url) -> Result<ExtractedContent, FetchError> {
        let output = self.fetcher.fetch(target.as_str(), FetchProfile::Html).await?;
        let extracted = self.extractor.extract(&output.body);
        let plain = html_to_text(&extracted.content_html, self.converter.as_ref());
        Ok(ExtractedContent {
            title: extracted.title,
            content: plain.text,
            url: target.as_str().to_string(),
            word_count: plain.word_count,
        })
    }
}

fn last_path_segment(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
}

fn combine_with_linked(post: ExtractedContent, linked: ExtractedContent) -> ExtractedContent {
    let content = format!(
        "{}\n\n---\n\n## Linked Article: {}\n\n{}",
        post.content, linked.title, linked.content
    );
    ExtractedContent {
        title: post.title,
        content,
        url: post.url,
        word_count: post.word_count + linked.word_count,
    }
}
