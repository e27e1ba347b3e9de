//! Picks the article a short post points at.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::classify::UrlClassifier;

static EMBEDDED_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<>()\[\]"'`]+"#).expect("valid url regex"));

/// Media, video, PDF and YouTube targets are never worth following.
static EXCLUDED_TARGET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\.(jpe?g|png|gif|webp|svg|bmp|mp4|mov|webm|m4v|m3u8|mp3|pdf)([?#]|$)|youtube\.com|youtu\.be|twimg\.com|/video/|/photo/|/media/)",
    )
    .expect("valid exclusion regex")
});

/// Punctuation that ends a sentence rather than the URL.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '*', '_'];

/// First embedded http(s) URL that is neither on a JS-heavy host (the post's
/// own site) nor a media/video/PDF/YouTube target.
pub fn first_followable_link(text: &str, classifier: &UrlClassifier) -> Option<String> {
    EMBEDDED_URL
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(TRAILING_PUNCTUATION))
        .find(|candidate| is_followable(candidate, classifier))
        .map(ToOwned::to_owned)
}

fn is_followable(candidate: &str, classifier: &UrlClassifier) -> bool {
    let Ok(url) = Url::parse(candidate) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    !classifier.is_js_heavy_host(host) && !EXCLUDED_TARGET.is_match(candidate)
}
