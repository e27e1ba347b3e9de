use url::Url;

/// Hosts whose only job is to redirect somewhere else.
pub const SHORTENER_HOSTS: &[&str] = &["t.co", "bit.ly", "tinyurl.com", "goo.gl", "ow.ly", "is.gd"];

/// Hosts that render client-side and need the reader proxy.
/// Subdomains of these count as well.
pub const JS_HEAVY_HOSTS: &[&str] = &["twitter.com", "x.com", "mobile.twitter.com", "mobile.x.com"];

const GITHUB_HOST: &str = "github.com";
const RAW_GITHUB_HOST: &str = "raw.githubusercontent.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    Shortener,
    GitHubBlob,
    RawText,
    JsHeavy,
    Generic,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid url {url:?}: {reason}")]
pub struct ClassifyError {
    pub url: String,
    pub reason: String,
}

/// Decides which extraction path applies to a URL. Holds no state beyond the
/// host lists, so one instance can be shared freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlClassifier {
    shortener_hosts: Vec<String>,
    js_heavy_hosts: Vec<String>,
}

impl Default for UrlClassifier {
    fn default() -> Self {
        Self::with_hosts(SHORTENER_HOSTS, JS_HEAVY_HOSTS)
    }
}

impl UrlClassifier {
    pub fn with_hosts(shorteners: &[&str], js_heavy: &[&str]) -> Self {
        Self {
            shortener_hosts: shorteners.iter().map(|h| h.to_ascii_lowercase()).collect(),
            js_heavy_hosts: js_heavy.iter().map(|h| h.to_ascii_lowercase()).collect(),
        }
    }

    pub fn classify(&self, url: &str) -> Result<UrlKind, ClassifyError> {
        let parsed = parse_web_url(url)?;
        Ok(self.classify_parsed(&parsed))
    }

    pub fn classify_parsed(&self, url: &Url) -> UrlKind {
        let host = match url.host_str() {
            Some(host) => host.to_ascii_lowercase(),
            None => return UrlKind::Generic,
        };

        if self.shortener_hosts.iter().any(|h| *h == host) {
            return UrlKind::Shortener;
        }
        if host == GITHUB_HOST && url.path().contains("/blob/") {
            return UrlKind::GitHubBlob;
        }
        if host == RAW_GITHUB_HOST {
            return UrlKind::RawText;
        }
        if self.is_js_heavy_host(&host) {
            return UrlKind::JsHeavy;
        }
        UrlKind::Generic
    }

    /// True for the JS-heavy hosts and any of their subdomains.
    pub fn is_js_heavy_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.js_heavy_hosts
            .iter()
            .any(|base| host == *base || host.ends_with(&format!(".{base}")))
    }
}

/// Parses an absolute http(s) URL.
pub fn parse_web_url(url: &str) -> Result<Url, ClassifyError> {
    let parsed = Url::parse(url.trim()).map_err(|err| ClassifyError {
        url: url.to_string(),
        reason: err.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ClassifyError {
                url: url.to_string(),
                reason: format!("unsupported scheme {other}"),
            })
        }
    }
    if parsed.host_str().is_none() {
        return Err(ClassifyError {
            url: url.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(parsed)
}

/// Rewrites `github.com/<owner>/<repo>/blob/<ref>/<path>` to its
/// `raw.githubusercontent.com` equivalent. Any other URL is returned as is.
pub fn rewrite_github_blob(url: &Url) -> Url {
    let is_blob = url
        .host_str()
        .is_some_and(|host| host.eq_ignore_ascii_case(GITHUB_HOST))
        && url.path().contains("/blob/");
    if !is_blob {
        return url.clone();
    }

    let mut raw = url.clone();
    let path = url.path().replacen("/blob/", "/", 1);
    raw.set_path(&path);
    if raw.set_host(Some(RAW_GITHUB_HOST)).is_err() {
        return url.clone();
    }
    raw
}
