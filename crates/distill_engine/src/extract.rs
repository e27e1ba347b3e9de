use ego_tree::{NodeId, NodeRef};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

/// Containers tried in order; the first one holding enough text wins.
pub const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "[role=\"main\"]",
    "main",
    ".post-content",
    ".article-content",
    ".entry-content",
    ".content",
    "#content",
    ".post",
    ".article",
];

/// A container must hold more than this many words to be chosen.
pub const MIN_CONTAINER_WORDS: usize = 100;

pub const UNTITLED: &str = "Untitled";

const CHROME_SELECTOR: &str = "nav, header, footer, aside, script, style, noscript, \
     .sidebar, #sidebar, .menu, #menu, .nav, .navigation, \
     .comments, #comments, .comment, .share, .sharing, .social, .social-share";

const NON_PROSE: &[&str] = &["script", "style", "noscript", "template"];

static OG_TITLE: Lazy<Selector> = Lazy::new(|| parse_selector("meta[property=\"og:title\"]"));
static TITLE: Lazy<Selector> = Lazy::new(|| parse_selector("title"));
static H1: Lazy<Selector> = Lazy::new(|| parse_selector("h1"));
static BODY: Lazy<Selector> = Lazy::new(|| parse_selector("body"));
static CHROME: Lazy<Selector> = Lazy::new(|| parse_selector(CHROME_SELECTOR));
static CONTAINERS: Lazy<Vec<Selector>> =
    Lazy::new(|| CONTENT_SELECTORS.iter().map(|s| parse_selector(s)).collect());

fn parse_selector(selector: &str) -> Selector {
    Selector::parse(selector).expect("valid static selector")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedHtml {
    pub title: String,
    pub content_html: String,
}

pub trait Extractor: Send + Sync {
    fn extract(&self, html: &str) -> ExtractedHtml;
}

/// Heuristic container selection:
/// - title from `og:title`, then `<title>`, then the first `<h1>`
/// - the first listed container with more than [`MIN_CONTAINER_WORDS`] words
/// - otherwise `<body>` without navigation, sidebars, comments and share widgets.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContainerExtractor;

impl Extractor for ContainerExtractor {
    fn extract(&self, html: &str) -> ExtractedHtml {
        let doc = Html::parse_document(html);
        ExtractedHtml {
            title: extract_title(&doc),
            content_html: select_content_html(&doc),
        }
    }
}

pub fn extract_title(doc: &Html) -> String {
    let og = doc
        .select(&OG_TITLE)
        .filter_map(|meta| meta.value().attr("content"))
        .map(|content| content.trim().to_string())
        .find(|content| !content.is_empty());
    og.or_else(|| first_text(doc, &TITLE))
        .or_else(|| first_text(doc, &H1))
        .unwrap_or_else(|| UNTITLED.to_string())
}

fn first_text(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|text| !text.is_empty())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn select_content_html(doc: &Html) -> String {
    for (selector, name) in CONTAINERS.iter().zip(CONTENT_SELECTORS) {
        if let Some(container) = doc.select(selector).next() {
            let words = element_word_count(container);
            if words > MIN_CONTAINER_WORDS {
                distill_logging::distill_debug!("content container {name} ({words} words)");
                return container.inner_html();
            }
        }
    }
    distill_logging::distill_debug!("no content container qualified; using stripped body");
    match doc.select(&BODY).next() {
        Some(body) => stripped_inner_html(doc, body),
        None => stripped_inner_html(doc, doc.root_element()),
    }
}

/// Words across the element's joined text, leaving out script and style bodies.
fn element_word_count(element: ElementRef<'_>) -> usize {
    let mut text = String::new();
    for node in element.descendants() {
        if let Node::Text(chunk) = node.value() {
            if !inside_non_prose(node) {
                text.push_str(chunk);
            }
        }
    }
    distill_core::count_words(&text)
}

fn inside_non_prose(node: NodeRef<'_, Node>) -> bool {
    node.ancestors()
        .filter_map(|ancestor| ancestor.value().as_element())
        .any(|el| NON_PROSE.contains(&el.name()))
}

/// Serializes `element`'s children from a copy of the tree with every chrome
/// subtree detached.
fn stripped_inner_html(doc: &Html, element: ElementRef<'_>) -> String {
    let chrome: Vec<NodeId> = element.select(&CHROME).map(|el| el.id()).collect();
    if chrome.is_empty() {
        return element.inner_html();
    }
    let mut stripped = doc.clone();
    for id in chrome {
        if let Some(mut node) = stripped.tree.get_mut(id) {
            node.detach();
        }
    }
    stripped
        .tree
        .get(element.id())
        .and_then(ElementRef::wrap)
        .map(|el| el.inner_html())
        .unwrap_or_default()
}
