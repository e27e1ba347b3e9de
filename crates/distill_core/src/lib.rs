//! Distill core: URL classification, prompt building, text helpers and the
//! streaming-insert state machine. Nothing in this crate performs I/O.
mod classify;
mod length;
mod links;
mod prompt;
mod rank;
mod text;

pub mod insert;

pub use classify::{
    parse_web_url, rewrite_github_blob, ClassifyError, UrlClassifier, UrlKind, JS_HEAVY_HOSTS,
    SHORTENER_HOSTS,
};
pub use length::SummaryLength;
pub use links::first_followable_link;
pub use prompt::{
    build_prompt, resolve_template, OutputLanguage, CONTENT_PLACEHOLDER, DEFAULT_PROMPT_TEMPLATE,
    LANGUAGE_PLACEHOLDER, WORD_COUNT_PLACEHOLDER,
};
pub use rank::{is_auto_free, ModelRank, AUTO_FREE_MODEL};
pub use text::{clean_markdown, count_words, first_heading, first_non_empty_line};
