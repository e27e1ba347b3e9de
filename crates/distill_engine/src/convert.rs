use distill_core::{clean_markdown, count_words};

pub trait Converter: Send + Sync {
    fn to_markdown(&self, html: &str) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Html2MdConverter;

impl Converter for Html2MdConverter {
    fn to_markdown(&self, html: &str) -> String {
        html2md::parse_html(html)
    }
}

/// Cleaned Markdown-like text and its word count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainText {
    pub text: String,
    pub word_count: usize,
}

/// HTML fragment to cleaned text. Pure; no I/O.
pub fn html_to_text(html: &str, converter: &dyn Converter) -> PlainText {
    let text = clean_markdown(&converter.to_markdown(html));
    let word_count = count_words(&text);
    PlainText { text, word_count }
}
