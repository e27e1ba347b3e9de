use once_cell::sync::Lazy;
use regex::Regex;

static BLANK_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t\x{a0}]+$").expect("valid blank-line regex"));
static NEWLINE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid newline regex"));
static ATX_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#[ \t]+(.+?)[ \t#]*$").expect("valid heading regex"));

/// Whitespace-delimited, non-empty tokens.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Normalizes converted Markdown: whitespace-only lines become empty, runs of
/// three or more newlines collapse to a single blank line, and the result is
/// trimmed.
pub fn clean_markdown(markdown: &str) -> String {
    let normalized = markdown.replace("\r\n", "\n");
    let without_blank = BLANK_LINE.replace_all(&normalized, "");
    let collapsed = NEWLINE_RUN.replace_all(&without_blank, "\n\n");
    collapsed.trim().to_string()
}

/// Text of the first level-one ATX heading (`# Title`).
pub fn first_heading(markdown: &str) -> Option<String> {
    ATX_HEADING
        .captures(markdown)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|heading| !heading.is_empty())
}

pub fn first_non_empty_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(ToOwned::to_owned)
}
