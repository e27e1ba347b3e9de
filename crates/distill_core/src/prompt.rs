//! Prompt construction. Everything here is a pure function of its inputs.

use std::fmt;
use std::str::FromStr;

use crate::length::SummaryLength;

pub const CONTENT_PLACEHOLDER: &str = "{{content}}";
pub const WORD_COUNT_PLACEHOLDER: &str = "{{wordCount}}";
pub const LANGUAGE_PLACEHOLDER: &str = "{{language}}";

pub const DEFAULT_PROMPT_TEMPLATE: &str = "Summarize the following content in approximately {{wordCount}} words.

Lead with the key points and the most important information.
Do not add meta-commentary such as \"This article discusses\" or \"Here is a summary\".
Start directly with the summary.
{{language}}

Content:
{{content}}";

const AUTO_LANGUAGE_INSTRUCTION: &str =
    "Write the summary in the same language as the original content.";

/// Language the summary should be written in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum OutputLanguage {
    /// Follow the language of the source content.
    #[default]
    Auto,
    Named(String),
}

impl OutputLanguage {
    pub fn instruction(&self) -> String {
        match self {
            OutputLanguage::Auto => AUTO_LANGUAGE_INSTRUCTION.to_string(),
            OutputLanguage::Named(name) => format!("Write the summary in {name}."),
        }
    }
}

impl FromStr for OutputLanguage {
    type Err = std::convert::Infallible;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
            Ok(OutputLanguage::Auto)
        } else {
            Ok(OutputLanguage::Named(trimmed.to_string()))
        }
    }
}

impl fmt::Display for OutputLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputLanguage::Auto => write!(f, "auto"),
            OutputLanguage::Named(name) => write!(f, "{name}"),
        }
    }
}

/// Picks the template to render: an explicit per-call template wins over the
/// stored custom one, which wins over [`DEFAULT_PROMPT_TEMPLATE`]. Blank
/// templates are treated as absent.
pub fn resolve_template<'a>(explicit: Option<&'a str>, custom: Option<&'a str>) -> &'a str {
    explicit
        .filter(|t| !t.trim().is_empty())
        .or_else(|| custom.filter(|t| !t.trim().is_empty()))
        .unwrap_or(DEFAULT_PROMPT_TEMPLATE)
}

/// Renders the final prompt.
///
/// With no template the built-in one is used. A template that never mentions
/// `{{content}}` gets the content appended after a blank line.
pub fn build_prompt(
    content: &str,
    length: SummaryLength,
    language: &OutputLanguage,
    template: Option<&str>,
) -> String {
    let template = resolve_template(template, None);
    let rendered = template
        .replace(WORD_COUNT_PLACEHOLDER, &length.target_words().to_string())
        .replace(LANGUAGE_PLACEHOLDER, &language.instruction());

    // Content goes in last so placeholder-looking text inside it stays untouched.
    if rendered.contains(CONTENT_PLACEHOLDER) {
        rendered.replace(CONTENT_PLACEHOLDER, content)
    } else {
        format!("{}\n\n{}", rendered.trim_end(), content)
    }
}
