use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use distill_core::{parse_web_url, OutputLanguage, SummaryLength};
use distill_engine::{
    CallOptions, CancellationToken, CompletionError, CompletionResult, ContentExtractor,
    OpenRouterClient, SummarizeOptions, Summarizer,
};
use distill_logging::{distill_info, distill_warn};

use crate::cancel::CancelListener;
use crate::config::{Settings, API_KEY_ENV};
use crate::document::Document;
use crate::sinks::{DocumentInsertSink, StdoutSink};

#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// Page to extract.
    pub url: String,
    /// Do not append the article a post links to.
    #[arg(long)]
    pub no_follow_links: bool,
}

#[derive(Debug, Args)]
pub struct SummarizeArgs {
    /// URL to fetch, literal text, or `-` to read text from stdin.
    pub input: String,
    /// brief, short, medium or long.
    #[arg(long)]
    pub length: Option<SummaryLength>,
    /// Output language name, or `auto` to match the source.
    #[arg(long)]
    pub language: Option<String>,
    /// Model id, or `auto-free` to walk the ranked free models.
    #[arg(long)]
    pub model: Option<String>,
    /// Prompt template file using {{content}}, {{wordCount}} and {{language}}.
    #[arg(long)]
    pub prompt_file: Option<PathBuf>,
    /// Print the summary once it is complete instead of streaming it.
    #[arg(long)]
    pub no_stream: bool,
    /// Do not append the article a post links to.
    #[arg(long)]
    pub no_follow_links: bool,
    /// Insert the summary into this text file instead of printing it.
    #[arg(long, requires = "line")]
    pub insert_into: Option<PathBuf>,
    /// One-based line the summary goes below.
    #[arg(long, requires = "insert_into")]
    pub line: Option<usize>,
}

pub async fn extract(settings: &Settings, args: ExtractArgs) -> Result<()> {
    let extractor = ContentExtractor::new(settings.fetch_settings());
    let content = extractor
        .extract_from_url(&args.url, !args.no_follow_links)
        .await
        .with_context(|| format!("failed to extract {}", args.url))?;

    println!("# {}", content.title);
    println!("URL: {}", content.url);
    println!("Words: {}", content.word_count);
    println!();
    println!("{}", content.content);
    Ok(())
}

pub fn models(settings: &Settings) -> Result<()> {
    let ranked = settings.ranked_models();
    if ranked.is_empty() {
        bail!("no free models configured; add some to free_models");
    }
    for (rank, model) in ranked.as_slice().iter().enumerate() {
        println!("{:>2}. {}", rank + 1, model);
    }
    Ok(())
}

pub async fn summarize(settings: &Settings, args: SummarizeArgs) -> Result<()> {
    let api_key = settings
        .api_key()
        .ok_or(CompletionError::MissingApiKey)
        .with_context(|| format!("set {API_KEY_ENV} or api_key in the config file"))?;
    let client = OpenRouterClient::new(api_key, settings.completion_settings())?;
    let summarizer = Summarizer::new(client, settings.summary_defaults());

    let options = SummarizeOptions {
        length: args.length,
        language: args.language.as_deref().map(parse_language),
        model: args.model.clone(),
        prompt: args.prompt_file.as_deref().map(read_prompt).transpose()?,
    };
    let content = acquire(settings, &args).await?;
    let cancel = CancellationToken::new();

    let result = match (&args.insert_into, args.line) {
        (Some(path), Some(line)) => {
            insert_into_file(&summarizer, &content, &options, path, line, settings, cancel).await?
        }
        _ if args.no_stream => {
            let _listener = CancelListener::spawn(cancel.clone());
            let call = CallOptions::new().with_cancel(cancel);
            let result = summarizer.summarize_text(&content, &options, &call).await?;
            println!("{}", result.content);
            result
        }
        _ => {
            let _listener = CancelListener::spawn(cancel.clone());
            let sink = StdoutSink;
            let call = CallOptions::new().with_sink(&sink).with_cancel(cancel);
            let result = summarizer.summarize_text(&content, &options, &call).await?;
            println!();
            result
        }
    };

    if result.cancelled {
        eprintln!("Cancelled; the partial summary was kept.");
    }
    distill_info!("Summary by {} ({} chars)", result.model, result.content.len());
    Ok(())
}

async fn insert_into_file(
    summarizer: &Summarizer<OpenRouterClient>,
    content: &str,
    options: &SummarizeOptions,
    path: &Path,
    line: usize,
    settings: &Settings,
    cancel: CancellationToken,
) -> Result<CompletionResult> {
    let Some(cursor_line) = line.checked_sub(1) else {
        bail!("--line is one-based");
    };
    let document = Document::load(path).with_context(|| format!("failed to read {}", path.display()))?;
    let original = document.to_text();
    let sink = DocumentInsertSink::begin(document, cursor_line, &settings.indent_unit, cancel.clone())?;

    let call = CallOptions::new().with_sink(&sink).with_cancel(cancel);
    let outcome = summarizer.summarize_text(content, options, &call).await;
    let (document, phase) = sink.finish(&outcome);
    distill_info!("Insert into {} ended {:?}", path.display(), phase);
    if document.to_text() != original {
        document
            .save(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(outcome?)
}

async fn acquire(settings: &Settings, args: &SummarizeArgs) -> Result<String> {
    if args.input == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text).context("failed to read stdin")?;
        return non_empty(text);
    }
    if parse_web_url(&args.input).is_err() {
        return non_empty(args.input.clone());
    }

    let extractor = ContentExtractor::new(settings.fetch_settings());
    let extracted = extractor
        .extract_from_url(&args.input, !args.no_follow_links)
        .await
        .with_context(|| format!("failed to extract {}", args.input))?;
    distill_info!(
        "Extracted \"{}\" from {} ({} words)",
        extracted.title,
        extracted.url,
        extracted.word_count
    );
    if extracted.word_count == 0 {
        distill_warn!("No text found at {}", extracted.url);
    }
    non_empty(extracted.content)
}

fn non_empty(text: String) -> Result<String> {
    if text.trim().is_empty() {
        bail!("nothing to summarize");
    }
    Ok(text)
}

fn parse_language(value: &str) -> OutputLanguage {
    value.parse().unwrap_or_default()
}

fn read_prompt(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read prompt file {}", path.display()))
}
