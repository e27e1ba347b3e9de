use distill_core::{
    build_prompt, is_auto_free, resolve_template, ModelRank, OutputLanguage, SummaryLength,
    AUTO_FREE_MODEL,
};
use distill_logging::distill_debug;

use crate::complete::{CallOptions, CompletionBackend};
use crate::fallback::FallbackCompletionClient;
use crate::{CompletionError, CompletionResult};

/// Configured values that per-call options fall back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryDefaults {
    pub model: String,
    pub length: SummaryLength,
    pub language: OutputLanguage,
    pub custom_prompt: Option<String>,
    pub ranked_models: ModelRank,
}

impl Default for SummaryDefaults {
    fn default() -> Self {
        Self {
            model: AUTO_FREE_MODEL.to_string(),
            length: SummaryLength::default(),
            language: OutputLanguage::default(),
            custom_prompt: None,
            ranked_models: ModelRank::default(),
        }
    }
}

/// Per-call overrides. Unset fields use [`SummaryDefaults`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummarizeOptions {
    pub length: Option<SummaryLength>,
    pub language: Option<OutputLanguage>,
    pub model: Option<String>,
    pub prompt: Option<String>,
}

pub struct Summarizer<B> {
    client: FallbackCompletionClient<B>,
    defaults: SummaryDefaults,
}

impl<B: CompletionBackend> Summarizer<B> {
    pub fn new(backend: B, defaults: SummaryDefaults) -> Self {
        Self {
            client: FallbackCompletionClient::new(backend),
            defaults,
        }
    }

    pub fn backend(&self) -> &B {
        self.client.backend()
    }

    pub fn defaults(&self) -> &SummaryDefaults {
        &self.defaults
    }

    pub fn prompt_for(&self, content: &str, options: &SummarizeOptions) -> String {
        let length = options.length.unwrap_or(self.defaults.length);
        let language = options.language.as_ref().unwrap_or(&self.defaults.language);
        let template = resolve_template(options.prompt.as_deref(), self.defaults.custom_prompt.as_deref());
        build_prompt(content, length, language, Some(template))
    }

    pub fn model_for<'a>(&'a self, options: &'a SummarizeOptions) -> &'a str {
        options
            .model
            .as_deref()
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .unwrap_or_else(|| self.defaults.model.trim())
    }

    /// Summarizes already-extracted text. `auto-free` walks the ranked model
    /// list; any other model id is called directly with no fallback.
    pub async fn summarize_text(
        &self,
        content: &str,
        options: &SummarizeOptions,
        call: &CallOptions<'_>,
    ) -> Result<CompletionResult, CompletionError> {
        let prompt = self.prompt_for(content, options);
        let model = self.model_for(options);
        if is_auto_free(model) {
            distill_debug!(
                "summarizing with automatic fallback over {} models",
                self.defaults.ranked_models.len()
            );
            self.client
                .complete_with_fallback(&prompt, self.defaults.ranked_models.as_slice(), call)
                .await
        } else {
            distill_debug!("summarizing with fixed model {model}");
            self.client.backend().complete(model, &prompt, call).await
        }
    }
}
