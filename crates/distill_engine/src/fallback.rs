use std::sync::atomic::{AtomicBool, Ordering};

use distill_logging::{distill_info, distill_warn};

use crate::complete::{CallOptions, ChunkSink, CompletionBackend};
use crate::{CompletionError, CompletionResult};

/// Forwards chunks and remembers whether any reached the caller's sink.
struct TrackingSink<'a> {
    inner: &'a dyn ChunkSink,
    emitted: AtomicBool,
}

impl ChunkSink for TrackingSink<'_> {
    fn emit(&self, chunk: &str) {
        self.emitted.store(true, Ordering::Relaxed);
        self.inner.emit(chunk);
    }
}

/// Tries ranked models one after another, moving on only when a model is rate
/// limited.
#[derive(Debug, Clone)]
pub struct FallbackCompletionClient<B> {
    backend: B,
}

impl<B: CompletionBackend> FallbackCompletionClient<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn complete_with_fallback(
        &self,
        prompt: &str,
        ranked_models: &[String],
        options: &CallOptions<'_>,
    ) -> Result<CompletionResult, CompletionError> {
        if ranked_models.is_empty() {
            return Err(CompletionError::NoRankedModels);
        }

        let mut last_error = String::new();
        for (index, model) in ranked_models.iter().enumerate() {
            if options.is_cancelled() {
                distill_info!("fallback cancelled before trying {model}");
                return Ok(CompletionResult::cancelled(String::new(), model.as_str()));
            }
            let tracking = options.sink.map(|inner| TrackingSink {
                inner,
                emitted: AtomicBool::new(false),
            });
            let attempt = CallOptions {
                sink: tracking.as_ref().map(|sink| sink as &dyn ChunkSink),
                cancel: options.cancel.clone(),
            };
            match self.backend.complete(model, prompt, &attempt).await {
                Ok(result) => {
                    if index > 0 {
                        distill_info!("model {model} answered after {index} rate-limited attempt(s)");
                    }
                    return Ok(result);
                }
                // Part of this answer already reached the sink, so no other model may follow it.
                Err(err) if err.is_rate_limited() && emitted(tracking.as_ref()) => {
                    distill_warn!("model {model} failed after streaming began: {err}");
                    return Err(CompletionError::StreamInterrupted {
                        model: model.clone(),
                        message: err.to_string(),
                    });
                }
                Err(err) if err.is_rate_limited() => {
                    distill_info!(
                        "model {model} rate limited ({}/{}): {err}",
                        index + 1,
                        ranked_models.len()
                    );
                    last_error = err.to_string();
                }
                Err(err) => return Err(err),
            }
        }

        distill_warn!("all {} ranked models are rate limited", ranked_models.len());
        Err(CompletionError::AllModelsRateLimited { last_error })
    }
}

fn emitted(tracking: Option<&TrackingSink<'_>>) -> bool {
    tracking.is_some_and(|sink| sink.emitted.load(Ordering::Relaxed))
}
