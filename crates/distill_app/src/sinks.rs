use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

use distill_core::insert::{update, InsertEffect, InsertMsg, InsertPhase, InsertState};
use distill_engine::{CancellationToken, ChunkSink, CompletionError, CompletionResult};
use distill_logging::{distill_error, distill_warn};

use crate::cancel::CancelListener;
use crate::document::{Document, DocumentError};

/// Writes chunks straight to stdout as they arrive.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl ChunkSink for StdoutSink {
    fn emit(&self, chunk: &str) {
        let mut out = io::stdout().lock();
        if let Err(err) = out.write_all(chunk.as_bytes()).and_then(|()| out.flush()) {
            distill_warn!("Failed to write summary chunk: {}", err);
        }
    }
}

struct InsertHost {
    state: InsertState,
    document: Document,
    listener: Option<CancelListener>,
}

/// Streams chunks into a [`Document`] below the cursor line, driving the
/// insert state machine and executing its effects.
pub struct DocumentInsertSink {
    host: Mutex<InsertHost>,
    cancel: CancellationToken,
}

impl DocumentInsertSink {
    /// Enters the streaming phase at zero-based `cursor_line`.
    pub fn begin(
        document: Document,
        cursor_line: usize,
        indent_unit: &str,
        cancel: CancellationToken,
    ) -> Result<Self, DocumentError> {
        let line_text = document.line(cursor_line)?.to_string();
        let sink = Self {
            host: Mutex::new(InsertHost {
                state: InsertState::new(),
                document,
                listener: None,
            }),
            cancel,
        };
        sink.dispatch(InsertMsg::Begin {
            cursor_line,
            line_text,
            indent_unit: indent_unit.to_string(),
        });
        Ok(sink)
    }

    /// Moves to the terminal state matching `outcome` and hands back the
    /// document with whatever was inserted.
    pub fn finish(self, outcome: &Result<CompletionResult, CompletionError>) -> (Document, InsertPhase) {
        let msg = match outcome {
            Ok(result) if result.cancelled => InsertMsg::CancelRequested,
            Ok(_) => InsertMsg::Finished,
            Err(err) => InsertMsg::Failed(err.to_string()),
        };
        self.dispatch(msg);
        let host = self.host.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
        (host.document, host.state.phase())
    }

    fn lock(&self) -> MutexGuard<'_, InsertHost> {
        self.host.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn dispatch(&self, msg: InsertMsg) {
        let mut host = self.lock();
        let state = std::mem::take(&mut host.state);
        let (state, effects) = update(state, msg);
        host.state = state;
        for effect in effects {
            match effect {
                InsertEffect::RegisterCancelListener => {
                    host.listener = Some(CancelListener::spawn(self.cancel.clone()));
                }
                InsertEffect::Write { at, text } => {
                    if let Err(err) = host.document.insert(at, &text) {
                        distill_error!("Dropped insert at {:?}: {}", at, err);
                    }
                }
                InsertEffect::RemoveCancelListener => {
                    host.listener = None;
                }
            }
        }
    }
}

impl ChunkSink for DocumentInsertSink {
    fn emit(&self, chunk: &str) {
        self.dispatch(InsertMsg::Chunk(chunk.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn finished(content: &str) -> Result<CompletionResult, CompletionError> {
        Ok(CompletionResult {
            content: content.to_string(),
            model: "m".to_string(),
            cancelled: false,
        })
    }

    #[tokio::test]
    async fn streams_below_list_item_with_extra_indent() {
        let doc = Document::from_text("# Notes\n- item\nafter");
        let sink = DocumentInsertSink::begin(doc, 1, "  ", CancellationToken::new()).unwrap();
        sink.emit("First line.\nSecond");
        sink.emit(" line.");

        let (doc, phase) = sink.finish(&finished("First line.\nSecond line."));
        assert_eq!(phase, InsertPhase::Completed);
        assert_eq!(doc.to_text(), "# Notes\n- item\n  First line.\n  Second line.\nafter");
    }

    #[tokio::test]
    async fn blank_line_is_filled_in_place() {
        let doc = Document::from_text("para\n\nnext");
        let sink = DocumentInsertSink::begin(doc, 1, "\t", CancellationToken::new()).unwrap();
        sink.emit("Summary.");
        let (doc, _) = sink.finish(&finished("Summary."));
        assert_eq!(doc.to_text(), "para\nSummary.\nnext");
    }

    #[tokio::test]
    async fn cancellation_keeps_partial_text_and_ignores_late_chunks() {
        let doc = Document::from_text("Intro");
        let token = CancellationToken::new();
        let sink = DocumentInsertSink::begin(doc, 0, "\t", token.clone()).unwrap();
        sink.emit("partial");
        token.cancel();

        let cancelled = Ok(CompletionResult {
            content: "partial".to_string(),
            model: "m".to_string(),
            cancelled: true,
        });
        let (doc, phase) = sink.finish(&cancelled);
        assert_eq!(phase, InsertPhase::Cancelled);
        assert_eq!(doc.to_text(), "Intro\npartial");
    }

    #[tokio::test]
    async fn failure_leaves_inserted_prefix() {
        let doc = Document::from_text("x");
        let sink = DocumentInsertSink::begin(doc, 0, "\t", CancellationToken::new()).unwrap();
        sink.emit("half");
        let (doc, phase) = sink.finish(&Err(CompletionError::NoRankedModels));
        assert_eq!(phase, InsertPhase::Failed);
        assert_eq!(doc.to_text(), "x\nhalf");
    }

    #[tokio::test]
    async fn cursor_past_end_is_rejected() {
        let result = DocumentInsertSink::begin(Document::from_text("x"), 5, "\t", CancellationToken::new());
        assert!(matches!(result, Err(DocumentError::LineOutOfRange { line: 5, len: 1 })));
    }
}
