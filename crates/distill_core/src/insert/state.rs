/// Zero-based line and character column in the host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Position reached after writing `text` starting here.
    pub fn advanced_by(self, text: &str) -> Position {
        match text.rfind('\n') {
            None => Position {
                line: self.line,
                column: self.column + text.chars().count(),
            },
            Some(last_newline) => Position {
                line: self.line + text.matches('\n').count(),
                column: text[last_newline + 1..].chars().count(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertPhase {
    #[default]
    Idle,
    Streaming,
    Completed,
    Cancelled,
    Failed,
}

impl InsertPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            InsertPhase::Completed | InsertPhase::Cancelled | InsertPhase::Failed
        )
    }
}

/// Everything one streaming insert owns. The insertion point is derived from
/// the anchor and the accumulated text, never read back from the host.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InsertState {
    phase: InsertPhase,
    anchor: Position,
    indent: String,
    accumulated: String,
    failure: Option<String>,
}

impl InsertState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> InsertPhase {
        self.phase
    }

    pub fn anchor(&self) -> Position {
        self.anchor
    }

    pub fn indent_prefix(&self) -> &str {
        &self.indent
    }

    /// All text written so far, including the leading line break and the
    /// re-indentation added around chunks.
    pub fn inserted_text(&self) -> &str {
        &self.accumulated
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn insertion_point(&self) -> Position {
        self.anchor.advanced_by(&self.accumulated)
    }

    pub(crate) fn begin(&mut self, anchor: Position, indent: String) {
        self.phase = InsertPhase::Streaming;
        self.anchor = anchor;
        self.indent = indent;
        self.accumulated.clear();
        self.failure = None;
    }

    pub(crate) fn record(&mut self, text: &str) {
        self.accumulated.push_str(text);
    }

    pub(crate) fn finish(&mut self, phase: InsertPhase, failure: Option<String>) {
        self.phase = phase;
        self.failure = failure;
    }
}
