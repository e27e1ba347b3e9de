//! Plain-text document the summary is streamed into.

use std::fs;
use std::io;
use std::path::Path;

use distill_core::insert::Position;
use thiserror::Error;

use crate::persist::{write_atomic, PersistError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("line {line} is past the end of the document ({len} lines)")]
    LineOutOfRange { line: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    lines: Vec<String>,
}

impl Document {
    pub fn from_text(text: &str) -> Self {
        let normalized = text.replace("\r\n", "\n");
        Self {
            lines: normalized.split('\n').map(ToOwned::to_owned).collect(),
        }
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        fs::read_to_string(path).map(|text| Self::from_text(&text))
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        write_atomic(path, &self.to_text())
    }

    pub fn line(&self, index: usize) -> Result<&str, DocumentError> {
        self.lines
            .get(index)
            .map(String::as_str)
            .ok_or(DocumentError::LineOutOfRange {
                line: index,
                len: self.lines.len(),
            })
    }

    /// Inserts `text` at a character position; a column past the end of the
    /// line appends to it.
    pub fn insert(&mut self, at: Position, text: &str) -> Result<(), DocumentError> {
        let line = self.line(at.line)?;
        let split = line
            .char_indices()
            .nth(at.column)
            .map_or(line.len(), |(offset, _)| offset);
        let combined = format!("{}{}{}", &line[..split], text, &line[split..]);
        let replacement: Vec<String> = combined.split('\n').map(ToOwned::to_owned).collect();
        self.lines.splice(at.line..=at.line, replacement);
        Ok(())
    }

    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }
}
