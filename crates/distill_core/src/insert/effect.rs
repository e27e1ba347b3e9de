use super::state::Position;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertEffect {
    /// Start listening for the user's cancel gesture.
    RegisterCancelListener,
    /// Insert `text` at `at`; nothing is replaced.
    Write { at: Position, text: String },
    /// Stop listening. Emitted exactly once per streaming insert.
    RemoveCancelListener,
}
