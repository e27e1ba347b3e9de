#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertMsg {
    /// Host starts streaming below the cursor line.
    Begin {
        cursor_line: usize,
        /// Full text of the cursor line.
        line_text: String,
        /// One indentation level as the host writes it (`"\t"`, `"    "`).
        indent_unit: String,
    },
    /// Next piece of model output, in arrival order.
    Chunk(String),
    /// The cancellation listener fired.
    CancelRequested,
    /// The completion resolved normally.
    Finished,
    /// The completion failed with this message.
    Failed(String),
}
