use once_cell::sync::Lazy;
use regex::Regex;

use super::effect::InsertEffect;
use super::msg::InsertMsg;
use super::state::{InsertPhase, InsertState, Position};

static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([-*+]|\d+[.)])(\s|$)").expect("valid list marker regex"));

/// Pure update function: applies a message to the insert state and returns
/// the effects the host must execute, in order.
pub fn update(mut state: InsertState, msg: InsertMsg) -> (InsertState, Vec<InsertEffect>) {
    let effects = match msg {
        InsertMsg::Begin {
            cursor_line,
            line_text,
            indent_unit,
        } => {
            if state.phase() != InsertPhase::Idle {
                return (state, Vec::new());
            }
            let (anchor, indent, lead) = placement(cursor_line, &line_text, &indent_unit);
            state.begin(anchor, indent);

            let mut effects = vec![InsertEffect::RegisterCancelListener];
            if !lead.is_empty() {
                state.record(&lead);
                effects.push(InsertEffect::Write { at: anchor, text: lead });
            }
            effects
        }
        InsertMsg::Chunk(chunk) => {
            if state.phase() != InsertPhase::Streaming || chunk.is_empty() {
                return (state, Vec::new());
            }
            let text = reindent(&chunk, state.indent_prefix());
            let at = state.insertion_point();
            state.record(&text);
            vec![InsertEffect::Write { at, text }]
        }
        InsertMsg::CancelRequested => terminate(&mut state, InsertPhase::Cancelled, None),
        InsertMsg::Finished => terminate(&mut state, InsertPhase::Completed, None),
        InsertMsg::Failed(message) => terminate(&mut state, InsertPhase::Failed, Some(message)),
    };

    (state, effects)
}

fn terminate(
    state: &mut InsertState,
    phase: InsertPhase,
    failure: Option<String>,
) -> Vec<InsertEffect> {
    // Only a live stream owns a listener; later terminal messages are no-ops.
    if state.phase() != InsertPhase::Streaming {
        return Vec::new();
    }
    state.finish(phase, failure);
    vec![InsertEffect::RemoveCancelListener]
}

/// Anchor, indent prefix and the text written before the first chunk.
///
/// A blank cursor line is filled in place. Otherwise output starts on a new
/// line after the cursor line, indented like it, one level deeper for list
/// items.
fn placement(cursor_line: usize, line_text: &str, indent_unit: &str) -> (Position, String, String) {
    let line_end = Position::new(cursor_line, line_text.chars().count());
    let leading: String = line_text.chars().take_while(|c| c.is_whitespace()).collect();
    let body = line_text.trim_start();

    if body.is_empty() {
        return (line_end, leading, String::new());
    }

    let mut indent = leading;
    if LIST_MARKER.is_match(body) {
        indent.push_str(indent_unit);
    }
    let lead = format!("\n{indent}");
    (line_end, indent, lead)
}

fn reindent(chunk: &str, indent: &str) -> String {
    if indent.is_empty() {
        return chunk.to_string();
    }
    chunk.replace('\n', &format!("\n{indent}"))
}
