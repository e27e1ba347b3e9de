use std::sync::Once;

use distill_core::insert::{update, InsertEffect, InsertMsg, InsertPhase, InsertState, Position};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(distill_logging::initialize_for_tests);
}

fn begin(line: usize, text: &str) -> (InsertState, Vec<InsertEffect>) {
    update(
        InsertState::new(),
        InsertMsg::Begin {
            cursor_line: line,
            line_text: text.to_string(),
            indent_unit: "\t".to_string(),
        },
    )
}

fn feed(state: InsertState, chunks: &[&str]) -> (InsertState, Vec<InsertEffect>) {
    let mut all = Vec::new();
    let mut state = state;
    for chunk in chunks {
        let (next, effects) = update(state, InsertMsg::Chunk(chunk.to_string()));
        state = next;
        all.extend(effects);
    }
    (state, all)
}

/// Applies write effects to a document, the way a host would.
fn apply(document: &str, effects: &[InsertEffect]) -> String {
    let mut lines: Vec<String> = document.split('\n').map(ToOwned::to_owned).collect();
    for effect in effects {
        if let InsertEffect::Write { at, text } = effect {
            let line = &lines[at.line];
            let split: usize = line.char_indices().nth(at.column).map_or(line.len(), |(i, _)| i);
            let combined = format!("{}{}{}", &line[..split], text, &line[split..]);
            let replacement: Vec<String> = combined.split('\n').map(ToOwned::to_owned).collect();
            lines.splice(at.line..=at.line, replacement);
        }
    }
    lines.join("\n")
}

#[test]
fn begin_registers_listener_and_opens_line_below() {
    init_logging();
    let (state, effects) = begin(1, "Some paragraph");

    assert_eq!(state.phase(), InsertPhase::Streaming);
    assert_eq!(state.anchor(), Position::new(1, 14));
    assert_eq!(state.indent_prefix(), "");
    assert_eq!(
        effects,
        vec![
            InsertEffect::RegisterCancelListener,
            InsertEffect::Write {
                at: Position::new(1, 14),
                text: "\n".to_string(),
            },
        ]
    );
}

#[test]
fn blank_cursor_line_is_filled_in_place() {
    init_logging();
    let (state, effects) = begin(3, "  ");

    assert_eq!(state.anchor(), Position::new(3, 2));
    assert_eq!(state.indent_prefix(), "  ");
    assert_eq!(effects, vec![InsertEffect::RegisterCancelListener]);
}

#[test]
fn list_items_get_one_extra_indent_level() {
    init_logging();
    let (state, _) = begin(0, "  - todo");
    assert_eq!(state.indent_prefix(), "  \t");

    let (state, effects) = feed(state, &["first\nsecond"]);
    assert_eq!(
        effects,
        vec![InsertEffect::Write {
            at: Position::new(1, 3),
            text: "first\n  \tsecond".to_string(),
        }]
    );
    assert_eq!(state.insertion_point(), Position::new(2, 9));
}

#[test]
fn chunks_append_at_accumulated_end_in_arrival_order() {
    init_logging();
    let document = "# Notes\nSummary here:\nafter";
    let (state, mut effects) = begin(1, "Summary here:");
    let (state, chunk_effects) = feed(state, &["Alpha ", "beta.\n", "Gamma", "", " delta."]);
    effects.extend(chunk_effects);
    let (state, end_effects) = update(state, InsertMsg::Finished);
    effects.extend(end_effects);

    assert_eq!(state.phase(), InsertPhase::Completed);
    assert_eq!(
        apply(document, &effects),
        "# Notes\nSummary here:\nAlpha beta.\nGamma delta.\nafter"
    );
    assert_eq!(effects.last(), Some(&InsertEffect::RemoveCancelListener));
}

#[test]
fn cancel_stops_accepting_chunks_and_keeps_partial_text() {
    init_logging();
    let (state, _) = begin(0, "Intro");
    let (state, _) = feed(state, &["kept"]);
    let (state, effects) = update(state, InsertMsg::CancelRequested);
    assert_eq!(effects, vec![InsertEffect::RemoveCancelListener]);
    assert_eq!(state.phase(), InsertPhase::Cancelled);

    let (state, late) = feed(state, &["dropped"]);
    assert!(late.is_empty());
    assert_eq!(state.inserted_text(), "\nkept");
}

#[test]
fn listener_is_removed_exactly_once_on_every_terminal_path() {
    init_logging();
    let terminals = [
        InsertMsg::Finished,
        InsertMsg::CancelRequested,
        InsertMsg::Failed("boom".to_string()),
    ];
    for terminal in terminals {
        let (state, _) = begin(0, "x");
        let (state, first) = update(state, terminal.clone());
        let (state, second) = update(state, InsertMsg::CancelRequested);
        let (_, third) = update(state, InsertMsg::Finished);

        let removals = first
            .iter()
            .chain(&second)
            .chain(&third)
            .filter(|e| **e == InsertEffect::RemoveCancelListener)
            .count();
        assert_eq!(removals, 1, "{terminal:?}");
    }
}

#[test]
fn failure_message_is_kept() {
    init_logging();
    let (state, _) = begin(0, "x");
    let (state, _) = update(state, InsertMsg::Failed("all models rate limited".to_string()));
    assert_eq!(state.phase(), InsertPhase::Failed);
    assert_eq!(state.failure(), Some("all models rate limited"));
}

#[test]
fn messages_before_begin_are_ignored() {
    init_logging();
    let state = InsertState::new();
    let (state, effects) = update(state, InsertMsg::Chunk("early".to_string()));
    assert!(effects.is_empty());
    let (state, effects) = update(state, InsertMsg::Finished);
    assert!(effects.is_empty());
    assert_eq!(state, InsertState::new());
}

#[test]
fn second_begin_while_streaming_is_ignored() {
    init_logging();
    let (state, _) = begin(0, "x");
    let before = state.clone();
    let (state, effects) = update(
        state,
        InsertMsg::Begin {
            cursor_line: 9,
            line_text: "other".to_string(),
            indent_unit: "\t".to_string(),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state, before);
}
