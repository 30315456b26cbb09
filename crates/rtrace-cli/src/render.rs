//! Plain-text rendering of traces and turns

use rtrace_session::{TraceEntry, Turn};

/// Longest observation shown before it is cut short
const OBSERVATION_PREVIEW: usize = 200;

/// Truncate a string to `max` characters, appending "..." if truncated.
/// Operates on Unicode char boundaries, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

pub fn format_entry(entry: &TraceEntry) -> String {
    match entry {
        TraceEntry::Thought { content } => format!("[thought] {}", content),
        TraceEntry::Action {
            index,
            thought,
            action,
            observation,
        } => format!(
            "[step {}] {}\n  action: {}\n  observation: {}",
            index,
            thought,
            action,
            truncate_chars(observation, OBSERVATION_PREVIEW)
        ),
    }
}

/// Whether a turn's trace is printed.
///
/// With `show_trace` off, traces start collapsed and a toggled turn (one whose
/// `visible` flag was flipped) is the one that expands.
pub fn is_expanded(turn: &Turn, show_trace: bool) -> bool {
    turn.visible == show_trace
}

/// Render one committed turn, with its trace if the turn is expanded.
pub fn format_turn(index: usize, turn: &Turn, show_trace: bool) -> String {
    let mut output = format!("[{}] > {}\n", index, turn.user_message);

    if is_expanded(turn, show_trace) {
        for entry in &turn.trace {
            for line in format_entry(entry).lines() {
                output.push_str("    ");
                output.push_str(line);
                output.push('\n');
            }
        }
    } else if !turn.trace.is_empty() {
        output.push_str(&format!(
            "    ({} trace entries hidden, /toggle {} to show)\n",
            turn.trace.len(),
            index
        ));
    }

    output.push_str(&turn.final_text);
    output
}

pub fn format_history(turns: &[Turn], show_trace: bool) -> String {
    if turns.is_empty() {
        return "No turns yet.".to_string();
    }
    turns
        .iter()
        .enumerate()
        .map(|(i, turn)| format_turn(i, turn, show_trace))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Tracks how much of the live trace has been printed.
///
/// Trace updates carry the whole trace so far; this hands back only the
/// entries not yet shown.
#[derive(Debug, Default)]
pub struct TracePrinter {
    shown: usize,
}

impl TracePrinter {
    pub fn fresh<'a>(&mut self, trace: &'a [TraceEntry]) -> &'a [TraceEntry] {
        if trace.len() < self.shown {
            // A new turn's trace
            self.shown = 0;
        }
        let fresh = &trace[self.shown..];
        self.shown = trace.len();
        fresh
    }

    pub fn reset(&mut self) {
        self.shown = 0;
    }
}
