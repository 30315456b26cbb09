//! The reasoning trace of the turn currently in flight

use rtrace_wire::StreamEvent;
use serde::{Deserialize, Serialize};

/// One displayed entry of a turn's reasoning trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEntry {
    /// Initial reasoning; always index 0
    Thought { content: String },
    /// One thought/action/observation cycle, numbered by the backend
    Action {
        index: u32,
        thought: String,
        action: String,
        observation: String,
    },
}

impl TraceEntry {
    /// Convert a non-terminal event into a trace entry
    pub fn from_event(event: &StreamEvent) -> Option<Self> {
        match event {
            StreamEvent::Thought { content } => Some(TraceEntry::Thought {
                content: content.clone(),
            }),
            StreamEvent::Step {
                index,
                thought,
                action,
                observation,
            } => Some(TraceEntry::Action {
                index: *index,
                thought: thought.clone(),
                action: action.clone(),
                observation: observation.clone(),
            }),
            StreamEvent::FinalAnswer { .. } | StreamEvent::Error { .. } => None,
        }
    }

    pub fn index(&self) -> u32 {
        match self {
            TraceEntry::Thought { .. } => 0,
            TraceEntry::Action { index, .. } => *index,
        }
    }

    pub fn is_thought(&self) -> bool {
        matches!(self, TraceEntry::Thought { .. })
    }
}

/// Append-only trace for a single turn
#[derive(Debug, Default)]
pub struct TraceAccumulator {
    entries: Vec<TraceEntry>,
}

impl TraceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the entry for `event` and return the whole trace so far.
    ///
    /// Terminal events carry no trace entry; for those nothing is appended and
    /// `None` is returned.
    pub fn push(&mut self, event: &StreamEvent) -> Option<&[TraceEntry]> {
        let entry = TraceEntry::from_event(event)?;
        self.entries.push(entry);
        Some(&self.entries)
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn snapshot(&self) -> Vec<TraceEntry> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear the trace, returning what it held.
    pub fn reset(&mut self) -> Vec<TraceEntry> {
        std::mem::take(&mut self.entries)
    }
}
