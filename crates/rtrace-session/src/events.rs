//! Store event types

use serde::{Deserialize, Serialize};

use crate::{commit::Turn, trace::TraceEntry};

/// Notifications emitted by the conversation store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    /// A turn started or finished
    LoadingChanged { loading: bool },

    /// The in-flight trace grew; carries the whole trace so far
    TraceUpdated { trace: Vec<TraceEntry> },

    /// A turn was committed to history
    HistoryUpdated { index: usize, turn: Turn },

    /// A line could not be decoded or classified and was skipped
    LineRejected { line: String, reason: String },

    /// A committed turn was collapsed or expanded
    VisibilityChanged { index: usize, visible: bool },
}
