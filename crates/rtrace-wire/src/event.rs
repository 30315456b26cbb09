//! Agent stream event types and line classification

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Events emitted by the agent backend, one per line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Initial reasoning, before any action
    Thought { content: String },
    /// One thought/action/observation cycle
    Step {
        #[serde(rename = "step")]
        index: u32,
        thought: String,
        action: String,
        observation: String,
    },
    /// Final answer; ends the turn
    FinalAnswer { content: String },
    /// Backend failure; ends the turn
    Error { content: String },
}

impl StreamEvent {
    /// Check if this is a terminal event (FinalAnswer or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamEvent::FinalAnswer { .. } | StreamEvent::Error { .. }
        )
    }

    /// Wire name of the event type
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Thought { .. } => "thought",
            StreamEvent::Step { .. } => "step",
            StreamEvent::FinalAnswer { .. } => "final_answer",
            StreamEvent::Error { .. } => "error",
        }
    }
}

const KNOWN_TYPES: &[&str] = &["thought", "step", "final_answer", "error"];

/// Classify one line of the stream.
///
/// Returns `Ok(None)` for records whose `type` is not known to this client, so
/// newer backends can add event kinds without breaking older readers.
pub fn classify(line: &str) -> Result<Option<StreamEvent>> {
    let value: Value =
        serde_json::from_str(line).map_err(|e| Error::parse(line, format!("invalid JSON: {}", e)))?;

    let Some(object) = value.as_object() else {
        return Err(Error::parse(line, "expected a JSON object"));
    };

    let Some(kind) = object
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_owned)
    else {
        return Err(Error::parse(line, "missing string field `type`"));
    };

    if !KNOWN_TYPES.contains(&kind.as_str()) {
        tracing::debug!("Ignoring unknown event type '{}'", kind);
        return Ok(None);
    }

    let event: StreamEvent = serde_json::from_value(value)
        .map_err(|e| Error::parse(line, format!("invalid `{}` event: {}", kind, e)))?;

    if let StreamEvent::Step { index: 0, .. } = event {
        return Err(Error::parse(line, "step index must be at least 1"));
    }

    Ok(Some(event))
}
