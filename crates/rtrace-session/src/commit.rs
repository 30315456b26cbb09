//! Packaging a finished turn into an immutable history record

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::trace::{TraceAccumulator, TraceEntry};

/// A committed exchange: one user message, its trace, and the final answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub user_message: String,
    pub trace: Vec<TraceEntry>,
    pub final_text: String,
    pub succeeded: bool,
    /// Whether the trace is expanded; the only field that changes after commit
    pub visible: bool,
    pub started_at: i64,
    pub committed_at: i64,
}

/// Why a turn ended without an answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnFailure {
    /// The backend sent an `error` event
    Backend(String),
    /// The byte source failed or could not be opened
    Transport(String),
    /// The stream ended before any terminal event
    EndedWithoutAnswer,
    /// The request was aborted locally
    Cancelled,
}

impl TurnFailure {
    /// Text shown to the user in place of an answer
    pub fn user_message(&self) -> String {
        match self {
            TurnFailure::Backend(content) => format!("Error: {}", content),
            TurnFailure::Transport(detail) => {
                format!("Error: connection to the agent failed ({})", detail)
            }
            TurnFailure::EndedWithoutAnswer => {
                "Error: the response ended before a final answer was received".to_string()
            }
            TurnFailure::Cancelled => "Error: the request was cancelled".to_string(),
        }
    }
}

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Answered(String),
    Failed(TurnFailure),
}

impl From<TurnFailure> for TurnOutcome {
    fn from(failure: TurnFailure) -> Self {
        TurnOutcome::Failed(failure)
    }
}

/// State of the turn currently streaming
#[derive(Debug)]
pub struct InFlight {
    pub id: Uuid,
    pub user_message: String,
    pub started_at: i64,
    pub trace: TraceAccumulator,
}

impl InFlight {
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_message: user_message.into(),
            started_at: chrono::Utc::now().timestamp_millis(),
            trace: TraceAccumulator::new(),
        }
    }
}

/// Build the history record for a finished turn.
///
/// The trace is taken as it stands at this instant and the accumulator is
/// left empty.
pub fn commit(mut in_flight: InFlight, outcome: TurnOutcome) -> Turn {
    let trace = in_flight.trace.reset();
    let (final_text, succeeded) = match outcome {
        TurnOutcome::Answered(text) => (text, true),
        TurnOutcome::Failed(failure) => (failure.user_message(), false),
    };

    Turn {
        id: in_flight.id,
        user_message: in_flight.user_message,
        trace,
        final_text,
        succeeded,
        visible: true,
        started_at: in_flight.started_at,
        committed_at: chrono::Utc::now().timestamp_millis(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtrace_wire::StreamEvent;

    fn in_flight_with_steps(n: u32) -> InFlight {
        let mut in_flight = InFlight::new("what's the weather?");
        in_flight.trace.push(&StreamEvent::Thought {
            content: "need weather".into(),
        });
        for i in 1..=n {
            in_flight.trace.push(&StreamEvent::Step {
                index: i,
                thought: "t".into(),
                action: "a".into(),
                observation: "o".into(),
            });
        }
        in_flight
    }

    #[test]
    fn test_commit_answer() {
        let in_flight = in_flight_with_steps(1);
        let id = in_flight.id;
        let turn = commit(in_flight, TurnOutcome::Answered("sunny".into()));
        assert!(turn.succeeded);
        assert!(turn.visible);
        assert_eq!(turn.id, id);
        assert_eq!(turn.final_text, "sunny");
        assert_eq!(turn.user_message, "what's the weather?");
        assert_eq!(turn.trace.len(), 2);
        assert!(turn.committed_at >= turn.started_at);
    }

    #[test]
    fn test_commit_backend_error_keeps_partial_trace() {
        let turn = commit(
            in_flight_with_steps(2),
            TurnFailure::Backend("max steps reached".into()).into(),
        );
        assert!(!turn.succeeded);
        assert_eq!(turn.final_text, "Error: max steps reached");
        assert_eq!(turn.trace.len(), 3);
    }

    #[test]
    fn test_commit_error_with_empty_trace() {
        let turn = commit(
            InFlight::new("hi"),
            TurnFailure::Transport("connection refused".into()).into(),
        );
        assert!(!turn.succeeded);
        assert!(turn.trace.is_empty());
        assert!(turn.final_text.contains("connection refused"));
    }

    #[test]
    fn test_failure_messages() {
        assert!(
            TurnFailure::EndedWithoutAnswer
                .user_message()
                .contains("before a final answer")
        );
        assert!(TurnFailure::Cancelled.user_message().contains("cancelled"));
    }

    #[test]
    fn test_turn_round_trips_through_json() {
        let turn = commit(in_flight_with_steps(1), TurnOutcome::Answered("ok".into()));
        let json = serde_json::to_string(&turn).unwrap();
        let back: Turn = serde_json::from_str(&json).unwrap();
        assert_eq!(back, turn);
    }
}
