//! Conversation state: committed turns and the turn in flight.

use rtrace_wire::StreamEvent;
use uuid::Uuid;

use crate::{
    commit::{InFlight, Turn, TurnOutcome, commit},
    error::{Error, Result},
    trace::TraceEntry,
};

/// Conversation state. History is append-only; the in-flight slot holds at
/// most one turn.
#[derive(Debug, Default)]
pub struct Conversation {
    history: Vec<Turn>,
    in_flight: Option<InFlight>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new turn. Fails without touching state if one is in flight.
    pub fn begin(&mut self, user_message: impl Into<String>) -> Result<Uuid> {
        if self.in_flight.is_some() {
            return Err(Error::TurnInFlight);
        }
        let in_flight = InFlight::new(user_message);
        let id = in_flight.id;
        self.in_flight = Some(in_flight);
        Ok(id)
    }

    /// Append a trace event to turn `id` and return the trace so far.
    ///
    /// Returns `None` if `id` is not the turn in flight or the event carries no
    /// trace entry.
    pub fn record(&mut self, id: Uuid, event: &StreamEvent) -> Option<Vec<TraceEntry>> {
        let in_flight = self.in_flight.as_mut().filter(|t| t.id == id)?;
        in_flight.trace.push(event).map(<[TraceEntry]>::to_vec)
    }

    /// Commit turn `id` with `outcome`, clearing the in-flight slot.
    ///
    /// Returns the new turn's index and a copy of it, or `None` if `id` is not
    /// the turn in flight (already committed).
    pub fn commit(&mut self, id: Uuid, outcome: TurnOutcome) -> Option<(usize, Turn)> {
        if self.in_flight.as_ref().is_none_or(|t| t.id != id) {
            return None;
        }
        let in_flight = self.in_flight.take()?;
        let turn = commit(in_flight, outcome);
        self.history.push(turn.clone());
        Some((self.history.len() - 1, turn))
    }

    /// Flip the visibility of a committed turn and return the new value.
    pub fn toggle_visibility(&mut self, index: usize) -> Result<bool> {
        let len = self.history.len();
        let turn = self
            .history
            .get_mut(index)
            .ok_or(Error::InvalidIndex { index, len })?;
        turn.visible = !turn.visible;
        Ok(turn.visible)
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// The in-flight trace, empty when idle
    pub fn current_trace(&self) -> &[TraceEntry] {
        self.in_flight
            .as_ref()
            .map(|t| t.trace.entries())
            .unwrap_or(&[])
    }

    pub fn pending_message(&self) -> Option<&str> {
        self.in_flight.as_ref().map(|t| t.user_message.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::TurnFailure;

    fn thought() -> StreamEvent {
        StreamEvent::Thought {
            content: "plan".into(),
        }
    }

    fn answered(conversation: &mut Conversation, message: &str) -> usize {
        let id = conversation.begin(message).unwrap();
        conversation
            .commit(id, TurnOutcome::Answered(format!("re: {}", message)))
            .unwrap()
            .0
    }

    #[test]
    fn test_begin_rejects_second_turn() {
        let mut conversation = Conversation::new();
        let id = conversation.begin("first").unwrap();
        conversation.record(id, &thought());

        let err = conversation.begin("second").unwrap_err();
        assert!(matches!(err, Error::TurnInFlight));
        assert_eq!(conversation.pending_message(), Some("first"));
        assert_eq!(conversation.current_trace().len(), 1);
    }

    #[test]
    fn test_commit_clears_in_flight() {
        let mut conversation = Conversation::new();
        let id = conversation.begin("q").unwrap();
        conversation.record(id, &thought());
        assert!(conversation.is_loading());

        let (index, turn) = conversation
            .commit(id, TurnOutcome::Answered("a".into()))
            .unwrap();
        assert_eq!(index, 0);
        assert_eq!(turn.trace.len(), 1);
        assert!(!conversation.is_loading());
        assert!(conversation.current_trace().is_empty());
        assert_eq!(conversation.history()[0], turn);
    }

    #[test]
    fn test_commit_is_once_per_turn() {
        let mut conversation = Conversation::new();
        let id = conversation.begin("q").unwrap();
        assert!(conversation.commit(id, TurnOutcome::Answered("a".into())).is_some());
        assert!(
            conversation
                .commit(id, TurnFailure::Cancelled.into())
                .is_none()
        );
        assert_eq!(conversation.history().len(), 1);
    }

    #[test]
    fn test_stale_id_does_not_touch_new_turn() {
        let mut conversation = Conversation::new();
        let old = conversation.begin("one").unwrap();
        conversation.commit(old, TurnOutcome::Answered("a".into()));
        let current = conversation.begin("two").unwrap();

        assert!(conversation.record(old, &thought()).is_none());
        assert!(conversation.commit(old, TurnFailure::Cancelled.into()).is_none());
        assert_eq!(conversation.pending_message(), Some("two"));
        assert!(conversation.record(current, &thought()).is_some());
        assert_eq!(conversation.current_trace().len(), 1);
    }

    #[test]
    fn test_toggle_visibility_flips_only_target() {
        let mut conversation = Conversation::new();
        answered(&mut conversation, "one");
        answered(&mut conversation, "two");
        answered(&mut conversation, "three");

        assert!(!conversation.toggle_visibility(0).unwrap());
        let visible: Vec<bool> = conversation.history().iter().map(|t| t.visible).collect();
        assert_eq!(visible, vec![false, true, true]);

        assert!(conversation.toggle_visibility(0).unwrap());
        assert!(conversation.history().iter().all(|t| t.visible));
    }

    #[test]
    fn test_toggle_visibility_invalid_index() {
        let mut conversation = Conversation::new();
        answered(&mut conversation, "one");
        match conversation.toggle_visibility(5) {
            Err(Error::InvalidIndex { index, len }) => {
                assert_eq!(index, 5);
                assert_eq!(len, 1);
            }
            other => panic!("expected InvalidIndex, got {:?}", other),
        }
        assert!(conversation.history()[0].visible);
    }

    #[test]
    fn test_indices_stay_stable() {
        let mut conversation = Conversation::new();
        let first = answered(&mut conversation, "one");
        conversation.toggle_visibility(first).unwrap();
        let second = answered(&mut conversation, "two");
        assert_eq!((first, second), (0, 1));
        assert_eq!(conversation.history()[0].user_message, "one");
        assert!(!conversation.history()[0].visible);
    }
}
