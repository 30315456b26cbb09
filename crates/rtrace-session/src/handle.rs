//! A cloneable handle for cancelling the turn in flight.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Cancels whichever turn is currently streaming.
///
/// Each turn gets a fresh token, so a handle taken before a turn starts still
/// reaches it, and aborting never leaks into the next turn.
#[derive(Clone, Default)]
pub struct StoreHandle {
    cancel: Arc<Mutex<CancellationToken>>,
}

impl StoreHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Arm a fresh cancellation token for a new turn.
    pub(crate) fn start_turn(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();
        token
    }

    /// Abort the turn in flight, if any.
    pub fn abort(&self) {
        self.cancel.lock().cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_cancels_current_token() {
        let handle = StoreHandle::new();
        let token = handle.start_turn();
        handle.clone().abort();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_new_turn_gets_fresh_token() {
        let handle = StoreHandle::new();
        let first = handle.start_turn();
        handle.abort();
        let second = handle.start_turn();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn test_abort_while_idle_does_not_touch_next_turn() {
        let handle = StoreHandle::new();
        handle.abort();
        assert!(!handle.start_turn().is_cancelled());
    }
}
