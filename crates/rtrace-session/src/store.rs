//! The conversation store: drives one turn at a time from a byte source into
//! history.
//!
//! A turn flows through the wire layer (framing, then classification), grows
//! the in-flight trace on every `thought`/`step`, and ends with exactly one
//! commit. Every exit path commits: a terminal event, a transport failure, the
//! stream ending early, `abort()`, or the `send_turn` future being dropped.

use std::future::Future;
use std::sync::Arc;

use futures::{FutureExt, StreamExt};
use parking_lot::Mutex;
use rtrace_wire::{LineStream, StreamEvent, classify};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    commit::{Turn, TurnFailure, TurnOutcome},
    conversation::Conversation,
    error::Result,
    events::StoreEvent,
    handle::StoreHandle,
    trace::TraceEntry,
    transport::ByteSource,
};

/// Cloneable handle over the conversation state and its byte source
#[derive(Clone)]
pub struct ConversationStore {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<Conversation>,
    source: Arc<dyn ByteSource>,
    event_tx: broadcast::Sender<StoreEvent>,
    handle: StoreHandle,
}

impl ConversationStore {
    /// Create an empty store reading turns from `source`
    pub fn new(source: Arc<dyn ByteSource>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(Conversation::new()),
                source,
                event_tx,
                handle: StoreHandle::new(),
            }),
        }
    }

    /// Subscribe to store events.
    ///
    /// The channel holds the most recent 256 events. A receiver that falls
    /// further behind gets `RecvError::Lagged` and may have missed commits or
    /// loading changes; it should re-read [`history`](Self::history) and
    /// [`is_loading`](Self::is_loading) before continuing.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Get a cloneable handle for aborting the turn in flight.
    pub fn handle(&self) -> StoreHandle {
        self.inner.handle.clone()
    }

    /// Send a user message and stream the agent's turn into history.
    ///
    /// The in-flight slot is claimed when this is called, not when the future
    /// is first polled: a second call while a turn is in flight resolves to
    /// [`Error::TurnInFlight`](crate::Error::TurnInFlight) and leaves the
    /// running turn untouched. On success the future resolves to the index of
    /// the committed turn, which may be a failed turn. Dropping the future
    /// commits a cancelled turn.
    pub fn send_turn<M: Into<String>>(
        &self,
        message: M,
    ) -> impl Future<Output = Result<usize>> + Send + 'static + use<M> {
        let message = message.into();
        let begun = self.begin(message.clone());
        async move {
            let guard = begun?;
            let outcome = guard.store.run(guard.id, &message, guard.cancel.clone()).await;
            Ok(guard.commit(outcome))
        }
    }

    fn begin(&self, message: String) -> Result<TurnGuard> {
        let id = self.inner.state.lock().begin(message)?;
        let cancel = self.inner.handle.start_turn();
        tracing::debug!(turn = %id, "Turn started");
        self.emit(StoreEvent::LoadingChanged { loading: true });
        Ok(TurnGuard {
            store: self.clone(),
            id,
            cancel,
            committed: false,
        })
    }

    /// Read the stream until the turn has an outcome.
    async fn run(&self, id: Uuid, message: &str, cancel: CancellationToken) -> TurnOutcome {
        let bytes = tokio::select! {
            biased;
            _ = cancel.cancelled() => return TurnFailure::Cancelled.into(),
            opened = self.inner.source.open(message, cancel.clone()) => match opened {
                Ok(bytes) => bytes,
                Err(e) => return transport_failure(e),
            },
        };
        let mut lines = rtrace_wire::lines(bytes);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return TurnFailure::Cancelled.into(),
                next = lines.next() => next,
            };

            let line = match next {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    if let rtrace_wire::Error::Decode { line, .. } = &e {
                        self.reject(String::from_utf8_lossy(line).into_owned(), e.to_string());
                    }
                    return transport_failure(e);
                }
                None => {
                    tracing::warn!(turn = %id, "Stream ended without a terminal event");
                    return TurnFailure::EndedWithoutAnswer.into();
                }
            };

            match classify(&line) {
                Ok(Some(event)) => {
                    if let Some(outcome) = self.apply(id, event) {
                        drain_after_terminal(id, &mut lines);
                        return outcome;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(turn = %id, "Skipping line: {}", e);
                    self.reject(line, e.to_string());
                }
            }
        }
    }

    /// Feed one event into the in-flight turn; terminal events yield the outcome.
    fn apply(&self, id: Uuid, event: StreamEvent) -> Option<TurnOutcome> {
        match event {
            StreamEvent::FinalAnswer { content } => return Some(TurnOutcome::Answered(content)),
            StreamEvent::Error { content } => return Some(TurnFailure::Backend(content).into()),
            StreamEvent::Thought { .. } | StreamEvent::Step { .. } => {}
        }

        tracing::debug!(turn = %id, "Received {} event", event.kind());
        let trace = self.inner.state.lock().record(id, &event);
        if let Some(trace) = trace {
            self.emit(StoreEvent::TraceUpdated { trace });
        }
        None
    }

    /// Commit turn `id` and notify observers. Returns the turn's index.
    fn finish(&self, id: Uuid, outcome: TurnOutcome) -> Option<usize> {
        let committed = self.inner.state.lock().commit(id, outcome);
        let (index, turn) = committed?;

        tracing::info!(
            turn = %id,
            index,
            succeeded = turn.succeeded,
            steps = turn.trace.len(),
            "Turn committed"
        );
        self.emit(StoreEvent::HistoryUpdated { index, turn });
        self.emit(StoreEvent::LoadingChanged { loading: false });
        Some(index)
    }

    fn reject(&self, line: String, reason: String) {
        self.emit(StoreEvent::LineRejected { line, reason });
    }

    fn emit(&self, event: StoreEvent) {
        let _ = self.inner.event_tx.send(event);
    }

    /// Flip whether a committed turn's trace is shown.
    ///
    /// Returns the new visibility, or
    /// [`Error::InvalidIndex`](crate::Error::InvalidIndex) without changing
    /// anything when `index` is out of range.
    pub fn toggle_visibility(&self, index: usize) -> Result<bool> {
        let visible = self.inner.state.lock().toggle_visibility(index)?;
        self.emit(StoreEvent::VisibilityChanged { index, visible });
        Ok(visible)
    }

    /// Abort the turn in flight, if any.
    pub fn abort(&self) {
        self.inner.handle.abort();
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.lock().is_loading()
    }

    /// The in-flight trace, empty when idle
    pub fn current_trace(&self) -> Vec<TraceEntry> {
        self.inner.state.lock().current_trace().to_vec()
    }

    pub fn pending_message(&self) -> Option<String> {
        self.inner.state.lock().pending_message().map(str::to_string)
    }

    pub fn history(&self) -> Vec<Turn> {
        self.inner.state.lock().history().to_vec()
    }

    pub fn turn(&self, index: usize) -> Option<Turn> {
        self.inner.state.lock().history().get(index).cloned()
    }

    /// Number of committed turns
    pub fn len(&self) -> usize {
        self.inner.state.lock().history().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn transport_failure(error: rtrace_wire::Error) -> TurnOutcome {
    match error {
        rtrace_wire::Error::Aborted => TurnFailure::Cancelled.into(),
        other => {
            tracing::warn!("Transport failed: {}", other);
            TurnFailure::Transport(other.to_string()).into()
        }
    }
}

/// Look at lines that already arrived after the terminal event without
/// waiting for more. None of them belong to the committed turn.
fn drain_after_terminal(id: Uuid, lines: &mut LineStream) {
    while let Some(Some(Ok(line))) = lines.next().now_or_never() {
        match classify(&line) {
            Ok(Some(event)) if event.is_terminal() => {
                tracing::warn!(
                    turn = %id,
                    "Protocol violation: ignoring second terminal event '{}'",
                    event.kind()
                );
            }
            Ok(Some(event)) => {
                tracing::warn!(
                    turn = %id,
                    "Ignoring '{}' event after terminal event",
                    event.kind()
                );
            }
            Ok(None) | Err(_) => {}
        }
    }
}

/// Owns the in-flight slot for one turn; commits a cancelled turn if dropped
/// before an outcome was committed.
struct TurnGuard {
    store: ConversationStore,
    id: Uuid,
    cancel: CancellationToken,
    committed: bool,
}

impl TurnGuard {
    fn commit(mut self, outcome: TurnOutcome) -> usize {
        self.committed = true;
        let index = self.store.finish(self.id, outcome);
        debug_assert!(index.is_some(), "turn {} committed twice", self.id);
        index.unwrap_or_else(|| {
            tracing::error!(turn = %self.id, "Turn was already committed");
            self.store.len().saturating_sub(1)
        })
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        if !self.committed {
            tracing::debug!(turn = %self.id, "Turn dropped before commit");
            self.store.finish(self.id, TurnFailure::Cancelled.into());
        }
    }
}
