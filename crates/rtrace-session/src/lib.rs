//! rtrace-session: Conversation turns over ReAct agent event streams
//!
//! This crate owns the conversation state: it drives one turn at a time from a
//! byte source through the wire layer, accumulates the live reasoning trace,
//! and commits each finished turn into an append-only history.

pub mod commit;
pub mod conversation;
pub mod error;
pub mod events;
pub mod handle;
pub mod store;
pub mod trace;
pub mod transport;

pub use commit::{InFlight, Turn, TurnFailure, TurnOutcome};
pub use conversation::Conversation;
pub use error::{Error, Result};
pub use events::StoreEvent;
pub use handle::StoreHandle;
pub use store::ConversationStore;
pub use trace::{TraceAccumulator, TraceEntry};
pub use transport::{ByteSource, FileSource, abortable};
