//! rtrace-wire: Reading ReAct agent event streams
//!
//! This crate turns the raw bytes of a newline-delimited JSON event stream into
//! typed [`StreamEvent`]s, and provides an HTTP client for the backend that
//! produces them.

pub mod error;
pub mod event;
pub mod frame;
pub mod http;

pub use error::{Error, Result};
pub use event::{StreamEvent, classify};
pub use frame::{ByteStream, LineDecoder, LineStream, lines};
pub use http::{DEFAULT_ENDPOINT, HealthStatus, HttpSource};
