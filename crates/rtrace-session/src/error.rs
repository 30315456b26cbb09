//! Error types for rtrace-session

use thiserror::Error;

/// Result type alias using rtrace-session Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during conversation operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the wire layer
    #[error(transparent)]
    Wire(#[from] rtrace_wire::Error),

    /// A turn is already streaming; only one may be in flight
    #[error("A turn is already in flight")]
    TurnInFlight,

    /// Turn index out of range
    #[error("Invalid turn index {index} (history has {len} turns)")]
    InvalidIndex { index: usize, len: usize },
}
