//! Instrument error types.

use std::time::Duration;
use thiserror::Error;

/// Result type for instrument operations.
pub type InstrumentResult<T> = Result<T, InstrumentError>;

/// Errors from the instrument collaborators.
///
/// Every variant triggers cleanup of the subprocess handles at the
/// session boundary; none is retried automatically.
#[derive(Debug, Error)]
pub enum InstrumentError {
    /// No response within the operation's deadline.
    #[error("{operation} timed out after {deadline:?}")]
    Timeout {
        /// The operation that missed its deadline.
        operation: &'static str,
        /// The deadline that was missed.
        deadline: Duration,
    },

    /// The external process exited unexpectedly.
    #[error("{process} exited unexpectedly")]
    ProcessExited {
        /// Which process died.
        process: &'static str,
    },

    /// A response line did not match the expected format.
    #[error("malformed response: {0:?}")]
    MalformedResponse(String),

    /// Failed to spawn or talk to a process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
