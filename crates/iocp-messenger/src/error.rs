//! Error types for the messenger.

use std::io;

use thiserror::Error;

/// Errors that can occur when running the messenger.
///
/// Protocol conditions such as buffer overflow, a missing identifier prefix
/// or an unmatched command are not errors: they are dropped silently and only
/// show up in logs and [`MessengerStats`](crate::MessengerStats).
#[derive(Debug, Error)]
pub enum MessengerError {
    /// The underlying transport failed to read or write.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// The configuration cannot describe a usable wire format.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for messenger operations.
pub type MessengerResult<T> = Result<T, MessengerError>;
