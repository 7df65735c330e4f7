//! Error types for the device application.

use std::io;

use iocp_messenger::MessengerError;
use thiserror::Error;

/// Errors that can occur when running the device.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Socket or file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The configuration file could not be parsed.
    #[error("invalid configuration file: {0}")]
    Config(#[from] serde_yaml::Error),

    /// The messenger failed.
    #[error(transparent)]
    Messenger(#[from] MessengerError),

    /// The update log has no room for another entry.
    #[error("update log full: capacity {capacity}")]
    UpdateLogFull { capacity: usize },
}

impl DeviceError {
    /// Whether the error means the host went away.
    pub fn is_disconnect(&self) -> bool {
        let err = match self {
            DeviceError::Io(e) => e,
            DeviceError::Messenger(MessengerError::Transport(e)) => e,
            _ => return false,
        };
        matches!(
            err.kind(),
            io::ErrorKind::UnexpectedEof
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::TimedOut
                | io::ErrorKind::WriteZero
        )
    }
}

/// Result type alias for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_disconnect() {
        let eof: DeviceError =
            MessengerError::Transport(io::Error::from(io::ErrorKind::UnexpectedEof)).into();
        assert!(eof.is_disconnect());

        let reset: DeviceError = io::Error::from(io::ErrorKind::ConnectionReset).into();
        assert!(reset.is_disconnect());

        let stalled: DeviceError =
            MessengerError::Transport(io::Error::from(io::ErrorKind::TimedOut)).into();
        assert!(stalled.is_disconnect());

        let other: DeviceError = io::Error::from(io::ErrorKind::PermissionDenied).into();
        assert!(!other.is_disconnect());

        let full = DeviceError::UpdateLogFull { capacity: 4 };
        assert!(!full.is_disconnect());
    }
}
