use std::time::Duration;

use netsdr_codec::{ControlItemCode, EncodeError};
use netsdr_transport::TransportError;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The command could not be encoded. Nothing was sent.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// No matching response arrived before the deadline.
    #[error("no response for {item_code} after {after:?}")]
    Timeout {
        item_code: ControlItemCode,
        after: Duration,
    },

    /// Another command is still awaiting its response.
    #[error("session busy: {pending} is awaiting a response")]
    SessionBusy { pending: ControlItemCode },

    /// The caller cancelled the command.
    #[error("command cancelled")]
    Cancelled,

    /// The transport failed; reconnect before further use.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// A transport error that did not end the connection.
    #[error("transport error: {0}")]
    Transport(TransportError),

    /// A command could not be built from the given arguments.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while loading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Whether the caller may simply try again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::Timeout { .. } | SessionError::SessionBusy { .. } | SessionError::Cancelled
        )
    }

    /// Whether the session is unusable until reconnected.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::ConnectionLost(_))
    }
}

impl From<TransportError> for SessionError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::ConnectionLost(reason) => SessionError::ConnectionLost(reason),
            other => SessionError::Transport(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
