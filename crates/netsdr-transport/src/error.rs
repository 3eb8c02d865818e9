use std::io::ErrorKind;
use std::net::SocketAddr;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind the local address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to connect to the receiver.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// An I/O error that does not end the connection.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection is gone. Reconnect before further use.
    #[error("connection lost: {0}")]
    ConnectionLost(String),
}

impl TransportError {
    /// Whether this error ends the connection.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, TransportError::ConnectionLost(_))
    }

    /// Sort an I/O error into connection failures and everything else.
    pub(crate) fn from_io(err: std::io::Error) -> Self {
        match err.kind() {
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::BrokenPipe => TransportError::ConnectionLost(err.to_string()),
            _ => TransportError::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
