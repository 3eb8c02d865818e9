use std::fmt;
use std::io;

use netsdr_codec::EncodeError;
use netsdr_session::SessionError;
use netsdr_transport::TransportError;

// Exit codes follow the sysexits/timeout(1) conventions.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::AddrInUse | io::ErrorKind::AddrNotAvailable => TRANSPORT_ERROR,
        io::ErrorKind::ConnectionRefused => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. } | TransportError::Connect { source, .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {source}"))
        }
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn encode_error(context: &str, err: EncodeError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Timeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        SessionError::Encode(err) => encode_error(context, err),
        SessionError::Transport(err) => transport_error(context, err),
        SessionError::ConnectionLost(_) => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        SessionError::InvalidCommand(_) | SessionError::Config(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        SessionError::Json(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        SessionError::Io(source) => io_error(context, source),
        SessionError::SessionBusy { .. } | SessionError::Cancelled => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
    }
}
