use std::io;

use thiserror::Error;

use crate::nt_status::NTStatus;

/// Failures of the byte stream or its framing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection closed by peer")]
    ConnectionClosed,
    #[error("Timed out waiting for the server")]
    Timeout,
    #[error("I/O error ({kind:?}): {message}")]
    Io { kind: io::ErrorKind, message: String },
    #[error("NetBIOS session request rejected with code {0:#04x}")]
    NetBIOSRejected(u8),
    #[error("Frame of {0} bytes exceeds the transport limit")]
    FrameTooLarge(usize),
    #[error("Unexpected transport packet type {0:#04x}")]
    UnexpectedPacket(u8),
}

impl From<io::Error> for TransportError {
    fn from(value: io::Error) -> Self {
        match value.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Self::ConnectionClosed,
            io::ErrorKind::TimedOut => Self::Timeout,
            kind => Self::Io { kind, message: value.to_string() },
        }
    }
}

/// The peer sent something this client cannot make sense of.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(String),
    #[error("Expected a response to command {expected:#06x}, got {actual:#06x}")]
    UnexpectedCommand { expected: u16, actual: u16 },
    #[error("Command {command:#06x} failed with status {status:#010x}")]
    UnexpectedStatus { command: u16, status: u32 },
    #[error("Signature check failed for message {0}")]
    BadSignature(u64),
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication rejected with status {0:#010x}")]
    Rejected(u32),
    #[error("Server selected none of the offered dialects")]
    DialectMismatch,
    #[error("Invalid security token: {0}")]
    InvalidToken(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("Invalid operation order: {0}")]
    InvalidOperationOrder(String),
    #[error("Session has been terminated")]
    SessionTerminated,
}

/// A file or directory request the server refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OperationError {
    #[error("{path}: no such file or directory")]
    NotFound { path: String },
    #[error("{path}: already exists")]
    AlreadyExists { path: String },
    #[error("{path}: directory not empty")]
    NotEmpty { path: String },
    #[error("{path}: access denied")]
    AccessDenied { path: String },
    #[error("{path}: is a directory")]
    IsADirectory { path: String },
    #[error("{path}: not a directory")]
    NotADirectory { path: String },
    #[error("{path}: in use by another open")]
    SharingViolation { path: String },
    #[error("{path}: failed with status {status:#010x}")]
    Failed { path: String, status: u32 },
}

impl OperationError {
    /// Maps an NT status returned for `path` to the closest operation error.
    pub fn from_status(status: u32, path: impl Into<String>) -> Self {
        let path = path.into();
        match NTStatus::from(status) {
            NTStatus::NoSuchFile
            | NTStatus::ObjectNameNotFound
            | NTStatus::ObjectPathNotFound
            | NTStatus::NoMoreFiles
            | NTStatus::BadNetworkName => Self::NotFound { path },
            NTStatus::ObjectNameCollision => Self::AlreadyExists { path },
            NTStatus::DirectoryNotEmpty => Self::NotEmpty { path },
            NTStatus::AccessDenied => Self::AccessDenied { path },
            NTStatus::FileIsADirectory => Self::IsADirectory { path },
            NTStatus::NotADirectory => Self::NotADirectory { path },
            NTStatus::SharingViolation | NTStatus::DeletePending => Self::SharingViolation { path },
            _ => Self::Failed { path, status },
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::NotFound { path }
            | Self::AlreadyExists { path }
            | Self::NotEmpty { path }
            | Self::AccessDenied { path }
            | Self::IsADirectory { path }
            | Self::NotADirectory { path }
            | Self::SharingViolation { path }
            | Self::Failed { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SMBError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Operation(#[from] OperationError),
    #[error("Request cancelled")]
    Cancelled,
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Crypto operation failed with error: {0}")]
    CryptoError(String),
    #[error("Payload too small. Expected {expected} bytes, got {actual}")]
    PayloadTooSmall { expected: usize, actual: usize },
    /// The caller's sink or source failed; the server never saw it.
    #[error("Local I/O failed ({kind:?}): {message}")]
    LocalIo { kind: io::ErrorKind, message: String },
}

impl SMBError {
    pub fn parse_error<T: ToString>(error: T) -> Self {
        Self::Protocol(ProtocolError::Malformed(error.to_string()))
    }

    pub fn crypto_error<T: ToString>(error: T) -> Self {
        Self::CryptoError(error.to_string())
    }

    pub fn config_error<T: ToString>(error: T) -> Self {
        Self::Config(error.to_string())
    }

    pub fn payload_too_small(expected: usize, actual: usize) -> Self {
        Self::PayloadTooSmall { expected, actual }
    }

    pub fn local_io(error: io::Error) -> Self {
        Self::LocalIo { kind: error.kind(), message: error.to_string() }
    }

    pub fn invalid_order<T: Into<String>>(message: T) -> Self {
        Self::State(StateError::InvalidOperationOrder(message.into()))
    }

    pub fn unexpected_status(command: u16, status: u32) -> Self {
        Self::Protocol(ProtocolError::UnexpectedStatus { command, status })
    }

    /// Errors after which the session cannot carry further requests. A timed
    /// out request leaves the connection usable; anything the peer sent that
    /// cannot be trusted or understood does not.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Transport(TransportError::Timeout) => false,
            Self::Transport(_) => true,
            Self::Protocol(error) => !matches!(error, ProtocolError::UnexpectedStatus { .. }),
            Self::PayloadTooSmall { .. } => true,
            Self::State(StateError::SessionTerminated) => true,
            _ => false,
        }
    }
}

impl From<io::Error> for SMBError {
    fn from(value: io::Error) -> Self {
        Self::Transport(value.into())
    }
}
