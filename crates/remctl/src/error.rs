//! Error types for the remctl client

use remctl_proto::{CommandError, ErrorCode, ProtocolFailure};
use thiserror::Error;

/// Main error type for remctl operations
#[derive(Debug, Error)]
pub enum RemctlError {
    /// The transport context could not be set up; build a new session
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// A setting was rejected or given at the wrong time
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// `open` called on a session that is already open
    #[error("Session is already open")]
    AlreadyOpen,

    /// The operation needs an open session
    #[error("Session is not open")]
    NotOpen,

    /// Connecting or authenticating failed; the session may be reopened
    #[error("Connection error: {0}")]
    Connection(String),

    /// The command could not be sent; the session stays open
    #[error("Submission error: {0}")]
    Submission(String),

    /// The previous command's events have not been drained yet
    #[error("A command is already in progress on this session")]
    CommandInProgress,

    /// The command argument vector is malformed
    #[error("Invalid command: {0}")]
    InvalidCommand(#[from] CommandError),

    /// A `host[:port]` target string could not be parsed
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// The command ended with a protocol error
    #[error("Protocol error {code}: {message}")]
    Protocol {
        /// Error code reported by the server, or NOCODE
        code: ErrorCode,
        /// Diagnostic text
        message: String,
    },
}

impl From<ProtocolFailure> for RemctlError {
    fn from(failure: ProtocolFailure) -> Self {
        Self::Protocol {
            code: failure.code,
            message: failure.message,
        }
    }
}

impl RemctlError {
    /// Whether the session that produced this error can still be used
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Initialization(_))
    }
}
