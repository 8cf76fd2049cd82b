//! Events produced while a command runs

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output stream an [`Event::Output`] chunk belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputStream {
    /// Standard output of the remote command
    Stdout,
    /// Standard error of the remote command
    Stderr,
}

impl OutputStream {
    /// Stream identifier as carried by the transport
    pub fn id(self) -> u8 {
        match self {
            Self::Stdout => 0,
            Self::Stderr => 1,
        }
    }

    /// Map a transport stream identifier; anything but 0 is standard error
    pub fn from_id(id: u8) -> Self {
        match id {
            0 => Self::Stdout,
            _ => Self::Stderr,
        }
    }
}

/// Error codes a remctl server may report
///
/// `NoCode` never appears on the wire; the client synthesizes it for
/// failures of the transport itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ErrorCode {
    /// Locally synthesized, no server code available
    NoCode = 0,
    /// Internal server failure
    Internal = 1,
    /// Invalid authentication token
    BadToken = 2,
    /// Unknown message type
    Unknown = 3,
    /// Malformed command
    BadCommand = 4,
    /// Command not configured on the server
    UnknownCommand = 5,
    /// Caller not authorized for the command
    Access = 6,
    /// Too many arguments
    TooManyArgs = 7,
    /// Too much argument data
    TooMuchData = 8,
    /// Message not valid in the current protocol state
    UnexpectedMessage = 9,
}

impl ErrorCode {
    /// Numeric value of the code
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Look up a code by its numeric value
    pub fn from_code(code: i32) -> Option<Self> {
        let code = match code {
            0 => Self::NoCode,
            1 => Self::Internal,
            2 => Self::BadToken,
            3 => Self::Unknown,
            4 => Self::BadCommand,
            5 => Self::UnknownCommand,
            6 => Self::Access,
            7 => Self::TooManyArgs,
            8 => Self::TooMuchData,
            9 => Self::UnexpectedMessage,
            _ => return None,
        };
        Some(code)
    }

    /// Protocol name of the code
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoCode => "NOCODE",
            Self::Internal => "INTERNAL",
            Self::BadToken => "BAD_TOKEN",
            Self::Unknown => "UNKNOWN",
            Self::BadCommand => "BAD_COMMAND",
            Self::UnknownCommand => "UNKNOWN_COMMAND",
            Self::Access => "ACCESS",
            Self::TooManyArgs => "TOOMANY_ARGS",
            Self::TooMuchData => "TOOMUCH_DATA",
            Self::UnexpectedMessage => "UNEXPECTED_MESSAGE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a protocol error: a code plus the server's diagnostic text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolFailure {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable diagnostic
    pub message: String,
}

impl ProtocolFailure {
    /// Create a new protocol failure
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ProtocolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A typed event delivered to the caller for one command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// A chunk of command output
    Output {
        /// Stream the chunk was written to
        stream: OutputStream,
        /// Raw output bytes
        data: Bytes,
    },
    /// The command exited with this status
    Status(i32),
    /// The server or the transport reported an error
    Error(ProtocolFailure),
    /// The server closed the command stream without a status
    Done,
}

impl Event {
    /// Whether this event concludes a command's event stream
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Output { .. })
    }
}

/// An event as pulled from a transport, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEvent {
    /// Output bytes tagged with a transport stream id
    Output {
        /// Transport stream identifier
        stream: u8,
        /// Raw output bytes
        data: Bytes,
    },
    /// Exit status
    Status(i32),
    /// Server-side error with its numeric code
    Error {
        /// Numeric error code
        code: i32,
        /// Diagnostic text
        message: String,
    },
    /// End of the command stream
    Done,
}

impl From<RawEvent> for Event {
    fn from(raw: RawEvent) -> Self {
        match raw {
            RawEvent::Output { stream, data } => Self::Output {
                stream: OutputStream::from_id(stream),
                data,
            },
            RawEvent::Status(status) => Self::Status(status),
            RawEvent::Error { code, message } => match ErrorCode::from_code(code) {
                Some(code) => Self::Error(ProtocolFailure::new(code, message)),
                None => Self::Error(ProtocolFailure::new(
                    ErrorCode::Internal,
                    format!("{} (unrecognized error code {})", message, code),
                )),
            },
            RawEvent::Done => Self::Done,
        }
    }
}
