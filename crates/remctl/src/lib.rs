//! # remctl
//!
//! An async client for the remctl remote command protocol.
//!
//! A [`Session`] wraps one authenticated [`Transport`] connection. Each
//! [`Session::execute`] submits a command and returns the session's
//! [`EventStream`], which yields the command's output chunks followed by
//! exactly one terminal event: an exit status, a protocol error, or the end
//! of the stream.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use remctl_proto as proto;
pub use remctl_transport as transport;

/// Error types for the remctl client
pub mod error;

/// Session lifecycle and command submission
pub mod session;

/// Event delivery for running commands
pub mod stream;

/// Session configuration and builder
pub mod config;

/// One-shot connect, execute and disconnect
pub mod call;

pub use error::RemctlError;
pub use session::{Session, SessionState};
pub use stream::{CommandOutput, EventStream, Outcome};
pub use config::{SessionBuilder, SessionConfig};
pub use call::{call, call_with_config, CallResult};
pub use remctl_proto::{Command, ErrorCode, Event, OutputStream, ProtocolFailure};
pub use remctl_transport::Transport;

/// Result type alias for remctl operations
pub type Result<T> = std::result::Result<T, RemctlError>;
