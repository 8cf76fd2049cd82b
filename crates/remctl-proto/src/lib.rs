//! # remctl protocol model
//!
//! Command and event types shared by the remctl client core and its
//! transport implementations.

#![warn(missing_docs)]

/// Command argument vectors
pub mod command;

/// Events produced while a command runs
pub mod event;

/// Error types for the protocol model
pub mod error;

pub use command::Command;
pub use event::{ErrorCode, Event, OutputStream, ProtocolFailure, RawEvent};
pub use error::CommandError;

/// Well-known TCP port of a remctl server.
pub const DEFAULT_PORT: u16 = 4373;

/// Service name used to build the default server principal.
pub const DEFAULT_SERVICE: &str = "host";

/// Resolve a requested port, mapping `0` to [`DEFAULT_PORT`].
pub fn resolve_port(port: u16) -> u16 {
    if port == 0 {
        DEFAULT_PORT
    } else {
        port
    }
}

/// Principal a server is assumed to hold when the caller does not name one.
pub fn default_principal(host: &str) -> String {
    format!("{}/{}", DEFAULT_SERVICE, host)
}
