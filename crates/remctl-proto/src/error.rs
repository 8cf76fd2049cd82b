//! Error types for the protocol model

use thiserror::Error;

/// Reasons a command argument vector is rejected before submission
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// No arguments were given
    #[error("command must have at least one argument")]
    Empty,

    /// An argument contains a NUL byte
    #[error("argument {index} contains an embedded NUL byte")]
    EmbeddedNul {
        /// Position of the offending argument
        index: usize,
    },
}
