//! Transport error types

use thiserror::Error;

/// Transport-specific errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// Library or context setup failed
    #[error("Initialization failed: {0}")]
    Initialization(String),

    /// Connection establishment failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// Mutual authentication failed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Connection establishment exceeded the configured timeout
    #[error("Operation timed out")]
    Timeout,

    /// Malformed or unexpected protocol traffic
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Rejected configuration value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Operation needs an open connection
    #[error("Not connected")]
    NotConnected,
}
