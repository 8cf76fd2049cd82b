//! Transport abstraction

use async_trait::async_trait;
use crate::TransportError;
use remctl_proto::{default_principal, RawEvent};
use std::path::Path;
use std::time::Duration;

/// Where and as whom to connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenParams {
    /// Server hostname or address
    pub host: String,
    /// Server port, already resolved (never 0)
    pub port: u16,
    /// Server principal; `None` lets the transport pick its default
    pub principal: Option<String>,
}

impl OpenParams {
    /// Principal to authenticate against, falling back to `host/<host>`
    pub fn principal_or_default(&self) -> String {
        self.principal
            .clone()
            .unwrap_or_else(|| default_principal(&self.host))
    }
}

/// An authenticated connection to a remctl server.
///
/// Implementations own the network connection and the security context.
/// A client session drives one transport through `open`, any number of
/// `send_command` / `next_event` rounds, and `close`. Calls are strictly
/// sequential; `next_event` may block for as long as the server takes.
///
/// A session that is dropped without being closed never calls `close`, so
/// implementations must release their connection and security context on
/// drop as well.
#[async_trait]
pub trait Transport: Send {
    /// Allocate any per-connection context. Called once, before anything else.
    fn initialize(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Use the credential cache at `path` instead of the process default
    fn set_credential_cache(&mut self, path: &Path) -> Result<(), TransportError>;

    /// Bound connection establishment by `timeout`; zero disables the bound
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), TransportError>;

    /// Connect and authenticate
    async fn open(&mut self, params: &OpenParams) -> Result<(), TransportError>;

    /// Send one command's argument vector
    async fn send_command(&mut self, argv: &[Vec<u8>]) -> Result<(), TransportError>;

    /// Wait for the next event of the running command
    async fn next_event(&mut self) -> Result<RawEvent, TransportError>;

    /// Diagnostic text of the most recent failure, if the transport keeps one
    fn last_error(&self) -> Option<String>;

    /// Tear down the connection
    async fn close(&mut self);
}
