//! Session configuration and builder

use crate::{RemctlError, Result, Session};
use remctl_transport::Transport;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Everything needed to open a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Server hostname or address
    pub host: String,
    /// Server port; 0 selects the default remctl port
    pub port: u16,
    /// Server principal; `None` selects `host/<host>`
    pub principal: Option<String>,
    /// Credential cache to authenticate with
    pub credential_cache: Option<PathBuf>,
    /// Connection establishment timeout
    pub timeout: Option<Duration>,
}

/// Session builder for configuring connections
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    config: SessionConfig,
}

impl SessionBuilder {
    /// Create a new session builder for `host` on the default port
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            config: SessionConfig {
                host: host.into(),
                port: 0,
                principal: None,
                credential_cache: None,
                timeout: None,
            },
        }
    }

    /// Create a builder from a `host[:port]` target string
    pub fn from_target(target: &str) -> Result<Self> {
        let (host, port) = Self::parse_target(target)?;
        Ok(Self::new(host).with_port(port))
    }

    /// Parse a target string into host and port.
    ///
    /// Format: `host`, `host:port`, or `[v6addr]:port`. A missing port is
    /// returned as 0.
    pub fn parse_target(target: &str) -> Result<(String, u16)> {
        let (host, port) = if let Some(rest) = target.strip_prefix('[') {
            let (host, rest) = rest
                .split_once(']')
                .ok_or_else(|| RemctlError::InvalidTarget(format!("unterminated '[' in {:?}", target)))?;
            match rest {
                "" => (host, None),
                _ => match rest.strip_prefix(':') {
                    Some(port) => (host, Some(port)),
                    None => {
                        return Err(RemctlError::InvalidTarget(format!(
                            "unexpected text after address in {:?}",
                            target
                        )))
                    }
                },
            }
        } else {
            match target.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (target, None),
            }
        };

        if host.is_empty() {
            return Err(RemctlError::InvalidTarget("must specify host".to_string()));
        }

        let port = match port {
            Some(port) => port
                .parse::<u16>()
                .map_err(|e| RemctlError::InvalidTarget(format!("bad port {:?}: {}", port, e)))?,
            None => 0,
        };

        Ok((host.to_string(), port))
    }

    /// Set server port
    pub fn with_port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set server principal
    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.config.principal = Some(principal.into());
        self
    }

    /// Set credential cache path
    pub fn with_credential_cache(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.credential_cache = Some(path.into());
        self
    }

    /// Set connection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Build the session configuration
    pub fn build_config(self) -> SessionConfig {
        self.config
    }

    /// Create a session on `transport`, apply the settings, and open it
    pub async fn connect<T>(self, transport: T) -> Result<Session>
    where
        T: Transport + 'static,
    {
        self.config.connect(transport).await
    }
}

impl SessionConfig {
    /// Create a session on `transport`, apply the settings, and open it
    pub async fn connect<T>(&self, transport: T) -> Result<Session>
    where
        T: Transport + 'static,
    {
        debug!("Connecting session with {:?}", self);

        let mut session = Session::new(transport)?;
        if let Some(path) = &self.credential_cache {
            session.set_credential_cache(path).await?;
        }
        if let Some(timeout) = self.timeout {
            session.set_timeout(timeout).await?;
        }
        session
            .open(&self.host, self.port, self.principal.as_deref())
            .await?;

        Ok(session)
    }
}
