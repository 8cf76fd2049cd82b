//! Session lifecycle and command submission

use crate::{EventStream, RemctlError, Result};
use remctl_proto::{resolve_port, Command};
use remctl_transport::{OpenParams, Transport};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

type SharedTransport = Arc<Mutex<Box<dyn Transport>>>;

/// Lifecycle state of a [`Session`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, not connected; settings may still change
    Unopened,
    /// Connected and idle
    Open,
    /// A command's terminal event has not been consumed yet
    Executing,
    /// Closed for good
    Closed,
}

/// One authenticated connection to a remctl server.
///
/// ```text
/// Unopened --open--> Open --execute--> Executing --terminal event--> Open
///     any opened state --close--> Closed
/// ```
///
/// Commands run one at a time. `execute` hands back the session's
/// [`EventStream`]; the command's terminal event must be read from it before
/// the next `execute`, which otherwise fails with
/// [`RemctlError::CommandInProgress`].
///
/// Dropping a session stops any running command but does not call
/// [`Transport::close`]; the transport is released through its own `Drop`.
/// Call [`Session::close`] for an orderly shutdown.
pub struct Session {
    /// Session ID used in log output
    id: Uuid,
    /// Transport; `None` once closed
    transport: Option<SharedTransport>,
    /// Whether `open` has succeeded
    state: LinkState,
    /// Parameters of the live connection
    target: Option<OpenParams>,
    /// Credential cache handed to the transport
    credential_cache: Option<PathBuf>,
    /// Connection timeout handed to the transport
    timeout: Option<Duration>,
    /// Events of the running command
    events: EventStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    Unopened,
    Open,
    Closed,
}

impl Session {
    /// Create an unopened session on top of `transport`.
    ///
    /// Fails with [`RemctlError::Initialization`] if the transport cannot set
    /// up its context; the transport is dropped in that case.
    pub fn new<T>(mut transport: T) -> Result<Self>
    where
        T: Transport + 'static,
    {
        transport
            .initialize()
            .map_err(|e| RemctlError::Initialization(e.to_string()))?;

        let id = Uuid::new_v4();
        debug!("Created session {}", id);

        let transport: Box<dyn Transport> = Box::new(transport);
        Ok(Self {
            id,
            transport: Some(Arc::new(Mutex::new(transport))),
            state: LinkState::Unopened,
            target: None,
            credential_cache: None,
            timeout: None,
            events: EventStream::new(id),
        })
    }

    /// Get session ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        match self.state {
            LinkState::Unopened => SessionState::Unopened,
            LinkState::Closed => SessionState::Closed,
            LinkState::Open if self.events.is_in_flight() => SessionState::Executing,
            LinkState::Open => SessionState::Open,
        }
    }

    /// Whether the session is connected
    pub fn is_open(&self) -> bool {
        self.state == LinkState::Open
    }

    /// Parameters of the live connection
    pub fn target(&self) -> Option<&OpenParams> {
        self.target.as_ref()
    }

    /// Credential cache in use, if one was set
    pub fn credential_cache(&self) -> Option<&Path> {
        self.credential_cache.as_deref()
    }

    /// Connection timeout, if one was set
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Authenticate with the credential cache at `path`. Only valid before `open`.
    pub async fn set_credential_cache(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let transport = self.unopened_transport("credential cache")?;

        let mut transport = transport.lock().await;
        transport
            .set_credential_cache(path)
            .map_err(|e| RemctlError::Configuration(e.to_string()))?;
        drop(transport);

        debug!("Session {} using credential cache {}", self.id, path.display());
        self.credential_cache = Some(path.to_path_buf());
        Ok(())
    }

    /// Bound connection establishment by `timeout`. Only valid before `open`.
    pub async fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        let transport = self.unopened_transport("timeout")?;

        let mut transport = transport.lock().await;
        transport
            .set_timeout(timeout)
            .map_err(|e| RemctlError::Configuration(e.to_string()))?;
        drop(transport);

        debug!("Session {} using timeout {:?}", self.id, timeout);
        self.timeout = Some(timeout);
        Ok(())
    }

    /// Connect and authenticate to `host`.
    ///
    /// A `port` of 0 selects the well-known remctl port. Without a
    /// `principal` the transport authenticates to the server's default
    /// principal, `host/<host>`. On failure the session stays unopened and
    /// `open` may be retried.
    pub async fn open(&mut self, host: &str, port: u16, principal: Option<&str>) -> Result<()> {
        match self.state {
            LinkState::Open => return Err(RemctlError::AlreadyOpen),
            LinkState::Closed => return Err(RemctlError::NotOpen),
            LinkState::Unopened => {}
        }
        let transport = self.transport.as_ref().ok_or(RemctlError::NotOpen)?;

        let params = OpenParams {
            host: host.to_string(),
            port: resolve_port(port),
            principal: principal.map(str::to_string),
        };

        info!(
            "Session {} connecting to {}:{} as {}",
            self.id,
            params.host,
            params.port,
            params.principal_or_default()
        );

        let mut transport = transport.lock().await;
        if let Err(e) = transport.open(&params).await {
            let message = e.to_string();
            warn!("Session {} failed to connect: {}", self.id, message);
            return Err(RemctlError::Connection(message));
        }
        drop(transport);

        info!("Session {} connected to {}:{}", self.id, params.host, params.port);
        self.state = LinkState::Open;
        self.target = Some(params);
        Ok(())
    }

    /// Submit `command` and return the stream its events arrive on.
    ///
    /// Submission failures are reported here and leave the session open.
    /// Anything that goes wrong after submission arrives as an
    /// [`Event::Error`](remctl_proto::Event::Error) terminal event instead.
    pub async fn execute(&mut self, command: Command) -> Result<&mut EventStream> {
        if self.state != LinkState::Open {
            return Err(RemctlError::NotOpen);
        }
        if self.events.is_in_flight() {
            return Err(RemctlError::CommandInProgress);
        }
        let transport = self.transport.as_ref().ok_or(RemctlError::NotOpen)?;

        debug!("Session {} executing: {}", self.id, command);

        let mut transport = Arc::clone(transport).lock_owned().await;
        if let Err(e) = transport.send_command(&command.to_argv()).await {
            let message = e.to_string();
            warn!("Session {} failed to submit command: {}", self.id, message);
            return Err(RemctlError::Submission(message));
        }

        self.events.start(transport);
        Ok(&mut self.events)
    }

    /// Events of the running command, for picking up a stream again after
    /// the reference returned by `execute` went out of scope
    pub fn events(&mut self) -> &mut EventStream {
        &mut self.events
    }

    /// Close the connection and release the transport.
    ///
    /// A running command is abandoned. Afterwards every operation fails with
    /// [`RemctlError::NotOpen`]; build a new session to reconnect.
    pub async fn close(&mut self) -> Result<()> {
        if self.state != LinkState::Open {
            return Err(RemctlError::NotOpen);
        }

        if self.events.is_in_flight() {
            warn!("Session {} closing with a command in progress", self.id);
        }
        self.events.stop().await;

        if let Some(transport) = self.transport.take() {
            transport.lock().await.close().await;
        }

        self.state = LinkState::Closed;
        self.target = None;
        info!("Session {} closed", self.id);
        Ok(())
    }

    fn unopened_transport(&self, setting: &str) -> Result<&SharedTransport> {
        match (self.state, self.transport.as_ref()) {
            (LinkState::Unopened, Some(transport)) => Ok(transport),
            (LinkState::Open, _) => Err(RemctlError::Configuration(format!(
                "cannot set {} on an open session",
                setting
            ))),
            _ => Err(RemctlError::Configuration(format!(
                "cannot set {} on a closed session",
                setting
            ))),
        }
    }
}

#[cfg(test)]
mod tests;
