//! Scripted in-process command server
//!
//! [`MockTransport`] stands in for an authenticated connection. Each
//! submitted command is handed to a handler that returns the steps the
//! "server" plays back through `next_event`. Every phase can be made to
//! fail, and all calls are recorded for inspection.

use async_trait::async_trait;
use bytes::Bytes;
use crate::{OpenParams, Transport, TransportError};
use remctl_proto::{ErrorCode, RawEvent};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// One step of a scripted server reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockStep {
    /// Yield this event from `next_event`
    Event(RawEvent),
    /// Fail `next_event` with this diagnostic
    Fail(String),
    /// Sleep before producing the following step
    Delay(Duration),
}

impl MockStep {
    /// Standard output chunk
    pub fn stdout(data: impl Into<Bytes>) -> Self {
        Self::Event(RawEvent::Output { stream: 0, data: data.into() })
    }

    /// Standard error chunk
    pub fn stderr(data: impl Into<Bytes>) -> Self {
        Self::Event(RawEvent::Output { stream: 1, data: data.into() })
    }

    /// Exit status
    pub fn status(status: i32) -> Self {
        Self::Event(RawEvent::Status(status))
    }

    /// Server error
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Event(RawEvent::Error { code: code.code(), message: message.into() })
    }

    /// End of stream without a status
    pub fn done() -> Self {
        Self::Event(RawEvent::Done)
    }
}

/// Everything a [`MockTransport`] has been asked to do
#[derive(Debug, Clone, Default)]
pub struct MockRecord {
    /// Parameters of each successful open
    pub opens: Vec<OpenParams>,
    /// Argument vectors of each accepted command
    pub commands: Vec<Vec<String>>,
    /// Number of `next_event` calls
    pub pulls: usize,
    /// Number of `close` calls
    pub closes: usize,
    /// Accepted credential cache
    pub credential_cache: Option<PathBuf>,
    /// Accepted timeout
    pub timeout: Option<Duration>,
}

type Handler = Arc<dyn Fn(&[String]) -> Vec<MockStep> + Send + Sync>;

/// Scripted transport for tests
pub struct MockTransport {
    handler: Handler,
    record: Arc<Mutex<MockRecord>>,
    init_failure: Option<String>,
    open_failures: usize,
    open_delay: Option<Duration>,
    timeout: Option<Duration>,
    send_failures: usize,
    connected: bool,
    pending: VecDeque<MockStep>,
    last_error: Option<String>,
}

impl MockTransport {
    /// Create a transport whose server answers every command via `handler`
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&[String]) -> Vec<MockStep> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            record: Arc::new(Mutex::new(MockRecord::default())),
            init_failure: None,
            open_failures: 0,
            open_delay: None,
            timeout: None,
            send_failures: 0,
            connected: false,
            pending: VecDeque::new(),
            last_error: None,
        }
    }

    /// A small command server.
    ///
    /// * `echo ARGS..` prints its arguments on stdout and exits 0
    /// * `stderr ARGS..` prints its arguments on stderr and exits 0
    /// * `false` exits 1
    /// * `done` ends the stream without a status
    /// * `denied` prints a line, then fails with `ACCESS`
    /// * anything else fails with `UNKNOWN_COMMAND`
    pub fn echo() -> Self {
        Self::new(|args| {
            let Some(verb) = args.first() else {
                return vec![MockStep::error(ErrorCode::BadCommand, "Empty command")];
            };
            let line = || Bytes::from(format!("{}\n", args[1..].join(" ")));
            match verb.as_str() {
                "echo" => vec![MockStep::stdout(line()), MockStep::status(0)],
                "stderr" => vec![MockStep::stderr(line()), MockStep::status(0)],
                "false" => vec![MockStep::status(1)],
                "done" => vec![MockStep::done()],
                "denied" => vec![
                    MockStep::stdout("partial\n"),
                    MockStep::error(ErrorCode::Access, "Access denied"),
                ],
                _ => vec![MockStep::error(ErrorCode::UnknownCommand, "Unknown command")],
            }
        })
    }

    /// Fail `initialize` with `message`
    pub fn with_init_failure(mut self, message: impl Into<String>) -> Self {
        self.init_failure = Some(message.into());
        self
    }

    /// Fail the next `count` opens
    pub fn with_open_failures(mut self, count: usize) -> Self {
        self.open_failures = count;
        self
    }

    /// Take `delay` to establish each connection; a shorter non-zero
    /// timeout makes `open` fail with [`TransportError::Timeout`]
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    /// Fail the next `count` command submissions
    pub fn with_send_failures(mut self, count: usize) -> Self {
        self.send_failures = count;
        self
    }

    /// Shared handle to the call record; stays valid after the transport moves
    pub fn recorder(&self) -> MockRecorder {
        MockRecorder {
            record: Arc::clone(&self.record),
        }
    }

    fn record(&self) -> MutexGuard<'_, MockRecord> {
        lock(&self.record)
    }

    fn fail(&mut self, message: String) -> String {
        self.last_error = Some(message.clone());
        message
    }
}

/// Read access to a [`MockTransport`]'s call record
#[derive(Clone)]
pub struct MockRecorder {
    record: Arc<Mutex<MockRecord>>,
}

impl MockRecorder {
    /// Copy of the record as it stands now
    pub fn snapshot(&self) -> MockRecord {
        lock(&self.record).clone()
    }
}

fn lock(record: &Mutex<MockRecord>) -> MutexGuard<'_, MockRecord> {
    record.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Transport for MockTransport {
    fn initialize(&mut self) -> Result<(), TransportError> {
        match self.init_failure.take() {
            Some(message) => Err(TransportError::Initialization(message)),
            None => Ok(()),
        }
    }

    fn set_credential_cache(&mut self, path: &Path) -> Result<(), TransportError> {
        if !path.exists() {
            let message = self.fail(format!("credential cache {} not found", path.display()));
            return Err(TransportError::Configuration(message));
        }
        self.record().credential_cache = Some(path.to_path_buf());
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), TransportError> {
        self.timeout = Some(timeout).filter(|timeout| !timeout.is_zero());
        self.record().timeout = Some(timeout);
        Ok(())
    }

    async fn open(&mut self, params: &OpenParams) -> Result<(), TransportError> {
        if self.connected {
            return Err(TransportError::Connection("already connected".to_string()));
        }
        if self.open_failures > 0 {
            self.open_failures -= 1;
            let message = self.fail(format!(
                "cannot authenticate to {}: server not found in Kerberos database",
                params.principal_or_default()
            ));
            return Err(TransportError::Authentication(message));
        }

        if let Some(delay) = self.open_delay {
            let handshake = tokio::time::sleep(delay);
            match self.timeout {
                Some(limit) => {
                    if tokio::time::timeout(limit, handshake).await.is_err() {
                        self.fail(format!("timed out connecting to {}:{}", params.host, params.port));
                        return Err(TransportError::Timeout);
                    }
                }
                None => handshake.await,
            }
        }

        debug!("Mock connection to {}:{}", params.host, params.port);
        self.connected = true;
        self.record().opens.push(params.clone());
        Ok(())
    }

    async fn send_command(&mut self, argv: &[Vec<u8>]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        if self.send_failures > 0 {
            self.send_failures -= 1;
            let message = self.fail("error sending token: broken pipe".to_string());
            return Err(TransportError::Protocol(message));
        }

        let args: Vec<String> = argv
            .iter()
            .map(|arg| String::from_utf8_lossy(arg).into_owned())
            .collect();
        self.pending = (self.handler)(&args).into();
        self.record().commands.push(args);
        Ok(())
    }

    async fn next_event(&mut self) -> Result<RawEvent, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.record().pulls += 1;

        loop {
            match self.pending.pop_front() {
                Some(MockStep::Delay(duration)) => tokio::time::sleep(duration).await,
                Some(MockStep::Event(event)) => return Ok(event),
                Some(MockStep::Fail(message)) => {
                    let message = self.fail(message);
                    return Err(TransportError::Protocol(message));
                }
                None => {
                    let message = self.fail("connection closed by server".to_string());
                    return Err(TransportError::Protocol(message));
                }
            }
        }
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }

    async fn close(&mut self) {
        self.connected = false;
        self.pending.clear();
        self.record().closes += 1;
    }
}
