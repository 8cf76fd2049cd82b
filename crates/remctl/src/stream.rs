//! Event delivery for running commands

use bytes::{Bytes, BytesMut};
use remctl_proto::{ErrorCode, Event, OutputStream, ProtocolFailure};
use remctl_transport::Transport;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// How a command ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Exit status
    Status(i32),
    /// Protocol or transport error
    Error(ProtocolFailure),
    /// Stream ended without a status
    Done,
}

/// Everything one command produced, gathered by [`EventStream::collect`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Concatenated standard output
    pub stdout: Bytes,
    /// Concatenated standard error
    pub stderr: Bytes,
    /// Terminal event
    pub outcome: Outcome,
}

/// The events of the command currently running on a [`Session`].
///
/// One `EventStream` lives as long as its session and is handed out again
/// by every successful `execute`. Output events arrive in the order the
/// server produced them and are always followed by exactly one terminal
/// event, after which `next_event` returns `None` until the next command.
///
/// The pump feeding the stream pulls the next event from the transport only
/// after the previous one has been received; a slow consumer stalls the
/// pump rather than growing a buffer. A command must be
/// drained to its terminal event before the session accepts another one.
///
/// [`Session`]: crate::Session
pub struct EventStream {
    session_id: Uuid,
    receiver: Option<mpsc::Receiver<Event>>,
    pump: Option<JoinHandle<()>>,
}

impl EventStream {
    pub(crate) fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            receiver: None,
            pump: None,
        }
    }

    /// Whether a command's terminal event is still outstanding
    pub fn is_in_flight(&self) -> bool {
        self.receiver.is_some()
    }

    /// Next event of the running command, or `None` when no command is running.
    ///
    /// Cancel safe: dropping the future loses no event.
    pub async fn next_event(&mut self) -> Option<Event> {
        let receiver = self.receiver.as_mut()?;

        match receiver.recv().await {
            Some(event) => {
                if event.is_terminal() {
                    debug!("Session {} command finished: {:?}", self.session_id, event);
                    self.finish();
                }
                Some(event)
            }
            None => {
                warn!("Session {} event pump stopped without a terminal event", self.session_id);
                self.finish();
                None
            }
        }
    }

    /// Drain the running command, concatenating output per stream.
    ///
    /// Returns `None` if no command is running.
    pub async fn collect(&mut self) -> Option<CommandOutput> {
        if !self.is_in_flight() {
            return None;
        }

        let mut stdout = BytesMut::new();
        let mut stderr = BytesMut::new();

        let outcome = loop {
            match self.next_event().await {
                Some(Event::Output { stream: OutputStream::Stdout, data }) => stdout.extend_from_slice(&data),
                Some(Event::Output { stream: OutputStream::Stderr, data }) => stderr.extend_from_slice(&data),
                Some(Event::Status(status)) => break Outcome::Status(status),
                Some(Event::Error(failure)) => break Outcome::Error(failure),
                Some(Event::Done) => break Outcome::Done,
                None => {
                    break Outcome::Error(ProtocolFailure::new(
                        ErrorCode::NoCode,
                        "event stream ended without a terminal event",
                    ))
                }
            }
        };

        Some(CommandOutput {
            stdout: stdout.freeze(),
            stderr: stderr.freeze(),
            outcome,
        })
    }

    pub(crate) fn start(&mut self, transport: OwnedMutexGuard<Box<dyn Transport>>) {
        let (tx, rx) = mpsc::channel(1);
        let session_id = self.session_id;

        self.receiver = Some(rx);
        self.pump = Some(tokio::spawn(async move {
            pump(session_id, transport, tx).await;
        }));
    }

    /// Stop the pump, if any, and wait until it has released the transport.
    pub(crate) async fn stop(&mut self) {
        self.receiver = None;
        if let Some(pump) = self.pump.take() {
            pump.abort();
            match pump.await {
                Err(e) if e.is_panic() => {
                    error!("Session {} event pump panicked: {}", self.session_id, e);
                }
                _ => debug!("Session {} event pump stopped", self.session_id),
            }
        }
    }

    fn finish(&mut self) {
        self.receiver = None;
        self.pump = None;
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

/// Relay transport events to `tx` until a terminal event has been sent.
///
/// A channel slot is reserved before each pull, so the transport is never
/// read ahead of the consumer. The transport guard is released before the
/// terminal event is published, so by the time a consumer sees it the
/// transport is free for the next command.
async fn pump(
    session_id: Uuid,
    mut transport: OwnedMutexGuard<Box<dyn Transport>>,
    tx: mpsc::Sender<Event>,
) {
    debug!("Session {} event pump started", session_id);

    loop {
        let permit = match tx.reserve().await {
            Ok(permit) => permit,
            Err(_) => {
                debug!("Session {} event stream closed, stopping pump", session_id);
                return;
            }
        };

        let event = match transport.next_event().await {
            Ok(raw) => Event::from(raw),
            Err(e) => {
                let message = transport.last_error().unwrap_or_else(|| e.to_string());
                warn!("Session {} transport failed mid-command: {}", session_id, message);
                Event::Error(ProtocolFailure::new(ErrorCode::NoCode, message))
            }
        };

        if event.is_terminal() {
            drop(transport);
            permit.send(event);
            return;
        }

        permit.send(event);
    }
}
