//! One-shot connect, execute and disconnect

use crate::{Outcome, Result, Session, SessionConfig};
use bytes::Bytes;
use remctl_proto::{Command, ErrorCode, ProtocolFailure};
use remctl_transport::Transport;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Output and exit status of a command run with [`call`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResult {
    /// Standard output
    pub stdout: Bytes,
    /// Standard error
    pub stderr: Bytes,
    /// Exit status; 0 when the server ended the stream without one
    pub status: i32,
}

impl CallResult {
    /// Standard output as text, replacing invalid UTF-8
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Standard error as text, replacing invalid UTF-8
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Run one command on `host` and return everything it printed.
///
/// `port` 0 and `principal` `None` select the protocol defaults. Any
/// failure, including a protocol error reported by the server, is returned
/// as an error and whatever output arrived before it is discarded.
pub async fn call<T>(
    transport: T,
    host: &str,
    port: u16,
    principal: Option<&str>,
    command: Command,
) -> Result<CallResult>
where
    T: Transport + 'static,
{
    let mut session = Session::new(transport)?;
    session.open(host, port, principal).await?;
    run(session, command).await
}

/// Like [`call`], with credential cache and timeout taken from `config`
pub async fn call_with_config<T>(
    transport: T,
    config: &SessionConfig,
    command: Command,
) -> Result<CallResult>
where
    T: Transport + 'static,
{
    let session = config.connect(transport).await?;
    run(session, command).await
}

async fn run(mut session: Session, command: Command) -> Result<CallResult> {
    let output = match session.execute(command).await {
        Ok(events) => events.collect().await,
        Err(e) => {
            if let Err(close_err) = session.close().await {
                warn!("Failed to close session {}: {}", session.id(), close_err);
            }
            return Err(e);
        }
    };

    session.close().await?;

    let output = output.ok_or_else(|| {
        ProtocolFailure::new(ErrorCode::NoCode, "command produced no events")
    })?;

    let status = match output.outcome {
        Outcome::Status(status) => status,
        Outcome::Done => 0,
        Outcome::Error(failure) => return Err(failure.into()),
    };

    Ok(CallResult {
        stdout: output.stdout,
        stderr: output.stderr,
        status,
    })
}
