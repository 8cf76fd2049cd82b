//! Shared helpers for remctl integration tests

#![allow(dead_code)]

use remctl::{Command, Session};
use remctl_transport::MockTransport;

/// Install a test-writer subscriber honouring `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Build a command from string literals
pub fn command(args: &[&str]) -> Command {
    Command::new(args.iter().copied()).expect("valid command")
}

/// Open a session against `transport` with protocol defaults
pub async fn open_session(transport: MockTransport) -> anyhow::Result<Session> {
    init_tracing();
    let mut session = Session::new(transport)?;
    session.open("shell.example.org", 0, None).await?;
    Ok(session)
}
