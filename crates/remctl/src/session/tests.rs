//! Unit tests for session lifecycle

use super::*;
use remctl_proto::{ErrorCode, Event, OutputStream, DEFAULT_PORT};
use remctl_transport::{MockStep, MockTransport};
use std::time::Duration;

fn command(args: &[&str]) -> Command {
    Command::new(args.iter().copied()).unwrap()
}

async fn open_session(transport: MockTransport) -> Session {
    let mut session = Session::new(transport).unwrap();
    session.open("shell.example.org", 0, None).await.unwrap();
    session
}

#[test]
fn test_initialization_failure() {
    let result = Session::new(MockTransport::echo().with_init_failure("cannot allocate context"));
    match result {
        Err(RemctlError::Initialization(message)) => assert!(message.contains("cannot allocate context")),
        Err(other) => panic!("Expected Initialization error, got {:?}", other),
        Ok(_) => panic!("Expected Initialization error"),
    }
}

#[test]
fn test_new_session_is_unopened() {
    let session = Session::new(MockTransport::echo()).unwrap();
    assert_eq!(session.state(), SessionState::Unopened);
    assert!(!session.is_open());
    assert!(session.target().is_none());
}

#[tokio::test]
async fn test_open_uses_protocol_defaults() {
    let transport = MockTransport::echo();
    let recorder = transport.recorder();
    let session = open_session(transport).await;

    assert_eq!(session.state(), SessionState::Open);
    let target = session.target().unwrap();
    assert_eq!(target.port, DEFAULT_PORT);
    assert_eq!(target.principal, None);
    assert_eq!(target.principal_or_default(), "host/shell.example.org");
    assert_eq!(recorder.snapshot().opens.len(), 1);
}

#[tokio::test]
async fn test_open_with_explicit_port_and_principal() {
    let transport = MockTransport::echo();
    let recorder = transport.recorder();
    let mut session = Session::new(transport).unwrap();

    session
        .open("shell.example.org", 4444, Some("service/remctl"))
        .await
        .unwrap();

    let open = &recorder.snapshot().opens[0];
    assert_eq!(open.port, 4444);
    assert_eq!(open.principal.as_deref(), Some("service/remctl"));
}

#[tokio::test]
async fn test_open_twice_fails() {
    let mut session = open_session(MockTransport::echo()).await;
    let result = session.open("shell.example.org", 0, None).await;
    assert!(matches!(result, Err(RemctlError::AlreadyOpen)));
    assert_eq!(session.state(), SessionState::Open);
}

#[tokio::test]
async fn test_open_failure_is_retryable() {
    let mut session = Session::new(MockTransport::echo().with_open_failures(1)).unwrap();

    match session.open("shell.example.org", 0, None).await {
        Err(RemctlError::Connection(message)) => assert!(message.contains("Kerberos")),
        other => panic!("Expected Connection error, got {:?}", other.map(|_| ())),
    }
    assert_eq!(session.state(), SessionState::Unopened);

    // Still configurable, then a second attempt succeeds
    session.set_timeout(Duration::from_secs(3)).await.unwrap();
    session.open("shell.example.org", 0, None).await.unwrap();
    assert_eq!(session.state(), SessionState::Open);
}

#[tokio::test]
async fn test_close_then_close_again() {
    let transport = MockTransport::echo();
    let recorder = transport.recorder();
    let mut session = open_session(transport).await;

    session.close().await.unwrap();
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(recorder.snapshot().closes, 1);

    assert!(matches!(session.close().await, Err(RemctlError::NotOpen)));
    assert_eq!(recorder.snapshot().closes, 1);
}

#[tokio::test]
async fn test_close_unopened_fails() {
    let mut session = Session::new(MockTransport::echo()).unwrap();
    assert!(matches!(session.close().await, Err(RemctlError::NotOpen)));
    assert_eq!(session.state(), SessionState::Unopened);
}

#[tokio::test]
async fn test_everything_fails_after_close() {
    let mut session = open_session(MockTransport::echo()).await;
    session.close().await.unwrap();

    assert!(matches!(
        session.open("shell.example.org", 0, None).await,
        Err(RemctlError::NotOpen)
    ));
    assert!(matches!(
        session.execute(command(&["echo", "hi"])).await,
        Err(RemctlError::NotOpen)
    ));
    assert!(matches!(
        session.set_timeout(Duration::from_secs(1)).await,
        Err(RemctlError::Configuration(_))
    ));
    assert!(session.events().next_event().await.is_none());
}

#[tokio::test]
async fn test_set_timeout_after_open_fails() {
    let transport = MockTransport::echo();
    let recorder = transport.recorder();
    let mut session = open_session(transport).await;

    let result = session.set_timeout(Duration::from_secs(1)).await;
    assert!(matches!(result, Err(RemctlError::Configuration(_))));
    assert_eq!(session.timeout(), None);
    assert_eq!(recorder.snapshot().timeout, None);

    // The live connection is unaffected
    let output = session
        .execute(command(&["echo", "still", "works"]))
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();
    assert_eq!(&output.stdout[..], b"still works\n");
}

#[tokio::test]
async fn test_set_credential_cache() {
    let cache = tempfile::NamedTempFile::new().unwrap();
    let mut session = Session::new(MockTransport::echo()).unwrap();

    let result = session.set_credential_cache("/nonexistent/krb5cc").await;
    assert!(matches!(result, Err(RemctlError::Configuration(_))));
    assert_eq!(session.credential_cache(), None);

    session.set_credential_cache(cache.path()).await.unwrap();
    assert_eq!(session.credential_cache(), Some(cache.path()));

    session.open("shell.example.org", 0, None).await.unwrap();
    let result = session.set_credential_cache(cache.path()).await;
    assert!(matches!(result, Err(RemctlError::Configuration(_))));
}

#[tokio::test]
async fn test_execute_before_open_fails() {
    let mut session = Session::new(MockTransport::echo()).unwrap();
    let result = session.execute(command(&["echo", "hi"])).await;
    assert!(matches!(result, Err(RemctlError::NotOpen)));
}

#[tokio::test]
async fn test_state_follows_terminal_event() {
    let mut session = open_session(MockTransport::echo()).await;

    let events = session.execute(command(&["echo", "hi"])).await.unwrap();
    assert!(matches!(events.next_event().await, Some(Event::Output { .. })));
    assert_eq!(session.state(), SessionState::Executing);

    assert_eq!(session.events().next_event().await, Some(Event::Status(0)));
    assert_eq!(session.state(), SessionState::Open);
    assert_eq!(session.events().next_event().await, None);
}

#[tokio::test]
async fn test_execute_while_executing_fails() {
    let transport = MockTransport::new(|_| {
        vec![
            MockStep::stdout("one\n"),
            MockStep::stdout("two\n"),
            MockStep::stdout("three\n"),
            MockStep::status(0),
        ]
    });
    let recorder = transport.recorder();
    let mut session = open_session(transport).await;

    session.execute(command(&["count"])).await.unwrap();
    let second = session.execute(command(&["count"])).await;
    assert!(matches!(second, Err(RemctlError::CommandInProgress)));
    assert_eq!(recorder.snapshot().commands.len(), 1);

    // The first command's stream is intact
    let output = session.events().collect().await.unwrap();
    assert_eq!(&output.stdout[..], b"one\ntwo\nthree\n");
    assert_eq!(output.outcome, crate::Outcome::Status(0));

    session.execute(command(&["count"])).await.unwrap();
}

#[tokio::test]
async fn test_submission_failure_keeps_session_open() {
    let transport = MockTransport::echo().with_send_failures(1);
    let mut session = open_session(transport).await;

    match session.execute(command(&["echo", "hi"])).await {
        Err(RemctlError::Submission(message)) => assert!(message.contains("broken pipe")),
        other => panic!("Expected Submission error, got {:?}", other.map(|_| ())),
    }
    assert_eq!(session.state(), SessionState::Open);

    let output = session
        .execute(command(&["echo", "hi"]))
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();
    assert_eq!(&output.stdout[..], b"hi\n");
}

#[tokio::test]
async fn test_close_while_executing() {
    let transport = MockTransport::new(|_| {
        vec![
            MockStep::stdout("a"),
            MockStep::stdout("b"),
            MockStep::Delay(Duration::from_secs(3600)),
            MockStep::status(0),
        ]
    });
    let recorder = transport.recorder();
    let mut session = open_session(transport).await;

    let events = session.execute(command(&["slow"])).await.unwrap();
    assert_eq!(
        events.next_event().await,
        Some(Event::Output {
            stream: OutputStream::Stdout,
            data: bytes::Bytes::from_static(b"a"),
        })
    );

    tokio::time::timeout(Duration::from_secs(5), session.close())
        .await
        .expect("close hung on a running command")
        .unwrap();

    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(recorder.snapshot().closes, 1);
}

#[tokio::test]
async fn test_transport_failure_becomes_nocode_error() {
    let transport = MockTransport::new(|_| vec![MockStep::Fail("connection reset by peer".to_string())]);
    let mut session = open_session(transport).await;

    let events = session.execute(command(&["anything"])).await.unwrap();
    match events.next_event().await {
        Some(Event::Error(failure)) => {
            assert_eq!(failure.code, ErrorCode::NoCode);
            assert_eq!(failure.message, "connection reset by peer");
        }
        other => panic!("Expected NOCODE error, got {:?}", other),
    }
    assert_eq!(events.next_event().await, None);
    assert_eq!(session.state(), SessionState::Open);
}

#[tokio::test]
async fn test_open_times_out() {
    let transport = MockTransport::echo().with_open_delay(Duration::from_millis(200));
    let mut session = Session::new(transport).unwrap();
    session.set_timeout(Duration::from_millis(20)).await.unwrap();

    match session.open("shell.example.org", 0, None).await {
        Err(RemctlError::Connection(message)) => assert_eq!(message, "Operation timed out"),
        other => panic!("Expected Connection error, got {:?}", other.map(|_| ())),
    }
    assert_eq!(session.state(), SessionState::Unopened);
}

#[tokio::test]
async fn test_open_without_timeout_waits() {
    let transport = MockTransport::echo().with_open_delay(Duration::from_millis(20));
    let session = open_session(transport).await;
    assert_eq!(session.state(), SessionState::Open);
}

#[tokio::test]
async fn test_drop_stops_command_without_closing() {
    let transport = MockTransport::new(|_| {
        vec![
            MockStep::stdout("a"),
            MockStep::Delay(Duration::from_secs(3600)),
            MockStep::status(0),
        ]
    });
    let recorder = transport.recorder();
    let mut session = open_session(transport).await;

    let events = session.execute(command(&["slow"])).await.unwrap();
    assert!(events.next_event().await.is_some());
    drop(session);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let record = recorder.snapshot();
    assert_eq!(record.closes, 0);
    assert_eq!(record.pulls, 2);
}
