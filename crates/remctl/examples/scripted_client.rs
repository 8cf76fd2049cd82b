//! Drive a session against the scripted in-process server.
//!
//! Usage: `cargo run --example scripted_client -- [-s principal] [-t secs] <host[:port]> <command> [args...]`
//!
//! Try `echo hello`, `stderr oops`, `false`, `denied` or `done`.

use clap::Parser;
use remctl::{Command, Event, OutputStream, SessionBuilder};
use remctl_transport::MockTransport;
use std::error::Error;
use std::io::Write;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "scripted_client")]
#[command(about = "Run a command through a remctl session against the scripted server")]
struct Cli {
    /// Service principal (default host/<hostname>)
    #[arg(short = 's')]
    principal: Option<String>,

    /// Connection timeout in seconds; 0 disables it
    #[arg(short = 't', default_value_t = 0)]
    timeout: u64,

    /// Server as host or host:port
    target: String,

    /// Command and its arguments
    #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut builder = SessionBuilder::from_target(&cli.target)?;
    if let Some(principal) = cli.principal {
        builder = builder.with_principal(principal);
    }
    if cli.timeout > 0 {
        builder = builder.with_timeout(Duration::from_secs(cli.timeout));
    }

    let mut session = builder.connect(MockTransport::echo()).await?;
    let events = session.execute(Command::new(cli.command)?).await?;

    let mut exit = 0;
    while let Some(event) = events.next_event().await {
        match event {
            Event::Output { stream: OutputStream::Stdout, data } => std::io::stdout().write_all(&data)?,
            Event::Output { stream: OutputStream::Stderr, data } => std::io::stderr().write_all(&data)?,
            Event::Status(status) => exit = status,
            Event::Error(failure) => {
                eprintln!("{}", failure.message);
                exit = 255;
            }
            Event::Done => {}
        }
    }

    session.close().await?;
    std::process::exit(exit);
}
