//! Parlor terminal client.
//!
//! Reads chat lines from stdin and prints server traffic to stdout.
//!
//! # Usage
//!
//! ```bash
//! parlor-term --user alice
//! parlor-term --host chat.example.org --port 5000 --user bob --log-level debug
//! ```
//!
//! `/listar` lists connected users, `/quitar` logs out (the slash is
//! optional). Both are sent exactly as typed. End of input or
//! Ctrl-C logs out and exits.

mod console;

use std::{io, process::ExitCode, time::Duration};

use clap::Parser;
use console::{Console, Input};
use parlor_client::{ClientError, Inbox, Session, SessionConfig};
use parlor_proto::{DEFAULT_HOST, DEFAULT_PORT};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// How often the inbox is drained to the terminal.
const POLL_INTERVAL: Duration = Duration::from_millis(80);

/// Parlor chat client
#[derive(Parser, Debug)]
#[command(name = "parlor-term")]
#[command(about = "Line-mode client for Parlor chat servers")]
#[command(version)]
struct Args {
    /// Server host name or IP address
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT, value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Username sent during the handshake
    #[arg(short, long)]
    user: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Debug, Error)]
enum TermError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "parlor-term failed");
            let _ = Console::new(io::stderr()).notice(&e);
            ExitCode::FAILURE
        },
    }
}

async fn run(args: Args) -> Result<(), TermError> {
    let mut console = Console::new(io::stdout());
    let (mut session, mut inbox) = Session::new(SessionConfig::default());

    console.notice(format_args!("connecting to {}:{} ...", args.host, args.port))?;
    session.connect(&args.host, args.port, args.user.trim()).await?;
    console.notice(format_args!("connected as {}", args.user.trim()))?;

    let result = chat(&mut session, &mut inbox, &mut console).await;

    session.shutdown().await;
    console.show_all(inbox.drain())?;
    result
}

/// Main loop: forward stdin to the session and drain the inbox on a timer.
///
/// Returns when the connection ends, stdin closes, or Ctrl-C arrives.
async fn chat(
    session: &mut Session,
    inbox: &mut Inbox,
    console: &mut Console<io::Stdout>,
) -> Result<(), TermError> {
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut tick = tokio::time::interval(POLL_INTERVAL);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                if console.show_all(inbox.drain())? {
                    return Ok(());
                }
            },

            line = stdin.next_line() => match line? {
                Some(line) => submit(session, console, &line).await?,
                None => {
                    tracing::debug!("stdin closed");
                    return Ok(());
                },
            },

            _ = &mut ctrl_c => {
                tracing::debug!("interrupted");
                return Ok(());
            },
        }
    }
}

async fn submit(
    session: &mut Session,
    console: &mut Console<io::Stdout>,
    line: &str,
) -> Result<(), TermError> {
    let input = Input::classify(line);
    if let Input::Command { command, .. } = input {
        tracing::debug!(%command, "sending control command");
    }
    let Some(text) = input.text() else {
        return Ok(());
    };

    let was_requested = session.disconnect_requested();
    let sent = session.send(text).await;

    match sent {
        Ok(()) if !was_requested && session.disconnect_requested() => {
            console.notice("disconnected")?;
        },
        Ok(()) => {},
        // Send failures are reported and the session stays up.
        Err(e) => console.notice(&e)?,
    }
    Ok(())
}
