use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use liveclass_client::{
    RtcConnector, Session, SessionConfig, SessionError, Status, SyntheticDevices, WsRelay,
};
use liveclass_core::utils::{DEFAULT_RELAY_BIND, DEFAULT_RELAY_URL};
use liveclass_relay::{RELAY_BIND_ENV, RelayConfig};

#[derive(Parser)]
#[command(name = "cargo-liveclass")]
#[command(bin_name = "cargo-liveclass")]
enum Cli {
    Liveclass(LiveclassArgs),
}

#[derive(clap::Args)]
struct LiveclassArgs {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the room relay.
    Relay {
        #[arg(long, env = RELAY_BIND_ENV, default_value = DEFAULT_RELAY_BIND)]
        bind: String,
    },
    /// Join a room with synthetic media and report what happens.
    Peer {
        #[arg(long, env = "LIVECLASS_SIGNALING_URL", default_value = DEFAULT_RELAY_URL)]
        url: String,

        #[arg(long)]
        room: String,

        /// Place the call once joined.
        #[arg(long)]
        call: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Cli::Liveclass(args) = Cli::parse();

    match args.command {
        Commands::Relay { bind } => {
            let config = RelayConfig::new(&bind)?;
            println!(
                "{}",
                format!("📡 Relay starting on ws://{}/ws", config.bind).green().bold()
            );
            liveclass_relay::serve(config)
                .await
                .context("Relay stopped")?;
        }
        Commands::Peer { url, room, call } => run_peer(url, room, call).await?,
    }

    Ok(())
}

async fn run_peer(url: String, room: String, call: bool) -> Result<()> {
    let config = SessionConfig::from_env().with_relay_url(url);
    let session = Session::new(
        config,
        Arc::new(WsRelay::new()),
        Arc::new(RtcConnector::new()),
        Arc::new(SyntheticDevices::new()),
    );

    let mut status = session.status();
    let mut errors = session.errors();
    let mut remote = session.remote_stream();

    println!("{}", format!("🚪 Joining room '{}'...", room).cyan());
    session
        .join(room.as_str())
        .await
        .context("Failed to join room")?;

    if call {
        println!("{}", "📞 Calling...".cyan());
        session.call().await.context("Failed to place call")?;
    }

    loop {
        tokio::select! {
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                print_status(current);
                if current == Status::Closed {
                    break;
                }
            }
            error = errors.recv() => {
                if let Ok(error) = error {
                    print_error(&error);
                }
            }
            changed = remote.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(stream) = remote.borrow_and_update().as_ref() {
                    println!(
                        "   🎥 Remote stream {} ({} track(s))",
                        stream.stream_id,
                        stream.tracks.len()
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "👋 Hanging up...".yellow());
                break;
            }
        }
    }

    session.hangup().await;
    println!("{}", "✨ Session closed".green().bold());
    Ok(())
}

fn print_status(status: Status) {
    let label = status.to_string();
    let label = match status {
        Status::Connected => label.green().bold(),
        Status::Closed => label.red(),
        _ => label.cyan(),
    };
    println!("   status: {}", label);
}

fn print_error(error: &SessionError) {
    eprintln!("   {} {}", "error:".red().bold(), error);
}
