//! Broadside CLI - terminal client for a two-player naval grid duel.
//!
//! This is the main binary entry point. See the `broadside` library
//! for the core functionality.

use anyhow::Result;
use broadside::{console, Config, GameController, SessionConnection};
use mimalloc::MiMalloc;

/// Global allocator configured per M-MIMALLOC-APPS guideline.
/// mimalloc provides better multi-threaded performance than the system allocator.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

// CLI
#[derive(Parser)]
#[command(name = "broadside")]
#[command(version)]
#[command(about = "Terminal client for a two-player naval grid duel")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to a game server and play from the terminal
    Play {
        /// WebSocket URL of the game server
        #[arg(long)]
        server_url: Option<String>,
        /// Delay between reconnect attempts, in milliseconds
        #[arg(long)]
        reconnect_delay_ms: Option<u64>,
        /// Grow the reconnect delay exponentially instead of keeping it fixed
        #[arg(long)]
        backoff: bool,
        /// Stop reconnecting after this many attempts (0 retries forever)
        #[arg(long)]
        max_reconnect_attempts: Option<u32>,
    },
    /// Print the effective configuration as JSON
    Config,
}

/// Run a play session synchronously, blocking on a tokio runtime.
fn run_play(config: Config) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async { play_async(config).await })
}

/// Core async wiring: session connection, game controller, console.
///
/// The console owns the intent sender; when it returns (quit command or
/// stdin EOF) the intent channel closes, the controller loop drains and
/// exits, and dropping the controller shuts the session down.
async fn play_async(config: Config) -> Result<()> {
    println!("Connecting to {}...", config.server_url);

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (intents_tx, intents_rx) = mpsc::unbounded_channel();
    let (frames_tx, frames_rx) = mpsc::unbounded_channel();

    let connection = SessionConnection::open(config.session_config(), events_tx);
    let controller = GameController::new(connection, config.controller_config());
    let controller_task = tokio::spawn(controller.run(intents_rx, events_rx, frames_tx));

    console::run_console(intents_tx, frames_rx).await;

    controller_task.await?;
    println!("Goodbye.");
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            server_url,
            reconnect_delay_ms,
            backoff,
            max_reconnect_attempts,
        } => {
            let mut config = Config::load();
            if let Some(url) = server_url {
                config.server_url = url;
            }
            if let Some(ms) = reconnect_delay_ms {
                config.reconnect_delay_ms = ms;
            }
            if backoff {
                config.reconnect_backoff = true;
            }
            if let Some(attempts) = max_reconnect_attempts {
                config.reconnect_max_attempts = attempts;
            }
            run_play(config)?;
        }
        Commands::Config => {
            let config = Config::load();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
