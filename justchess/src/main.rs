//! justchess: recover, replay and play chess games from the terminal.
//!
//! - `recover` runs PGN text through the staged recovery parser and prints the
//!   validated move list.
//! - `replay` steps through a recovered game one ply at a time.
//! - `play` starts a shared-board game or a game against a machine opponent.
//!
//! Runtime tunables are read from `JUSTCHESS_*` environment variables (see
//! [`config`]); flags override them.

use std::path::PathBuf;

use chess::PlayerSide;
use clap::{Parser, Subcommand};

mod config;
mod logging;
mod play;
mod recover;
mod replay;

#[derive(Parser)]
#[command(name = "justchess", about = "Chess game recovery, replay and play")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recover a move list from possibly malformed PGN text.
    Recover {
        /// PGN file; reads stdin when omitted or `-`.
        input: Option<PathBuf>,
        /// Print the recovered game as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Step through a recovered game.
    Replay {
        /// PGN file.
        file: PathBuf,
    },
    /// Play a game with moves read from stdin (SAN or coordinates).
    Play {
        /// Play against the machine instead of a second person.
        #[arg(long)]
        vs_machine: bool,
        /// Side the human plays against the machine.
        #[arg(long, default_value = "white")]
        side: PlayerSide,
        /// Engine skill level, 0-20.
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=20))]
        skill: Option<u8>,
        /// Machine opponent backend.
        #[arg(long, value_enum)]
        engine: Option<config::EngineKind>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log_path = config::get_log_path();
    let _guard = logging::init(log_path.as_deref())?;
    tracing::debug!("justchess starting");

    match cli.command {
        Commands::Recover { input, json } => recover::run(input.as_deref(), json),
        Commands::Replay { file } => replay::run(&file).await,
        Commands::Play {
            vs_machine,
            side,
            skill,
            engine,
        } => {
            play::run(play::PlayOptions {
                vs_machine,
                side,
                skill: skill.unwrap_or_else(config::get_skill_level),
                engine: engine.unwrap_or_else(config::get_engine_kind),
            })
            .await
        }
    }
}
