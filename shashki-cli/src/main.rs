//! SHASHKI CLI - Command-line interface
//!
//! Commands:
//! - selfplay: Learning AI against a fixed opponent
//! - moves: Show a position and its legal moves
//! - perft: Count move-tree leaves
//! - reset-weights: Restore default evaluation weights

mod inspect;
mod selfplay;
mod store;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use shashki_core::RuleConfig;

#[derive(Parser)]
#[command(name = "shashki")]
#[command(about = "SHASHKI Russian draughts engine")]
struct Cli {
    /// Seed for reproducible runs
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Learning AI plays a series against a fixed-weights opponent
    Selfplay(selfplay::SelfplayArgs),
    /// Print the board and its legal moves
    Moves(inspect::MovesArgs),
    /// Count leaf nodes of the move tree
    Perft(inspect::PerftArgs),
    /// Reset stored weights to defaults
    ResetWeights(inspect::ResetArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Selfplay(args) => selfplay::run(args, cli.seed),
        Commands::Moves(args) => inspect::run_moves(args),
        Commands::Perft(args) => inspect::run_perft(args),
        Commands::ResetWeights(args) => inspect::run_reset(args),
    }
}

/// Rules from a JSON file, or the Russian defaults
pub(crate) fn load_rules(path: Option<&Path>) -> Result<Arc<RuleConfig>> {
    let rules = match path {
        Some(p) => RuleConfig::load(p)
            .with_context(|| format!("Failed to load rules: {}", p.display()))?,
        None => RuleConfig::russian(),
    };
    Ok(Arc::new(rules))
}
