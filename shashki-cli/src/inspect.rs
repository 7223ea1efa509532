//! Inspection commands - legal moves, perft and weight reset

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use shashki_core::{BoardSnapshot, EvaluationModel, MoveRecord, PositionState};

use crate::store::JsonFileStore;

// ============================================================================
// COMMAND ARGUMENTS
// ============================================================================

#[derive(Args)]
pub struct MovesArgs {
    /// Snapshot text "<1|0>|c0,c1,..." (start position if omitted)
    #[arg(long)]
    pub state: Option<String>,

    /// Rule variant JSON file
    #[arg(long, value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct PerftArgs {
    #[arg(long, default_value = "4")]
    pub depth: u32,

    /// Rule variant JSON file
    #[arg(long, value_name = "FILE")]
    pub rules: Option<PathBuf>,
}

#[derive(Args)]
pub struct ResetArgs {
    /// Weights JSON file to reset
    #[arg(long, value_name = "FILE")]
    pub weights: PathBuf,
}

// ============================================================================
// COMMANDS
// ============================================================================

pub fn run_moves(args: MovesArgs) -> Result<()> {
    let rules = crate::load_rules(args.rules.as_deref())?;
    let mut state = PositionState::new(rules)?;
    if let Some(text) = &args.state {
        let snapshot: BoardSnapshot = text.parse().context("Failed to parse --state")?;
        state.import_snapshot(&snapshot);
    }

    let records: Vec<MoveRecord> = state.legal_moves().into_iter().map(MoveRecord::from).collect();

    if args.json {
        #[derive(Serialize)]
        struct JsonOutput {
            snapshot: String,
            side_to_move: String,
            result: String,
            moves: Vec<MoveRecord>,
        }

        let output = JsonOutput {
            snapshot: state.export_snapshot().to_string(),
            side_to_move: format!("{:?}", state.side_to_move()),
            result: format!("{:?}", state.result()),
            moves: records,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", state.board());
        println!("{:?} to move, {} legal moves", state.side_to_move(), records.len());
        for mv in state.legal_moves() {
            println!("  {:<12} {}", mv.to_string(), MoveRecord::from(mv));
        }
    }

    Ok(())
}

pub fn run_perft(args: PerftArgs) -> Result<()> {
    let rules = crate::load_rules(args.rules.as_deref())?;
    let state = PositionState::new(rules)?;

    for depth in 1..=args.depth {
        let start = Instant::now();
        let nodes = state.perft(depth);
        let elapsed = start.elapsed();
        println!("perft({}) = {:>12}  ({:.2?})", depth, nodes, elapsed);
    }

    Ok(())
}

pub fn run_reset(args: ResetArgs) -> Result<()> {
    let store = JsonFileStore::open(&args.weights)?;
    let path = store.path().to_path_buf();
    let mut model = EvaluationModel::load(Box::new(store));
    model.reset()?;

    tracing::info!("Reset weights at {} to defaults", path.display());
    Ok(())
}
