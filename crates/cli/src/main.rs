//! Bera Proofs CLI
//!
//! Script-friendly proof generation from local beacon state JSON files.
//! Prints the proof bundle as pretty JSON on stdout.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use proof_gen::loader::{parse_hex32, state_from_json};
use proof_gen::{
    generate_balance_proof, generate_combined_proof, generate_validator_proof, BeaconState,
    HistoricalRoots, ValidatorId,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "bera-proofs")]
#[command(about = "Generate Merkle proofs for the Berachain beacon state")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prove a validator record against the state root
    Validator(ProofArgs),
    /// Prove a validator's balance against the state root
    Balance(ProofArgs),
    /// Generate validator and balance proofs from one mutated state
    Combined(ProofArgs),
}

#[derive(clap::Args, Debug)]
struct ProofArgs {
    /// Validator index (decimal) or BLS pubkey (0x-prefixed, 96 hex chars)
    identifier: String,

    /// Path to the state JSON (bare state or beacon API envelope)
    #[arg(long)]
    state_file: PathBuf,

    /// Snapshot taken eight slots earlier; the historical roots are derived
    /// from it
    #[arg(long, conflicts_with_all = ["prev_state_root", "prev_block_root"])]
    historical_state_file: Option<PathBuf>,

    /// Explicit state root from eight slots ago (0x-prefixed hex)
    #[arg(long, requires = "prev_block_root")]
    prev_state_root: Option<String>,

    /// Explicit block root from eight slots ago (0x-prefixed hex)
    #[arg(long, requires = "prev_state_root")]
    prev_block_root: Option<String>,
}

fn load_state(path: &Path) -> Result<BeaconState> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let state =
        state_from_json(&json).with_context(|| format!("parsing {}", path.display()))?;
    Ok(state)
}

fn resolve_roots(args: &ProofArgs) -> Result<HistoricalRoots> {
    if let (Some(state_root), Some(block_root)) = (&args.prev_state_root, &args.prev_block_root) {
        return Ok(HistoricalRoots {
            state_root: parse_hex32(state_root).context("parsing --prev-state-root")?,
            block_root: parse_hex32(block_root).context("parsing --prev-block-root")?,
        });
    }
    let Some(path) = &args.historical_state_file else {
        bail!(
            "historical roots required: pass --historical-state-file, or both \
             --prev-state-root and --prev-block-root"
        );
    };
    let snapshot = load_state(path)?;
    HistoricalRoots::derive_from_snapshot(&snapshot)
        .context("deriving historical roots from snapshot")
}

fn run(args: Args) -> Result<String> {
    let proof_args = match &args.command {
        Command::Validator(a) | Command::Balance(a) | Command::Combined(a) => a,
    };

    let state = load_state(&proof_args.state_file)?;
    let roots = resolve_roots(proof_args)?;
    let id: ValidatorId = proof_args.identifier.parse()?;

    tracing::info!(
        slot = state.slot,
        validators = state.validators.len(),
        "Loaded beacon state"
    );

    let output = match &args.command {
        Command::Validator(_) => {
            serde_json::to_string_pretty(&generate_validator_proof(&state, &id, Some(&roots))?)?
        }
        Command::Balance(_) => {
            serde_json::to_string_pretty(&generate_balance_proof(&state, &id, Some(&roots))?)?
        }
        Command::Combined(_) => {
            serde_json::to_string_pretty(&generate_combined_proof(&state, &id, Some(&roots))?)?
        }
    };
    Ok(output)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let output = run(args)?;
    println!("{output}");
    Ok(())
}
