//! Live endpoint cross-check.
//!
//! Fetches a state and its header from a running Berachain beacon node,
//! recomputes the state root with this crate's encoder, and verifies a
//! combined proof against it. The variant list rule is easy to get wrong,
//! so this check should pass against a live node before any release.

use anyhow::{bail, Context, Result};
use clap::Parser;
use proof_gen::beacon_client::BeaconClient;
use proof_gen::gindex::GindexCalculator;
use proof_gen::merkle::verify_proof;
use proof_gen::{generate_combined_proof, ValidatorId};

#[derive(Parser, Debug)]
#[command(name = "live-check")]
#[command(about = "Verify computed roots and proofs against a live beacon node")]
struct Args {
    /// Beacon node URL
    #[arg(long, env = "BEACON_RPC_URL", default_value = "http://localhost:3500")]
    beacon_url: String,

    /// Slot to check ("head", "finalized", or a number)
    #[arg(long, default_value = "finalized")]
    slot: String,

    /// Validator identifier to prove (index or 0x pubkey)
    #[arg(long, default_value = "0")]
    identifier: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let client = BeaconClient::new(args.beacon_url.clone());

    println!("Fetching state {} from {} ...", args.slot, args.beacon_url);
    let state = client
        .get_state(&args.slot)
        .await
        .context("fetching beacon state")?;
    let header = client
        .get_header(&state.slot.to_string())
        .await
        .context("fetching beacon header")?;
    let roots = client
        .get_historical_roots(state.slot)
        .await
        .context("fetching historical roots")?;

    println!("   slot:       {}", state.slot);
    println!("   validators: {}", state.validators.len());

    let id: ValidatorId = args.identifier.parse()?;
    let bundle = generate_combined_proof(&state, &id, Some(&roots))?;

    println!("   node root:  0x{}", hex::encode(header.state_root));
    println!("   our root:   0x{}", hex::encode(bundle.state_root));

    if bundle.state_root != header.state_root {
        bail!("state root mismatch: the encoder disagrees with the node");
    }

    let validator_g = GindexCalculator::validator_gindex(bundle.validator_index);
    if !verify_proof(
        &bundle.validator_leaf,
        GindexCalculator::leaf_index(validator_g),
        &bundle.validator_proof,
        &bundle.state_root,
    ) {
        bail!("validator proof does not fold back to the state root");
    }

    let balance_g = GindexCalculator::balance_chunk_gindex(bundle.validator_index);
    if !verify_proof(
        &bundle.balance_leaf,
        GindexCalculator::leaf_index(balance_g),
        &bundle.balance_proof,
        &bundle.state_root,
    ) {
        bail!("balance proof does not fold back to the state root");
    }

    println!(
        "OK: validator {} proof ({} siblings) and balance proof ({} siblings) verify",
        bundle.validator_index,
        bundle.validator_proof.len(),
        bundle.balance_proof.len()
    );

    Ok(())
}
