//! Bera Proofs Service
//!
//! REST API for generating Berachain beacon state Merkle proofs.

mod api;
mod state;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "bera-proofs-service")]
#[command(about = "Merkle proof API for the Berachain beacon state")]
struct Args {
    /// Beacon node URL
    #[arg(long, env = "BEACON_RPC_URL", default_value = "http://localhost:3500")]
    beacon_url: String,

    /// API listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8000")]
    listen: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    tracing::info!("Starting bera-proofs service");
    tracing::info!(beacon_url = %args.beacon_url, "Beacon node");
    tracing::info!(listen = %args.listen, "API server");

    let app_state =
        state::AppState::new(proof_gen::beacon_client::BeaconClient::new(&args.beacon_url));

    let api_handle = tokio::spawn(api::run_server(args.listen.clone(), app_state));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal");
        }
        result = api_handle => {
            if let Err(e) = result {
                tracing::error!(error = %e, "API server error");
            }
        }
    }

    Ok(())
}
