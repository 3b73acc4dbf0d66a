//! Beacon API HTTP client.
//!
//! Fetches beacon state JSON and block headers from a Berachain node. Kept
//! beside the proof engine so every binary (service, CLI, live checks)
//! shares one client; the engine itself never touches the network.

use crate::loader::{parse_hex32, state_from_value};
use crate::prepare::HistoricalRoots;
use crate::BeaconState;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

/// Slots between a state and the snapshot that supplies its historical roots.
pub const HISTORICAL_ROOTS_DISTANCE: u64 = 8;

/// Errors from beacon API operations.
#[derive(Debug, Error)]
pub enum BeaconClientError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("State not found for {0}")]
    StateNotFound(String),

    #[error("Header not found for {0}")]
    HeaderNotFound(String),
}

/// Client for interacting with the Beacon API.
#[derive(Debug, Clone)]
pub struct BeaconClient {
    client: Client,
    base_url: String,
}

/// Header fields needed for historical-roots resolution and live checks.
#[derive(Debug, Clone)]
pub struct HeaderSummary {
    pub slot: u64,
    pub parent_root: [u8; 32],
    pub state_root: [u8; 32],
}

impl BeaconClient {
    /// Create a new beacon client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the beacon node (e.g., `http://localhost:3500`)
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Fetch a beacon state as JSON and decode it into typed form.
    ///
    /// # Arguments
    /// * `state_id` - State identifier (slot number, "head", "finalized", ...)
    ///
    /// # Errors
    /// Returns an error if the request fails, the state is not found, or the
    /// JSON does not decode.
    #[instrument(skip(self))]
    pub async fn get_state(&self, state_id: &str) -> Result<BeaconState, BeaconClientError> {
        let url = format!("{}/eth/v2/debug/beacon/states/{state_id}", self.base_url);

        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BeaconClientError::StateNotFound(state_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(BeaconClientError::InvalidResponse(format!(
                "Unexpected status: {}",
                response.status()
            )));
        }

        let value: serde_json::Value = response.json().await?;
        state_from_value(value).map_err(|e| BeaconClientError::InvalidResponse(e.to_string()))
    }

    /// Fetch a beacon block header.
    ///
    /// # Errors
    /// Returns an error if the request fails or the header is not found.
    #[instrument(skip(self))]
    pub async fn get_header(&self, block_id: &str) -> Result<HeaderSummary, BeaconClientError> {
        let url = format!("{}/eth/v1/beacon/headers/{block_id}", self.base_url);

        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BeaconClientError::HeaderNotFound(block_id.to_string()));
        }

        #[derive(Deserialize)]
        struct HeaderResponse {
            data: HeaderData,
        }

        #[derive(Deserialize)]
        struct HeaderData {
            header: HeaderMessage,
        }

        #[derive(Deserialize)]
        struct HeaderMessage {
            message: BeaconBlockHeaderJson,
        }

        #[derive(Deserialize)]
        struct BeaconBlockHeaderJson {
            slot: String,
            #[serde(alias = "parentBlockRoot", alias = "parent_block_root")]
            parent_root: String,
            state_root: String,
        }

        let header_resp: HeaderResponse = response.json().await?;
        let msg = header_resp.data.header.message;

        Ok(HeaderSummary {
            slot: msg
                .slot
                .parse()
                .map_err(|e| BeaconClientError::InvalidResponse(format!("Invalid slot: {e}")))?,
            parent_root: parse_hex32(&msg.parent_root)
                .map_err(|e| BeaconClientError::InvalidResponse(e.to_string()))?,
            state_root: parse_hex32(&msg.state_root)
                .map_err(|e| BeaconClientError::InvalidResponse(e.to_string()))?,
        })
    }

    /// Historical roots for a state at `current_slot`: the state root and
    /// parent root carried by the header eight slots earlier.
    ///
    /// # Errors
    /// Returns an error if the historical header cannot be fetched.
    #[instrument(skip(self))]
    pub async fn get_historical_roots(
        &self,
        current_slot: u64,
    ) -> Result<HistoricalRoots, BeaconClientError> {
        let historical_slot = current_slot.saturating_sub(HISTORICAL_ROOTS_DISTANCE);
        let header = self.get_header(&historical_slot.to_string()).await?;
        Ok(HistoricalRoots {
            state_root: header.state_root,
            block_root: header.parent_root,
        })
    }

    /// Check whether the beacon API answers at all.
    pub async fn health_check(&self) -> bool {
        self.get_header("head").await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_keeps_base_url() {
        let client = BeaconClient::new("http://localhost:3500");
        assert_eq!(client.base_url, "http://localhost:3500");
    }

    #[test]
    fn historical_distance_matches_the_vector_size() {
        assert_eq!(HISTORICAL_ROOTS_DISTANCE, crate::containers::VECTOR_SIZE);
    }
}
