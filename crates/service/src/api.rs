//! REST API endpoints.
//!
//! Health plus the proof endpoints: combined (POST and GET), validator-only
//! and balance-only.

use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use proof_gen::beacon_client::BeaconClientError;
use proof_gen::loader::parse_hex32;
use proof_gen::{
    generate_balance_proof, generate_combined_proof, generate_validator_proof, BeaconState,
    HistoricalRoots, ProofError, ValidatorId,
};
use serde::{Deserialize, Serialize};

/// Run the API server.
pub async fn run_server(listen: String, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    tracing::info!(address = %listen, "API server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/proofs/combined", post(combined_post))
        .route("/proofs/combined/{identifier}", get(combined_get))
        .route("/proofs/validator/{identifier}", get(validator_get))
        .route("/proofs/balance/{identifier}", get(balance_get))
        .with_state(state)
}

/// Query parameters shared by the GET proof endpoints.
#[derive(Debug, Default, Deserialize)]
struct ProofQuery {
    slot: Option<String>,
    prev_state_root: Option<String>,
    prev_block_root: Option<String>,
}

/// Request body for the POST combined endpoint.
#[derive(Debug, Deserialize)]
struct CombinedProofRequest {
    identifier: String,
    slot: Option<String>,
    prev_state_root: Option<String>,
    prev_block_root: Option<String>,
}

/// Error body returned for every failure.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

/// Failures surfaced by the proof endpoints.
#[derive(Debug)]
enum ApiError {
    Proof(ProofError),
    Beacon(BeaconClientError),
}

impl From<ProofError> for ApiError {
    fn from(err: ProofError) -> Self {
        Self::Proof(err)
    }
}

impl From<BeaconClientError> for ApiError {
    fn from(err: BeaconClientError) -> Self {
        Self::Beacon(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Proof(ProofError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            Self::Proof(ProofError::ValidatorNotFound(..)) => StatusCode::NOT_FOUND,
            Self::Proof(ProofError::MissingHistoricalRoots(_)) => StatusCode::BAD_REQUEST,
            Self::Proof(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Beacon(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Proof(_) => "PROOF_GENERATION_ERROR",
            Self::Beacon(_) => "BEACON_API_ERROR",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Proof(err) => err.to_string(),
            Self::Beacon(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message(),
            code: self.code(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    beacon_api: bool,
    proofs_generated: u64,
    failures: u64,
    uptime_secs: u64,
    last_error: Option<String>,
}

/// Health check endpoint.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let beacon_up = state.client().health_check().await;
    let status_code = if beacon_up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if beacon_up { "healthy" } else { "degraded" },
        beacon_api: beacon_up,
        proofs_generated: state.proofs_generated(),
        failures: state.failures(),
        uptime_secs: state.uptime_secs(),
        last_error: state.last_error(),
    };

    (status_code, Json(response))
}

/// Fetch the state and resolve historical roots for one proof request.
/// Explicit roots win; anything missing is resolved from the node's header
/// eight slots back and cached.
async fn load_proof_inputs(
    state: &AppState,
    identifier: &str,
    query: ProofQuery,
) -> Result<(BeaconState, HistoricalRoots, ValidatorId), ApiError> {
    let id: ValidatorId = identifier.parse()?;

    let slot = query.slot.as_deref().unwrap_or("head");
    let beacon_state = state.client().get_state(slot).await?;

    let roots = match (&query.prev_state_root, &query.prev_block_root) {
        (Some(state_root), Some(block_root)) => HistoricalRoots {
            state_root: parse_hex32(state_root)?,
            block_root: parse_hex32(block_root)?,
        },
        _ => {
            let mut roots = state.historical_roots(beacon_state.slot).await?;
            if let Some(state_root) = &query.prev_state_root {
                roots.state_root = parse_hex32(state_root)?;
            }
            if let Some(block_root) = &query.prev_block_root {
                roots.block_root = parse_hex32(block_root)?;
            }
            roots
        }
    };

    Ok((beacon_state, roots, id))
}

fn track<T>(state: &AppState, result: Result<T, ApiError>) -> Result<Json<T>, ApiError> {
    match result {
        Ok(value) => {
            state.record_success();
            Ok(Json(value))
        }
        Err(err) => {
            state.record_failure(&err.message());
            Err(err)
        }
    }
}

/// Combined validator + balance proof (GET).
async fn combined_get(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
    Query(query): Query<ProofQuery>,
) -> Result<Json<proof_gen::CombinedProof>, ApiError> {
    let result = async {
        let (beacon_state, roots, id) = load_proof_inputs(&state, &identifier, query).await?;
        Ok(generate_combined_proof(&beacon_state, &id, Some(&roots))?)
    }
    .await;
    track(&state, result)
}

/// Combined validator + balance proof (POST).
async fn combined_post(
    State(state): State<AppState>,
    Json(request): Json<CombinedProofRequest>,
) -> Result<Json<proof_gen::CombinedProof>, ApiError> {
    let query = ProofQuery {
        slot: request.slot,
        prev_state_root: request.prev_state_root,
        prev_block_root: request.prev_block_root,
    };
    let result = async {
        let (beacon_state, roots, id) =
            load_proof_inputs(&state, &request.identifier, query).await?;
        Ok(generate_combined_proof(&beacon_state, &id, Some(&roots))?)
    }
    .await;
    track(&state, result)
}

/// Validator record proof.
async fn validator_get(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
    Query(query): Query<ProofQuery>,
) -> Result<Json<proof_gen::ValidatorProof>, ApiError> {
    let result = async {
        let (beacon_state, roots, id) = load_proof_inputs(&state, &identifier, query).await?;
        Ok(generate_validator_proof(&beacon_state, &id, Some(&roots))?)
    }
    .await;
    track(&state, result)
}

/// Balance proof.
async fn balance_get(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
    Query(query): Query<ProofQuery>,
) -> Result<Json<proof_gen::BalanceProof>, ApiError> {
    let result = async {
        let (beacon_state, roots, id) = load_proof_inputs(&state, &identifier, query).await?;
        Ok(generate_balance_proof(&beacon_state, &id, Some(&roots))?)
    }
    .await;
    track(&state, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proof_gen::beacon_client::BeaconClient;

    fn test_state() -> AppState {
        AppState::new(BeaconClient::new("http://localhost:3500"))
    }

    #[test]
    fn router_builds() {
        let _router = create_router(test_state());
    }

    #[test]
    fn error_mapping() {
        let invalid = ApiError::Proof(ProofError::InvalidInput("bad".into()));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let missing = ApiError::Proof(ProofError::ValidatorNotFound("7".into(), 3));
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let roots = ApiError::Proof(ProofError::MissingHistoricalRoots(5));
        assert_eq!(roots.status(), StatusCode::BAD_REQUEST);

        let internal = ApiError::Proof(ProofError::InternalInvariant("bug".into()));
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.code(), "PROOF_GENERATION_ERROR");

        let beacon = ApiError::Beacon(BeaconClientError::StateNotFound("head".into()));
        assert_eq!(beacon.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(beacon.code(), "BEACON_API_ERROR");
    }

    #[tokio::test]
    async fn bad_identifier_is_rejected_before_any_network_io() {
        let state = test_state();
        let err = load_proof_inputs(&state, "not-a-validator", ProofQuery::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn failures_are_counted() {
        let state = test_state();
        let result: Result<(), ApiError> =
            Err(ApiError::Proof(ProofError::InvalidInput("oops".into())));
        assert!(track(&state, result).is_err());
        assert_eq!(state.failures(), 1);
        assert_eq!(state.last_error().as_deref(), Some("Invalid input: oops"));
    }
}
