//! # Berachain beacon state proof engine
//!
//! Deterministic hash-tree-root computation for Berachain's `BeaconState`
//! and Merkle inclusion proofs for validator records and balances. The
//! state layout and the list merkleization rule diverge from the canonical
//! Ethereum 2 consensus spec, so generic SSZ tooling produces wrong roots;
//! this crate is the reference encoder and prover for the actual layout.
//!
//! The pipeline for one proof request:
//!
//! 1. deserialize JSON into a typed [`containers::BeaconState`],
//! 2. apply the pre-merkleization mutations ([`prepare`]),
//! 3. merkleize with sibling extraction ([`merkle`], [`prover`]),
//! 4. return `(root, proof, leaf, metadata)` ([`proof`]).
//!
//! The engine modules are pure computation: no I/O, no logging, no shared
//! mutable state across calls. [`beacon_client`] is the one networked
//! piece, kept beside the engine so the service, CLI and live-check
//! binaries share it.

pub mod beacon_client;
pub mod chunk;
pub mod containers;
pub mod gindex;
pub mod hashing;
pub mod loader;
pub mod merkle;
pub mod prepare;
pub mod proof;
pub mod prover;

pub use beacon_client::BeaconClient;
pub use containers::{
    BeaconBlockHeader, BeaconState, Eth1Data, ExecutionPayloadHeader, Fork,
    PendingPartialWithdrawal, Validator,
};
pub use gindex::GindexCalculator;
pub use prepare::{prepare_for_merkleization, HistoricalRoots};
pub use proof::{
    compute_state_root, generate_balance_proof, generate_combined_proof,
    generate_validator_proof, BalanceProof, CombinedProof, ProofError, ValidatorId,
    ValidatorProof,
};
pub use prover::StateProver;
