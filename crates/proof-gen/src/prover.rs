//! State-level proof generation.
//!
//! [`StateProver`] computes the 17 state field roots, the per-validator
//! record roots and the packed balance chunks exactly once, then serves the
//! state root and any number of validator or balance witnesses from them.
//! A combined proof request therefore shares one mutated state and one pass
//! over the registry. No full Merkle tree is ever allocated; the body trees
//! for `List[Validator, 2^40]` are walked sparsely.

use crate::chunk::{pack_u64s, u64_lane_offset, uint256_le};
use crate::containers::{
    BeaconState, BALANCES_CHUNK_LIMIT, STATE_CHUNK_LIMIT, STATE_FIELD_COUNT,
    VALIDATOR_REGISTRY_LIMIT,
};
use crate::merkle::{merkleize, merkleize_with_proof, mix_in_length};
use crate::proof::ProofError;

/// Witness for one validator record.
#[derive(Debug, Clone)]
pub struct ValidatorWitness {
    /// Sibling hashes, leaf-first: 40 body levels, the length mix-in chunk,
    /// then 5 state container levels.
    pub proof: Vec<[u8; 32]>,
    /// `hash_tree_root(validators[i])`.
    pub leaf: [u8; 32],
    /// Root of the (mutated) state the proof verifies against.
    pub state_root: [u8; 32],
}

/// Witness for one balance chunk.
#[derive(Debug, Clone)]
pub struct BalanceWitness {
    /// Sibling hashes, leaf-first: 38 body levels, the length mix-in chunk,
    /// then 5 state container levels.
    pub proof: Vec<[u8; 32]>,
    /// The packed 32-byte chunk holding the target balance.
    pub leaf: [u8; 32],
    /// Byte offset of the target balance's little-endian lane in `leaf`.
    pub lane_offset: usize,
    /// Root of the balances list (body root with the length mixed in).
    pub balances_root: [u8; 32],
    /// Root of the (mutated) state the proof verifies against.
    pub state_root: [u8; 32],
}

/// Proof generator over a prepared beacon state.
pub struct StateProver {
    field_roots: [[u8; 32]; STATE_FIELD_COUNT],
    validator_roots: Vec<[u8; 32]>,
    balance_chunks: Vec<[u8; 32]>,
    validator_count: usize,
    balance_count: usize,
}

impl StateProver {
    /// Hash the state's fields and registry elements once.
    pub fn new(state: &BeaconState) -> Result<Self, ProofError> {
        Ok(Self {
            field_roots: state.field_roots()?,
            validator_roots: state.validator_roots()?,
            balance_chunks: pack_u64s(&state.balances),
            validator_count: state.validators.len(),
            balance_count: state.balances.len(),
        })
    }

    /// Root of the state container.
    pub fn state_root(&self) -> Result<[u8; 32], ProofError> {
        merkleize(&self.field_roots, STATE_CHUNK_LIMIT)
    }

    /// Witness that `validators[index]` is part of the state.
    pub fn prove_validator(&self, index: usize) -> Result<ValidatorWitness, ProofError> {
        if index >= self.validator_count {
            return Err(ProofError::ValidatorNotFound(
                index.to_string(),
                self.validator_count,
            ));
        }

        let (mut proof, _body_root) =
            merkleize_with_proof(&self.validator_roots, VALIDATOR_REGISTRY_LIMIT, index)?;
        proof.push(uint256_le(self.validator_count as u64));

        let (state_proof, state_root) = merkleize_with_proof(
            &self.field_roots,
            STATE_CHUNK_LIMIT,
            BeaconState::VALIDATORS_FIELD_INDEX,
        )?;
        proof.extend_from_slice(&state_proof);

        Ok(ValidatorWitness {
            proof,
            leaf: self.validator_roots[index],
            state_root,
        })
    }

    /// Witness that the chunk holding `balances[index]` is part of the state.
    pub fn prove_balance(&self, index: usize) -> Result<BalanceWitness, ProofError> {
        if index >= self.balance_count {
            return Err(ProofError::ValidatorNotFound(
                index.to_string(),
                self.balance_count,
            ));
        }

        let chunk_index = index / 4;
        let (mut proof, body_root) =
            merkleize_with_proof(&self.balance_chunks, BALANCES_CHUNK_LIMIT, chunk_index)?;
        proof.push(uint256_le(self.balance_count as u64));
        let balances_root = mix_in_length(&body_root, self.balance_count as u64);

        let (state_proof, state_root) = merkleize_with_proof(
            &self.field_roots,
            STATE_CHUNK_LIMIT,
            BeaconState::BALANCES_FIELD_INDEX,
        )?;
        proof.extend_from_slice(&state_proof);

        Ok(BalanceWitness {
            proof,
            leaf: self.balance_chunks[chunk_index],
            lane_offset: u64_lane_offset(index),
            balances_root,
            state_root,
        })
    }
}
