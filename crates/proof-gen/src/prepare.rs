//! Pre-merkleization state mutation.
//!
//! Berachain computes its canonical state root over a mutated state: the
//! header's `state_root` is zeroed and the state/block roots from eight slots
//! earlier are written into the historical vectors at `slot % 8`. Proofs
//! generated without these mutations verify against a different root.

use crate::containers::{BeaconState, VECTOR_SIZE};
use crate::loader::hex32;
use crate::proof::ProofError;
use serde::{Deserialize, Serialize};

/// State and block roots from eight slots before the state being proven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalRoots {
    #[serde(with = "hex32")]
    pub state_root: [u8; 32],
    #[serde(with = "hex32")]
    pub block_root: [u8; 32],
}

impl HistoricalRoots {
    /// Derive the roots from a snapshot taken eight slots earlier.
    ///
    /// The state root is the snapshot's own mutated hash tree root (its
    /// historical vectors already hold the values for its cycle, so the
    /// injection is an identity there); the block root is the root of its
    /// header with `state_root` zeroed.
    pub fn derive_from_snapshot(snapshot: &BeaconState) -> Result<Self, ProofError> {
        let index = (snapshot.slot % VECTOR_SIZE) as usize;
        let own = Self {
            state_root: snapshot
                .state_roots
                .get(index)
                .copied()
                .ok_or(ProofError::MissingHistoricalRoots(snapshot.slot))?,
            block_root: snapshot
                .block_roots
                .get(index)
                .copied()
                .ok_or(ProofError::MissingHistoricalRoots(snapshot.slot))?,
        };

        let mut prepared = snapshot.clone();
        prepare_for_merkleization(&mut prepared, &own);

        let mut header = snapshot.latest_block_header.clone();
        header.state_root = [0u8; 32];

        Ok(Self {
            state_root: prepared.hash_tree_root()?,
            block_root: header.hash_tree_root()?,
        })
    }
}

/// Apply the two pre-merkleization mutations in place.
///
/// Idempotent: once a state is prepared, further calls are no-ops, so a
/// combined proof request cannot mutate twice with diverging inputs.
pub fn prepare_for_merkleization(state: &mut BeaconState, roots: &HistoricalRoots) {
    if state.prepared {
        return;
    }

    state.latest_block_header.state_root = [0u8; 32];

    let index = (state.slot % VECTOR_SIZE) as usize;
    // Growing a short vector with zero chunks does not change its root.
    if state.state_roots.len() <= index {
        state.state_roots.resize(index + 1, [0u8; 32]);
    }
    if state.block_roots.len() <= index {
        state.block_roots.resize(index + 1, [0u8; 32]);
    }
    state.state_roots[index] = roots.state_root;
    state.block_roots[index] = roots.block_root;

    state.prepared = true;
}
