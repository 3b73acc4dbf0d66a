//! Public proof operations and error taxonomy.
//!
//! The four operations here are the crate's surface: computing the canonical
//! (mutated) state root, generating a validator record proof, generating a
//! balance proof, and generating both from one shared mutated state. All
//! failures are synchronous and fatal to the call; nothing is retried.

use crate::containers::{BeaconBlockHeader, BeaconState, Validator};
use crate::loader::{hex32, quoted_u64};
use crate::prepare::{prepare_for_merkleization, HistoricalRoots};
use crate::prover::StateProver;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during proof generation.
#[derive(Error, Debug)]
pub enum ProofError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validator {0} not found (registry has {1} entries)")]
    ValidatorNotFound(String, usize),

    #[error("Historical roots required to prepare the state at slot {0} were not supplied")]
    MissingHistoricalRoots(u64),

    #[error("Chunk count {0} exceeds limit {1}")]
    LimitExceeded(usize, u64),

    #[error("Internal invariant violated: {0}")]
    InternalInvariant(String),
}

/// A validator designated either by registry index or by BLS public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatorId {
    Index(u64),
    Pubkey([u8; 48]),
}

impl std::str::FromStr for ValidatorId {
    type Err = ProofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ProofError::InvalidInput("empty validator identifier".into()));
        }
        if let Some(hex_part) = s.strip_prefix("0x") {
            let bytes = hex::decode(hex_part)
                .map_err(|e| ProofError::InvalidInput(format!("malformed pubkey hex: {e}")))?;
            let pubkey: [u8; 48] = bytes.try_into().map_err(|b: Vec<u8>| {
                ProofError::InvalidInput(format!("pubkey must be 48 bytes, got {}", b.len()))
            })?;
            Ok(Self::Pubkey(pubkey))
        } else {
            s.parse::<u64>()
                .map(Self::Index)
                .map_err(|_| {
                    ProofError::InvalidInput(format!(
                        "identifier must be a decimal index or 0x-prefixed pubkey, got {s:?}"
                    ))
                })
        }
    }
}

impl ValidatorId {
    /// Resolve to a registry index within `state`.
    pub fn resolve(&self, state: &BeaconState) -> Result<usize, ProofError> {
        let count = state.validators.len();
        match self {
            Self::Index(index) => {
                let index = *index as usize;
                if index < count {
                    Ok(index)
                } else {
                    Err(ProofError::ValidatorNotFound(index.to_string(), count))
                }
            }
            Self::Pubkey(pubkey) => state
                .validators
                .iter()
                .position(|v| v.pubkey == *pubkey)
                .ok_or_else(|| {
                    ProofError::ValidatorNotFound(format!("0x{}", hex::encode(pubkey)), count)
                }),
        }
    }
}

/// Proof that a validator record is part of a state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorProof {
    /// Sibling hashes from the record leaf up to the state root.
    #[serde(with = "hex_root_list")]
    pub proof: Vec<[u8; 32]>,

    /// Canonical (mutated) state root.
    #[serde(with = "hex32")]
    pub root: [u8; 32],

    /// `hash_tree_root` of the proven validator record.
    #[serde(with = "hex32")]
    pub leaf: [u8; 32],

    /// Resolved registry index.
    pub validator_index: u64,

    /// The proven record itself.
    pub validator: Validator,
}

/// Proof that a validator's balance is part of a state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceProof {
    /// Sibling hashes from the balance chunk up to the state root.
    #[serde(with = "hex_root_list")]
    pub proof: Vec<[u8; 32]>,

    /// Canonical (mutated) state root.
    #[serde(with = "hex32")]
    pub root: [u8; 32],

    /// The 32-byte chunk holding four packed balances.
    #[serde(with = "hex32")]
    pub balance_leaf: [u8; 32],

    /// Root of the balances list (with the length mixed in).
    #[serde(with = "hex32")]
    pub balances_root: [u8; 32],

    /// The target balance, little-endian at `balance_byte_offset` in the leaf.
    #[serde(with = "quoted_u64")]
    pub balance: u64,

    /// Byte offset of the balance's lane inside `balance_leaf`.
    pub balance_byte_offset: usize,

    /// Resolved registry index.
    pub validator_index: u64,
}

/// Validator and balance proofs sharing one mutated state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedProof {
    #[serde(with = "hex_root_list")]
    pub validator_proof: Vec<[u8; 32]>,

    #[serde(with = "hex_root_list")]
    pub balance_proof: Vec<[u8; 32]>,

    #[serde(with = "hex32")]
    pub state_root: [u8; 32],

    #[serde(with = "hex32")]
    pub validator_leaf: [u8; 32],

    #[serde(with = "hex32")]
    pub balance_leaf: [u8; 32],

    #[serde(with = "hex32")]
    pub balances_root: [u8; 32],

    #[serde(with = "quoted_u64")]
    pub balance: u64,

    pub balance_byte_offset: usize,

    pub validator_index: u64,

    /// Root the latest block header takes once `state_root` is filled in with
    /// the computed root.
    #[serde(with = "hex32")]
    pub header_root: [u8; 32],

    /// The header carrying the computed state root.
    pub header: BeaconBlockHeader,

    /// The proven record.
    pub validator: Validator,
}

fn prepared_clone(
    state: &BeaconState,
    roots: Option<&HistoricalRoots>,
) -> Result<BeaconState, ProofError> {
    let mut state = state.clone();
    if !state.prepared {
        let roots = roots.ok_or(ProofError::MissingHistoricalRoots(state.slot))?;
        prepare_for_merkleization(&mut state, roots);
    }
    Ok(state)
}

/// Canonical state root: the hash tree root of the mutated state.
pub fn compute_state_root(
    state: &BeaconState,
    roots: Option<&HistoricalRoots>,
) -> Result<[u8; 32], ProofError> {
    prepared_clone(state, roots)?.hash_tree_root()
}

/// Generate a proof for a validator record.
pub fn generate_validator_proof(
    state: &BeaconState,
    id: &ValidatorId,
    roots: Option<&HistoricalRoots>,
) -> Result<ValidatorProof, ProofError> {
    let state = prepared_clone(state, roots)?;
    let index = id.resolve(&state)?;
    let prover = StateProver::new(&state)?;
    let witness = prover.prove_validator(index)?;

    Ok(ValidatorProof {
        proof: witness.proof,
        root: witness.state_root,
        leaf: witness.leaf,
        validator_index: index as u64,
        validator: state.validators[index].clone(),
    })
}

/// Generate a proof for a validator's balance.
pub fn generate_balance_proof(
    state: &BeaconState,
    id: &ValidatorId,
    roots: Option<&HistoricalRoots>,
) -> Result<BalanceProof, ProofError> {
    let state = prepared_clone(state, roots)?;
    let index = id.resolve(&state)?;
    let prover = StateProver::new(&state)?;
    let witness = prover.prove_balance(index)?;

    Ok(BalanceProof {
        proof: witness.proof,
        root: witness.state_root,
        balance_leaf: witness.leaf,
        balances_root: witness.balances_root,
        balance: state.balances[index],
        balance_byte_offset: witness.lane_offset,
        validator_index: index as u64,
    })
}

/// Generate validator and balance proofs from one shared mutated state.
pub fn generate_combined_proof(
    state: &BeaconState,
    id: &ValidatorId,
    roots: Option<&HistoricalRoots>,
) -> Result<CombinedProof, ProofError> {
    let state = prepared_clone(state, roots)?;
    let index = id.resolve(&state)?;
    let prover = StateProver::new(&state)?;

    let validator_witness = prover.prove_validator(index)?;
    let balance_witness = prover.prove_balance(index)?;

    let mut header = state.latest_block_header.clone();
    header.state_root = validator_witness.state_root;
    let header_root = header.hash_tree_root()?;

    Ok(CombinedProof {
        validator_proof: validator_witness.proof,
        balance_proof: balance_witness.proof,
        state_root: validator_witness.state_root,
        validator_leaf: validator_witness.leaf,
        balance_leaf: balance_witness.leaf,
        balances_root: balance_witness.balances_root,
        balance: state.balances[index],
        balance_byte_offset: balance_witness.lane_offset,
        validator_index: index as u64,
        header_root,
        header,
        validator: state.validators[index].clone(),
    })
}

/// Serde for proof vectors as lists of `0x`-prefixed 32-byte hex strings.
mod hex_root_list {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(data: &Vec<[u8; 32]>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let hex_strings: Vec<String> =
            data.iter().map(|h| format!("0x{}", hex::encode(h))).collect();
        hex_strings.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<[u8; 32]>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex_strings: Vec<String> = Vec::deserialize(deserializer)?;
        hex_strings
            .into_iter()
            .map(|s| {
                let s = s.strip_prefix("0x").unwrap_or(&s);
                let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
                let arr: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| serde::de::Error::custom("expected 32 bytes"))?;
                Ok(arr)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gindex::GindexCalculator;
    use crate::merkle::verify_proof;

    fn make_validator(index: u8) -> Validator {
        let mut v = Validator::default();
        v.pubkey[0] = 0x8f;
        v.pubkey[47] = index;
        v.withdrawal_credentials[0] = 0x01;
        v.effective_balance = 250_000_000_000_000;
        v.activation_epoch = index as u64;
        v
    }

    fn test_state(validators: usize) -> BeaconState {
        let mut state = BeaconState::default();
        state.slot = 7_530_242; // slot % 8 == 2
        state.latest_block_header.slot = state.slot;
        state.latest_block_header.parent_root = [0x11; 32];
        state.latest_block_header.state_root = [0x22; 32];
        state.latest_block_header.body_root = [0x33; 32];
        state.block_roots = (0..8).map(|i| [0x40 + i as u8; 32]).collect();
        state.state_roots = (0..8).map(|i| [0x50 + i as u8; 32]).collect();
        state.randao_mixes = (0..8).map(|i| [0x60 + i as u8; 32]).collect();
        for i in 0..validators {
            state.validators.push(make_validator(i as u8));
            state.balances.push(250_000_000_000_000 + i as u64);
        }
        state
    }

    fn test_roots() -> HistoricalRoots {
        HistoricalRoots {
            state_root: [0xa1; 32],
            block_root: [0xb2; 32],
        }
    }

    #[test]
    fn identifier_parsing() {
        assert_eq!("5".parse::<ValidatorId>().unwrap(), ValidatorId::Index(5));
        let pubkey_hex = format!("0x{}", "ab".repeat(48));
        assert!(matches!(
            pubkey_hex.parse::<ValidatorId>().unwrap(),
            ValidatorId::Pubkey(_)
        ));
        assert!(matches!(
            "0x1234".parse::<ValidatorId>(),
            Err(ProofError::InvalidInput(_))
        ));
        assert!(matches!(
            "not-a-number".parse::<ValidatorId>(),
            Err(ProofError::InvalidInput(_))
        ));
        assert!(matches!(
            "-3".parse::<ValidatorId>(),
            Err(ProofError::InvalidInput(_))
        ));
    }

    #[test]
    fn repeated_calls_are_byte_identical() {
        let state = test_state(6);
        let roots = test_roots();
        let a = generate_combined_proof(&state, &ValidatorId::Index(5), Some(&roots)).unwrap();
        let b = generate_combined_proof(&state, &ValidatorId::Index(5), Some(&roots)).unwrap();
        assert_eq!(a.state_root, b.state_root);
        assert_eq!(a.validator_proof, b.validator_proof);
        assert_eq!(a.balance_proof, b.balance_proof);
    }

    #[test]
    fn proofs_fold_back_to_the_state_root() {
        let state = test_state(6);
        let roots = test_roots();
        let bundle =
            generate_combined_proof(&state, &ValidatorId::Index(5), Some(&roots)).unwrap();

        assert_eq!(bundle.validator_proof.len(), 46);
        assert_eq!(bundle.balance_proof.len(), 44);

        let validator_g = GindexCalculator::validator_gindex(5);
        assert!(verify_proof(
            &bundle.validator_leaf,
            GindexCalculator::leaf_index(validator_g),
            &bundle.validator_proof,
            &bundle.state_root,
        ));

        let balance_g = GindexCalculator::balance_chunk_gindex(5);
        assert!(verify_proof(
            &bundle.balance_leaf,
            GindexCalculator::leaf_index(balance_g),
            &bundle.balance_proof,
            &bundle.state_root,
        ));
    }

    #[test]
    fn pubkey_identifier_matches_index_identifier() {
        let state = test_state(6);
        let roots = test_roots();
        let by_index =
            generate_validator_proof(&state, &ValidatorId::Index(5), Some(&roots)).unwrap();
        let by_pubkey = generate_validator_proof(
            &state,
            &ValidatorId::Pubkey(state.validators[5].pubkey),
            Some(&roots),
        )
        .unwrap();

        assert_eq!(by_pubkey.validator_index, 5);
        assert_eq!(by_index.root, by_pubkey.root);
        assert_eq!(by_index.proof, by_pubkey.proof);
    }

    #[test]
    fn unknown_validator_is_rejected() {
        let state = test_state(100);
        let roots = test_roots();
        let err = generate_validator_proof(&state, &ValidatorId::Index(999_999), Some(&roots))
            .unwrap_err();
        assert!(matches!(err, ProofError::ValidatorNotFound(_, 100)));

        let err = generate_balance_proof(
            &state,
            &ValidatorId::Pubkey([0xde; 48]),
            Some(&roots),
        )
        .unwrap_err();
        assert!(matches!(err, ProofError::ValidatorNotFound(_, 100)));
    }

    #[test]
    fn missing_historical_roots_are_fatal() {
        let state = test_state(3);
        assert!(matches!(
            compute_state_root(&state, None),
            Err(ProofError::MissingHistoricalRoots(_))
        ));
    }

    #[test]
    fn mutations_change_the_root() {
        let state = test_state(4);
        let roots = test_roots();
        let canonical = compute_state_root(&state, Some(&roots)).unwrap();

        // No mutations at all.
        let raw = state.hash_tree_root().unwrap();
        assert_ne!(canonical, raw);

        // Header zeroing only.
        let mut header_only = state.clone();
        header_only.latest_block_header.state_root = [0u8; 32];
        assert_ne!(canonical, header_only.hash_tree_root().unwrap());

        // Injection only.
        let mut inject_only = state.clone();
        let index = (inject_only.slot % 8) as usize;
        inject_only.state_roots[index] = roots.state_root;
        inject_only.block_roots[index] = roots.block_root;
        assert_ne!(canonical, inject_only.hash_tree_root().unwrap());
    }

    #[test]
    fn balance_lane_extraction() {
        let state = test_state(8);
        let roots = test_roots();
        let bundle =
            generate_balance_proof(&state, &ValidatorId::Index(7), Some(&roots)).unwrap();

        // Validator 7 lives in the chunk covering validators 4..=7.
        assert_eq!(bundle.balance_byte_offset, 24);
        let lane: [u8; 8] = bundle.balance_leaf[24..32].try_into().unwrap();
        assert_eq!(u64::from_le_bytes(lane), state.balances[7]);
        assert_eq!(bundle.balance, state.balances[7]);
    }

    #[test]
    fn bundle_json_round_trips() {
        let state = test_state(5);
        let roots = test_roots();
        let bundle =
            generate_combined_proof(&state, &ValidatorId::Index(2), Some(&roots)).unwrap();

        let json = serde_json::to_string(&bundle).unwrap();
        let decoded: CombinedProof = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.state_root, bundle.state_root);
        assert_eq!(decoded.validator_proof, bundle.validator_proof);
        assert_eq!(decoded.balance, bundle.balance);
        assert!(json.contains("\"state_root\":\"0x"));
    }
}
