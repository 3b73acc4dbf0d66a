//! Berachain beacon state containers.
//!
//! The layout diverges from the canonical Ethereum 2 consensus spec: the
//! state carries 17 fields (the Electra `pending_partial_withdrawals` list
//! follows `total_slashing`), the historical-root vectors hold 8 entries,
//! and every variable-length list merkleizes under the variant rule: the
//! body tree is built at the element-count limit, then the length is mixed
//! in.

use crate::chunk::{chunk_bool, chunk_bytes20, chunk_bytes4, chunk_u64, pack_u64s, root_of_bytes48};
use crate::loader::{
    hex_bytes, hex20, hex256, hex32, hex32_list, hex4, hex48, quoted_u64, quoted_u64_list,
};
use crate::merkle::{merkleize, merkleize_with_length, mix_in_length};
use crate::proof::ProofError;
use serde::{Deserialize, Serialize};

/// Length of the `block_roots`, `state_roots` and `slashings` vectors.
pub const VECTOR_SIZE: u64 = 8;

/// Maximum capacity of the validator registry (2^40).
pub const VALIDATOR_REGISTRY_LIMIT: u64 = 1 << 40;

/// Chunk capacity of the packed balances body tree (2^40 u64, 4 per chunk).
pub const BALANCES_CHUNK_LIMIT: u64 = (VALIDATOR_REGISTRY_LIMIT * 8).div_ceil(32);

/// Length of the `randao_mixes` vector.
pub const RANDAO_MIXES_LENGTH: u64 = 65536;

/// Chunk capacity of the packed slashings vector (8 u64, 4 per chunk).
pub const SLASHINGS_CHUNK_LIMIT: u64 = (VECTOR_SIZE * 8).div_ceil(32);

/// Maximum pending partial withdrawals (2^27).
pub const PENDING_PARTIAL_WITHDRAWALS_LIMIT: u64 = 1 << 27;

/// Maximum `extra_data` length in the execution payload header.
pub const MAX_EXTRA_DATA_BYTES: usize = 32;

/// Number of fields in the beacon state container.
pub const STATE_FIELD_COUNT: usize = 17;

/// Leaf slots of the state container tree (`next_pow2(17)`).
pub const STATE_CHUNK_LIMIT: u64 = 32;

/// Network fork with version information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fork {
    #[serde(with = "hex4", alias = "previousVersion")]
    pub previous_version: [u8; 4],
    #[serde(with = "hex4", alias = "currentVersion")]
    pub current_version: [u8; 4],
    #[serde(with = "quoted_u64")]
    pub epoch: u64,
}

impl Fork {
    pub fn hash_tree_root(&self) -> Result<[u8; 32], ProofError> {
        let chunks = [
            chunk_bytes4(&self.previous_version),
            chunk_bytes4(&self.current_version),
            chunk_u64(self.epoch),
        ];
        merkleize(&chunks, 4)
    }
}

/// Beacon block header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconBlockHeader {
    #[serde(with = "quoted_u64")]
    pub slot: u64,
    #[serde(with = "quoted_u64", alias = "proposerIndex")]
    pub proposer_index: u64,
    #[serde(
        with = "hex32",
        alias = "parentRoot",
        alias = "parent_block_root",
        alias = "parentBlockRoot"
    )]
    pub parent_root: [u8; 32],
    #[serde(with = "hex32", alias = "stateRoot")]
    pub state_root: [u8; 32],
    #[serde(with = "hex32", alias = "bodyRoot")]
    pub body_root: [u8; 32],
}

impl BeaconBlockHeader {
    pub fn hash_tree_root(&self) -> Result<[u8; 32], ProofError> {
        let chunks = [
            chunk_u64(self.slot),
            chunk_u64(self.proposer_index),
            self.parent_root,
            self.state_root,
            self.body_root,
        ];
        merkleize(&chunks, 8)
    }
}

/// Eth1 chain data carried in the beacon state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eth1Data {
    #[serde(with = "hex32", alias = "depositRoot")]
    pub deposit_root: [u8; 32],
    #[serde(with = "quoted_u64", alias = "depositCount")]
    pub deposit_count: u64,
    #[serde(with = "hex32", alias = "blockHash")]
    pub block_hash: [u8; 32],
}

impl Eth1Data {
    pub fn hash_tree_root(&self) -> Result<[u8; 32], ProofError> {
        let chunks = [
            self.deposit_root,
            chunk_u64(self.deposit_count),
            self.block_hash,
        ];
        merkleize(&chunks, 4)
    }
}

/// Validator record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    #[serde(with = "hex48")]
    pub pubkey: [u8; 48],
    #[serde(with = "hex32", alias = "withdrawalCredentials")]
    pub withdrawal_credentials: [u8; 32],
    #[serde(with = "quoted_u64", alias = "effectiveBalance")]
    pub effective_balance: u64,
    pub slashed: bool,
    #[serde(with = "quoted_u64", alias = "activationEligibilityEpoch")]
    pub activation_eligibility_epoch: u64,
    #[serde(with = "quoted_u64", alias = "activationEpoch")]
    pub activation_epoch: u64,
    #[serde(with = "quoted_u64", alias = "exitEpoch")]
    pub exit_epoch: u64,
    #[serde(with = "quoted_u64", alias = "withdrawableEpoch")]
    pub withdrawable_epoch: u64,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            pubkey: [0u8; 48],
            withdrawal_credentials: [0u8; 32],
            effective_balance: 0,
            slashed: false,
            activation_eligibility_epoch: 0,
            activation_epoch: 0,
            exit_epoch: 0,
            withdrawable_epoch: 0,
        }
    }
}

impl Validator {
    pub fn hash_tree_root(&self) -> Result<[u8; 32], ProofError> {
        let chunks = [
            root_of_bytes48(&self.pubkey),
            self.withdrawal_credentials,
            chunk_u64(self.effective_balance),
            chunk_bool(self.slashed),
            chunk_u64(self.activation_eligibility_epoch),
            chunk_u64(self.activation_epoch),
            chunk_u64(self.exit_epoch),
            chunk_u64(self.withdrawable_epoch),
        ];
        merkleize(&chunks, 8)
    }
}

/// Pending partial withdrawal entry (Electra).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPartialWithdrawal {
    #[serde(with = "quoted_u64", alias = "validatorIndex")]
    pub validator_index: u64,
    #[serde(with = "quoted_u64")]
    pub amount: u64,
    #[serde(with = "quoted_u64", alias = "withdrawableEpoch")]
    pub withdrawable_epoch: u64,
}

impl PendingPartialWithdrawal {
    pub fn hash_tree_root(&self) -> Result<[u8; 32], ProofError> {
        let chunks = [
            chunk_u64(self.validator_index),
            chunk_u64(self.amount),
            chunk_u64(self.withdrawable_epoch),
        ];
        merkleize(&chunks, 4)
    }
}

/// Execution payload header. Only its root feeds the state tree, but the
/// typed layout is kept so the loader can ingest beacon-node JSON directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPayloadHeader {
    #[serde(with = "hex32", alias = "parentHash")]
    pub parent_hash: [u8; 32],
    #[serde(with = "hex20", alias = "feeRecipient")]
    pub fee_recipient: [u8; 20],
    #[serde(with = "hex32", alias = "stateRoot")]
    pub state_root: [u8; 32],
    #[serde(with = "hex32", alias = "receiptsRoot")]
    pub receipts_root: [u8; 32],
    #[serde(with = "hex256", alias = "logsBloom")]
    pub logs_bloom: [u8; 256],
    #[serde(with = "hex32", alias = "prevRandao")]
    pub prev_randao: [u8; 32],
    #[serde(with = "quoted_u64", alias = "blockNumber")]
    pub block_number: u64,
    #[serde(with = "quoted_u64", alias = "gasLimit")]
    pub gas_limit: u64,
    #[serde(with = "quoted_u64", alias = "gasUsed")]
    pub gas_used: u64,
    #[serde(with = "quoted_u64")]
    pub timestamp: u64,
    #[serde(with = "hex_bytes", alias = "extraData")]
    pub extra_data: Vec<u8>,
    #[serde(with = "quoted_u64", alias = "baseFeePerGas")]
    pub base_fee_per_gas: u64,
    #[serde(with = "hex32", alias = "blockHash")]
    pub block_hash: [u8; 32],
    #[serde(with = "hex32", alias = "transactionsRoot")]
    pub transactions_root: [u8; 32],
    #[serde(with = "hex32", alias = "withdrawalsRoot")]
    pub withdrawals_root: [u8; 32],
    #[serde(with = "quoted_u64", alias = "blobGasUsed")]
    pub blob_gas_used: u64,
    #[serde(with = "quoted_u64", alias = "excessBlobGas")]
    pub excess_blob_gas: u64,
}

impl Default for ExecutionPayloadHeader {
    fn default() -> Self {
        Self {
            parent_hash: [0u8; 32],
            fee_recipient: [0u8; 20],
            state_root: [0u8; 32],
            receipts_root: [0u8; 32],
            logs_bloom: [0u8; 256],
            prev_randao: [0u8; 32],
            block_number: 0,
            gas_limit: 0,
            gas_used: 0,
            timestamp: 0,
            extra_data: Vec::new(),
            base_fee_per_gas: 0,
            block_hash: [0u8; 32],
            transactions_root: [0u8; 32],
            withdrawals_root: [0u8; 32],
            blob_gas_used: 0,
            excess_blob_gas: 0,
        }
    }
}

impl ExecutionPayloadHeader {
    pub fn hash_tree_root(&self) -> Result<[u8; 32], ProofError> {
        let mut bloom_chunks = [[0u8; 32]; 8];
        for (i, chunk) in bloom_chunks.iter_mut().enumerate() {
            chunk.copy_from_slice(&self.logs_bloom[i * 32..(i + 1) * 32]);
        }

        let chunks = [
            self.parent_hash,
            chunk_bytes20(&self.fee_recipient),
            self.state_root,
            self.receipts_root,
            merkleize(&bloom_chunks, 8)?,
            self.prev_randao,
            chunk_u64(self.block_number),
            chunk_u64(self.gas_limit),
            chunk_u64(self.gas_used),
            chunk_u64(self.timestamp),
            self.extra_data_root()?,
            chunk_u64(self.base_fee_per_gas),
            self.block_hash,
            self.transactions_root,
            self.withdrawals_root,
            chunk_u64(self.blob_gas_used),
            chunk_u64(self.excess_blob_gas),
        ];
        merkleize(&chunks, 32)
    }

    /// `ByteList[32]`: a single right-padded chunk with the byte length mixed
    /// in.
    fn extra_data_root(&self) -> Result<[u8; 32], ProofError> {
        if self.extra_data.len() > MAX_EXTRA_DATA_BYTES {
            return Err(ProofError::LimitExceeded(
                self.extra_data.len(),
                MAX_EXTRA_DATA_BYTES as u64,
            ));
        }
        let mut chunk = [0u8; 32];
        chunk[..self.extra_data.len()].copy_from_slice(&self.extra_data);
        Ok(mix_in_length(&chunk, self.extra_data.len() as u64))
    }
}

/// The Berachain beacon state.
///
/// Field indices are fixed; proofs for validator records descend through
/// field 9 and balance proofs through field 10. The container merkleizes
/// over [`STATE_CHUNK_LIMIT`] leaf slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconState {
    // Field 0
    #[serde(with = "hex32", alias = "genesisValidatorsRoot")]
    pub genesis_validators_root: [u8; 32],
    // Field 1
    #[serde(with = "quoted_u64")]
    pub slot: u64,
    // Field 2
    pub fork: Fork,
    // Field 3
    #[serde(alias = "latestBlockHeader")]
    pub latest_block_header: BeaconBlockHeader,
    // Field 4
    #[serde(with = "hex32_list", alias = "blockRoots")]
    pub block_roots: Vec<[u8; 32]>,
    // Field 5
    #[serde(with = "hex32_list", alias = "stateRoots")]
    pub state_roots: Vec<[u8; 32]>,
    // Field 6
    #[serde(alias = "eth1Data")]
    pub eth1_data: Eth1Data,
    // Field 7
    #[serde(with = "quoted_u64", alias = "eth1DepositIndex")]
    pub eth1_deposit_index: u64,
    // Field 8
    #[serde(alias = "latestExecutionPayloadHeader")]
    pub latest_execution_payload_header: ExecutionPayloadHeader,
    // Field 9
    pub validators: Vec<Validator>,
    // Field 10
    #[serde(with = "quoted_u64_list")]
    pub balances: Vec<u64>,
    // Field 11
    #[serde(with = "hex32_list", alias = "randaoMixes")]
    pub randao_mixes: Vec<[u8; 32]>,
    // Field 12
    #[serde(with = "quoted_u64", default, alias = "nextWithdrawalIndex")]
    pub next_withdrawal_index: u64,
    // Field 13
    #[serde(with = "quoted_u64", default, alias = "nextWithdrawalValidatorIndex")]
    pub next_withdrawal_validator_index: u64,
    // Field 14
    #[serde(with = "quoted_u64_list", default)]
    pub slashings: Vec<u64>,
    // Field 15
    #[serde(with = "quoted_u64", default, alias = "totalSlashing")]
    pub total_slashing: u64,
    // Field 16
    #[serde(default, alias = "pendingPartialWithdrawals")]
    pub pending_partial_withdrawals: Vec<PendingPartialWithdrawal>,

    /// Set once the pre-merkleization mutations have been applied.
    #[serde(skip)]
    pub(crate) prepared: bool,
}

impl BeaconState {
    /// Field index of `validators` in the state container.
    pub const VALIDATORS_FIELD_INDEX: usize = 9;

    /// Field index of `balances` in the state container.
    pub const BALANCES_FIELD_INDEX: usize = 10;

    /// Roots of all 17 fields, in container order.
    pub fn field_roots(&self) -> Result<[[u8; 32]; STATE_FIELD_COUNT], ProofError> {
        Ok([
            self.genesis_validators_root,
            chunk_u64(self.slot),
            self.fork.hash_tree_root()?,
            self.latest_block_header.hash_tree_root()?,
            merkleize(&self.block_roots, VECTOR_SIZE)?,
            merkleize(&self.state_roots, VECTOR_SIZE)?,
            self.eth1_data.hash_tree_root()?,
            chunk_u64(self.eth1_deposit_index),
            self.latest_execution_payload_header.hash_tree_root()?,
            self.validators_root()?,
            self.balances_root()?,
            merkleize(&self.randao_mixes, RANDAO_MIXES_LENGTH)?,
            chunk_u64(self.next_withdrawal_index),
            chunk_u64(self.next_withdrawal_validator_index),
            merkleize(&pack_u64s(&self.slashings), SLASHINGS_CHUNK_LIMIT)?,
            chunk_u64(self.total_slashing),
            self.pending_partial_withdrawals_root()?,
        ])
    }

    /// Root of the full state container.
    pub fn hash_tree_root(&self) -> Result<[u8; 32], ProofError> {
        merkleize(&self.field_roots()?, STATE_CHUNK_LIMIT)
    }

    /// Roots of the individual validator records, in registry order.
    pub fn validator_roots(&self) -> Result<Vec<[u8; 32]>, ProofError> {
        self.validators.iter().map(|v| v.hash_tree_root()).collect()
    }

    /// `List[Validator, 2^40]` under the variant rule: body tree at the
    /// element-count limit, then the length mix-in.
    pub fn validators_root(&self) -> Result<[u8; 32], ProofError> {
        merkleize_with_length(
            &self.validator_roots()?,
            VALIDATOR_REGISTRY_LIMIT,
            self.validators.len() as u64,
        )
    }

    /// `List[u64, 2^40]`: balances packed four per chunk, body tree at the
    /// packed chunk limit, then the length mix-in with the element count.
    pub fn balances_root(&self) -> Result<[u8; 32], ProofError> {
        merkleize_with_length(
            &pack_u64s(&self.balances),
            BALANCES_CHUNK_LIMIT,
            self.balances.len() as u64,
        )
    }

    fn pending_partial_withdrawals_root(&self) -> Result<[u8; 32], ProofError> {
        let roots: Vec<[u8; 32]> = self
            .pending_partial_withdrawals
            .iter()
            .map(|w| w.hash_tree_root())
            .collect::<Result<_, _>>()?;
        merkleize_with_length(
            &roots,
            PENDING_PARTIAL_WITHDRAWALS_LIMIT,
            self.pending_partial_withdrawals.len() as u64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::{hash_pair, ZERO_HASHES};
    use crate::chunk::uint256_le;

    fn make_validator(index: u8) -> Validator {
        let mut v = Validator::default();
        v.pubkey[0] = 0xb0;
        v.pubkey[47] = index;
        v.withdrawal_credentials[0] = 0x01;
        v.withdrawal_credentials[12..32].copy_from_slice(&[index; 20]);
        v.effective_balance = 250_000_000_000_000;
        v.activation_epoch = 100 + index as u64;
        v
    }

    #[test]
    fn header_root_changes_with_state_root() {
        let mut header = BeaconBlockHeader {
            slot: 12345,
            proposer_index: 42,
            parent_root: [1u8; 32],
            state_root: [2u8; 32],
            body_root: [3u8; 32],
        };
        let before = header.hash_tree_root().unwrap();
        header.state_root = [0u8; 32];
        assert_ne!(before, header.hash_tree_root().unwrap());
    }

    #[test]
    fn validator_root_is_nonzero_and_deterministic() {
        let v = make_validator(3);
        let a = v.hash_tree_root().unwrap();
        let b = v.hash_tree_root().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, [0u8; 32]);
    }

    #[test]
    fn zero_vector_roots_are_zero_hashes() {
        // Vector[bytes32, 8] of zeroes == zero_hashes[3], no length mix-in.
        let state = BeaconState::default();
        let roots = state.field_roots().unwrap();
        assert_eq!(roots[4], ZERO_HASHES[3]);
        assert_eq!(roots[5], ZERO_HASHES[3]);
        // Vector[bytes32, 65536] of zeroes == zero_hashes[16].
        assert_eq!(roots[11], ZERO_HASHES[16]);
        // Packed Vector[u64, 8] of zeroes == zero_hashes[1].
        assert_eq!(roots[14], ZERO_HASHES[1]);
    }

    #[test]
    fn empty_list_roots_mix_in_zero_length() {
        let state = BeaconState::default();
        let roots = state.field_roots().unwrap();
        assert_eq!(roots[9], hash_pair(&ZERO_HASHES[40], &uint256_le(0)));
        assert_eq!(roots[10], hash_pair(&ZERO_HASHES[38], &uint256_le(0)));
        assert_eq!(roots[16], hash_pair(&ZERO_HASHES[27], &uint256_le(0)));
    }

    #[test]
    fn list_root_is_vector_root_at_limit_plus_length() {
        let mut state = BeaconState::default();
        for i in 0..5u8 {
            state.validators.push(make_validator(i));
        }
        let body = merkleize(&state.validator_roots().unwrap(), VALIDATOR_REGISTRY_LIMIT).unwrap();
        assert_eq!(
            state.validators_root().unwrap(),
            hash_pair(&body, &uint256_le(5))
        );
    }

    #[test]
    fn list_length_mix_in_is_element_count_not_chunk_count() {
        let mut state = BeaconState::default();
        state.balances = vec![32_000_000_000; 6];
        // 6 balances pack into 2 chunks; the mix-in must still say 6.
        let body = merkleize(&pack_u64s(&state.balances), BALANCES_CHUNK_LIMIT).unwrap();
        assert_eq!(
            state.balances_root().unwrap(),
            hash_pair(&body, &uint256_le(6))
        );
    }

    #[test]
    fn state_root_is_sensitive_to_field_order() {
        let mut state = BeaconState::default();
        state.slot = 7;
        state.eth1_deposit_index = 11;
        let mut roots = state.field_roots().unwrap();
        let canonical = merkleize(&roots, STATE_CHUNK_LIMIT).unwrap();

        // Swapping any two adjacent field roots must change the root.
        roots.swap(1, 2);
        assert_ne!(canonical, merkleize(&roots, STATE_CHUNK_LIMIT).unwrap());

        let mut roots = state.field_roots().unwrap();
        roots.swap(9, 10);
        assert_ne!(canonical, merkleize(&roots, STATE_CHUNK_LIMIT).unwrap());
    }

    #[test]
    fn vector_over_capacity_is_rejected() {
        let mut state = BeaconState::default();
        state.block_roots = vec![[1u8; 32]; 9];
        assert!(matches!(
            state.hash_tree_root(),
            Err(ProofError::LimitExceeded(9, 8))
        ));
    }

    #[test]
    fn extra_data_root_mixes_in_byte_length() {
        let mut header = ExecutionPayloadHeader::default();
        header.extra_data = vec![0xd8, 0x83];
        let mut chunk = [0u8; 32];
        chunk[0] = 0xd8;
        chunk[1] = 0x83;
        let expected = hash_pair(&chunk, &uint256_le(2));
        assert_eq!(header.extra_data_root().unwrap(), expected);

        header.extra_data = vec![0u8; 33];
        assert!(header.hash_tree_root().is_err());
    }

    #[test]
    fn json_state_round_trips() {
        let mut state = BeaconState::default();
        state.slot = 42;
        state.validators.push(make_validator(1));
        state.balances.push(1_000_000);
        state.block_roots = vec![[9u8; 32]; 8];
        state.state_roots = vec![[8u8; 32]; 8];
        state.randao_mixes = vec![[7u8; 32]; 8];

        let json = serde_json::to_string(&state).unwrap();
        let decoded: BeaconState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, decoded);
    }
}

