//! JSON ingestion for beacon state documents.
//!
//! Beacon nodes serve the state as JSON with integers as decimal strings
//! (occasionally 0x-hex), byte strings as lowercase `0x` hex, and either
//! snake_case or camelCase keys depending on the endpoint. The serde helper
//! modules here normalize all of that onto the typed containers; the state
//! may arrive bare or wrapped in the usual `{"data": ...}` envelope.

use crate::containers::BeaconState;
use crate::proof::ProofError;

/// Parse a beacon state from a JSON document.
pub fn state_from_json(json: &str) -> Result<BeaconState, ProofError> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| ProofError::InvalidInput(format!("malformed JSON: {e}")))?;
    state_from_value(value)
}

/// Parse a beacon state from an already-decoded JSON value, unwrapping the
/// `{"data": ...}` envelope if present.
pub fn state_from_value(mut value: serde_json::Value) -> Result<BeaconState, ProofError> {
    if let Some(data) = value.get_mut("data") {
        value = data.take();
    }
    serde_json::from_value(value)
        .map_err(|e| ProofError::InvalidInput(format!("unexpected beacon state shape: {e}")))
}

/// Parse a `0x`-prefixed 32-byte hex string.
pub fn parse_hex32(text: &str) -> Result<[u8; 32], ProofError> {
    decode_fixed::<32>(text).map_err(ProofError::InvalidInput)
}

pub(crate) fn decode_fixed<const N: usize>(text: &str) -> Result<[u8; N], String> {
    let stripped = text.strip_prefix("0x").unwrap_or(text);
    let bytes = hex::decode(stripped).map_err(|e| format!("invalid hex {text:?}: {e}"))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| format!("expected {N} bytes, got {} in {text:?}", b.len()))
}

pub(crate) fn parse_u64(text: &str) -> Result<u64, String> {
    let text = text.trim();
    if let Some(hex_part) = text.strip_prefix("0x") {
        u64::from_str_radix(hex_part, 16).map_err(|e| format!("invalid hex integer {text:?}: {e}"))
    } else {
        text.parse()
            .map_err(|e| format!("invalid integer {text:?}: {e}"))
    }
}

macro_rules! hex_array_serde {
    ($name:ident, $len:expr) => {
        pub mod $name {
            use serde::{Deserialize, Deserializer, Serializer};

            pub fn serialize<S>(bytes: &[u8; $len], serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
            }

            pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; $len], D::Error>
            where
                D: Deserializer<'de>,
            {
                let text = String::deserialize(deserializer)?;
                crate::loader::decode_fixed::<$len>(&text).map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_array_serde!(hex4, 4);
hex_array_serde!(hex20, 20);
hex_array_serde!(hex32, 32);
hex_array_serde!(hex48, 48);
hex_array_serde!(hex256, 256);

/// Variable-length byte strings (`extra_data`).
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        let stripped = text.strip_prefix("0x").unwrap_or(&text);
        hex::decode(stripped).map_err(serde::de::Error::custom)
    }
}

/// Lists of 32-byte hex strings (`block_roots`, `state_roots`, `randao_mixes`).
pub mod hex32_list {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(values: &Vec<[u8; 32]>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let hex_strings: Vec<String> = values
            .iter()
            .map(|v| format!("0x{}", hex::encode(v)))
            .collect();
        hex_strings.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<[u8; 32]>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex_strings: Vec<String> = Vec::deserialize(deserializer)?;
        hex_strings
            .into_iter()
            .map(|s| crate::loader::decode_fixed::<32>(&s).map_err(serde::de::Error::custom))
            .collect()
    }
}

/// Integers that may arrive as JSON numbers, decimal strings, or 0x-hex
/// strings; serialized back as decimal strings.
pub mod quoted_u64 {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    pub(super) enum Raw {
        Number(u64),
        Text(String),
    }

    impl Raw {
        pub(super) fn value(self) -> Result<u64, String> {
            match self {
                Raw::Number(n) => Ok(n),
                Raw::Text(s) => crate::loader::parse_u64(&s),
            }
        }
    }

    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        Raw::deserialize(deserializer)?
            .value()
            .map_err(serde::de::Error::custom)
    }
}

/// Lists of flexible integers (`balances`, `slashings`).
pub mod quoted_u64_list {
    use super::quoted_u64::Raw;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(values: &Vec<u64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let strings: Vec<String> = values.iter().map(u64::to_string).collect();
        strings.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Vec<Raw> = Vec::deserialize(deserializer)?;
        raw.into_iter()
            .map(|r| r.value().map_err(serde::de::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex32_accepts_both_prefixes() {
        let hex = "0x0102030405060708091011121314151617181920212223242526272829303132";
        let parsed = parse_hex32(hex).unwrap();
        assert_eq!(parsed[0], 0x01);
        assert_eq!(parsed[31], 0x32);
        assert_eq!(parse_hex32(&hex[2..]).unwrap(), parsed);
    }

    #[test]
    fn parse_hex32_rejects_wrong_length() {
        assert!(matches!(
            parse_hex32("0x0102"),
            Err(ProofError::InvalidInput(_))
        ));
    }

    #[test]
    fn integers_parse_from_all_wire_shapes() {
        assert_eq!(parse_u64("123").unwrap(), 123);
        assert_eq!(parse_u64("0x7b").unwrap(), 123);
        assert!(parse_u64("-1").is_err());
        assert!(parse_u64("abc").is_err());
    }

    #[test]
    fn state_parses_from_envelope_with_camel_case_keys() {
        let json = format!(
            r#"{{
              "data": {{
                "genesisValidatorsRoot": "0x{zero32}",
                "slot": "7530242",
                "fork": {{"previousVersion": "0x01000000", "currentVersion": "0x02000000", "epoch": "10"}},
                "latestBlockHeader": {{
                  "slot": "7530242",
                  "proposerIndex": "5",
                  "parentBlockRoot": "0x{one32}",
                  "stateRoot": "0x{zero32}",
                  "bodyRoot": "0x{one32}"
                }},
                "blockRoots": ["0x{one32}"],
                "stateRoots": ["0x{one32}"],
                "eth1Data": {{"depositRoot": "0x{zero32}", "depositCount": "0", "blockHash": "0x{zero32}"}},
                "eth1DepositIndex": "0x10",
                "latestExecutionPayloadHeader": {{
                  "parentHash": "0x{zero32}",
                  "feeRecipient": "0x{zero20}",
                  "stateRoot": "0x{zero32}",
                  "receiptsRoot": "0x{zero32}",
                  "logsBloom": "0x{zero256}",
                  "prevRandao": "0x{zero32}",
                  "blockNumber": "99",
                  "gasLimit": "30000000",
                  "gasUsed": "21000",
                  "timestamp": "1700000000",
                  "extraData": "0xd883",
                  "baseFeePerGas": "7",
                  "blockHash": "0x{zero32}",
                  "transactionsRoot": "0x{zero32}",
                  "withdrawalsRoot": "0x{zero32}",
                  "blobGasUsed": "0",
                  "excessBlobGas": "0"
                }},
                "validators": [{{
                  "pubkey": "0x{pubkey}",
                  "withdrawalCredentials": "0x{one32}",
                  "effectiveBalance": "250000000000000",
                  "slashed": false,
                  "activationEligibilityEpoch": "0",
                  "activationEpoch": "1",
                  "exitEpoch": "18446744073709551615",
                  "withdrawableEpoch": "18446744073709551615"
                }}],
                "balances": ["250000000000000"],
                "randaoMixes": ["0x{one32}"]
              }}
            }}"#,
            zero32 = "00".repeat(32),
            one32 = "11".repeat(32),
            zero20 = "00".repeat(20),
            zero256 = "00".repeat(256),
            pubkey = "8f".repeat(48),
        );

        let state = state_from_json(&json).unwrap();
        assert_eq!(state.slot, 7_530_242);
        assert_eq!(state.eth1_deposit_index, 16);
        assert_eq!(state.validators.len(), 1);
        assert_eq!(state.validators[0].effective_balance, 250_000_000_000_000);
        assert_eq!(state.validators[0].exit_epoch, u64::MAX);
        assert_eq!(state.balances, vec![250_000_000_000_000]);
        assert_eq!(state.latest_execution_payload_header.extra_data, vec![0xd8, 0x83]);
        // Absent trailing fields fall back to their defaults.
        assert_eq!(state.total_slashing, 0);
        assert!(state.pending_partial_withdrawals.is_empty());
        assert!(!state.prepared);
    }

    #[test]
    fn bare_state_without_envelope_also_parses() {
        let state = BeaconState::default();
        let json = serde_json::to_string(&state).unwrap();
        let reparsed = state_from_json(&json).unwrap();
        assert_eq!(state, reparsed);
    }

    #[test]
    fn malformed_document_is_invalid_input() {
        assert!(matches!(
            state_from_json("{not json"),
            Err(ProofError::InvalidInput(_))
        ));
        assert!(matches!(
            state_from_json(r#"{"data": {"slot": "zzz"}}"#),
            Err(ProofError::InvalidInput(_))
        ));
    }
}
