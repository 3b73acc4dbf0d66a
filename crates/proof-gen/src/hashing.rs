//! Hash primitives for SSZ merkleization.
//!
//! Everything in this crate reduces to SHA-256 over 64-byte inputs. The
//! `ZERO_HASHES` table holds the root of an all-zero subtree for every depth,
//! so empty regions of large trees (e.g. the 2^40-leaf validator registry)
//! never have to be materialized.

use sha2::{Digest, Sha256};
use std::sync::LazyLock;

/// Maximum supported tree depth.
pub const MAX_DEPTH: usize = 64;

/// Precomputed zero-subtree roots.
///
/// `ZERO_HASHES[0]` is the zero chunk; `ZERO_HASHES[d]` is the root of a
/// depth-`d` tree whose leaves are all zero chunks.
pub static ZERO_HASHES: LazyLock<[[u8; 32]; MAX_DEPTH + 1]> = LazyLock::new(|| {
    let mut hashes = [[0u8; 32]; MAX_DEPTH + 1];
    for i in 1..=MAX_DEPTH {
        hashes[i] = hash_pair(&hashes[i - 1], &hashes[i - 1]);
    }
    hashes
});

/// SHA-256 of the 64-byte concatenation `left || right`.
pub fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}
