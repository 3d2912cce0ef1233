//! Plaintext fingerprints.

use sha2::{Digest, Sha256};
use vault_types::ContentHash;

/// SHA-256 fingerprint of raw bytes.
pub fn fingerprint(bytes: &[u8]) -> ContentHash {
    let digest = Sha256::digest(bytes);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    ContentHash::from_bytes(out)
}

/// Recompute the fingerprint of `bytes` and compare it with `expected`.
pub fn verify_integrity(bytes: &[u8], expected: &ContentHash) -> bool {
    fingerprint(bytes) == *expected
}
