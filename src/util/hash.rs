//! Hashing utilities for download verification.

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};

/// Compute SHA256 hash of a byte slice.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Check `data` against an expected hex-encoded SHA256 (case-insensitive).
pub fn verify_sha256(data: &[u8], expected: &str) -> Result<()> {
    let actual = sha256_bytes(data);
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        bail!(
            "sha256 mismatch:\n  expected: {}\n  actual:   {}",
            expected,
            actual
        );
    }
    Ok(())
}
