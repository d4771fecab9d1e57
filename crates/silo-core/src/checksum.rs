//! SHA-256 checksums for source-file change detection.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 content fingerprint of a byte slice.
///
/// Identical bytes always produce identical fingerprints, so a changed
/// fingerprint for the same file path means the file was modified since
/// last processing.
pub fn compute_checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();
    format!("{:x}", result)
}

/// Compute the structural fingerprint of a tabular source.
///
/// Hashes the ordered list of `name:type` column pairs, so reordering,
/// renaming, or retyping a column changes the fingerprint while row-level
/// edits do not. Used to flag schema drift as a non-fatal quality signal.
pub fn structural_fingerprint(columns: &[(String, String)]) -> String {
    let mut hasher = Sha256::new();
    for (name, dtype) in columns {
        hasher.update(name.as_bytes());
        hasher.update(b":");
        hasher.update(dtype.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
#[path = "checksum_test.rs"]
mod tests;
