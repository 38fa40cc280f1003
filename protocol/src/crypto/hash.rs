//! # Hashing Utilities
//!
//! SIGIL hashes exactly one way: SHA-256. It is the digest every ECDSA-P256
//! signing client in the field already computes, so the proof pipeline has
//! no room for a second function.
//!
//! The digest of a canonical payload is what gets signed, what gets
//! verified, and what public-key recovery runs against. Keep these helpers
//! boring.

use sha2::{Digest, Sha256};

use crate::config::HASH_OUTPUT_LENGTH;

/// Compute the SHA-256 digest of the input data as a fixed-size array.
///
/// # Example
///
/// ```
/// use sigil_protocol::crypto::sha256;
///
/// let digest = sha256(b"Test");
/// assert_eq!(digest.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; HASH_OUTPUT_LENGTH] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; HASH_OUTPUT_LENGTH];
    output.copy_from_slice(&result);
    output
}

/// SHA-256 rendered as lowercase hex. Handy for logging payload
/// fingerprints without dumping the payload itself.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}
