//! # Digital Signatures
//!
//! ECDSA over P-256 with SHA-256: the signature scheme behind every DID
//! document proof.
//!
//! ## Encoding
//!
//! A signature is the pair `(r, s)`, each a 32-byte big-endian integer,
//! concatenated: 64 bytes, no ASN.1, no length prefix. The mobile signing
//! SDKs put a one-byte recovery header in front (`31 + recovery_id`), so the
//! wire form of a proof value is usually 65 bytes. [`EcSignature::from_wire`]
//! accepts both shapes; the header is informational and never trusted.
//!
//! ## Determinism
//!
//! Nonces come from RFC 6979, so signing the same payload with the same key
//! always yields the same bytes. The lifecycle engine itself only ever
//! verifies.
//!
//! ## Failure mode
//!
//! Verification fails closed. A signature of the wrong length, a scalar out
//! of range, a mismatched key: all of these are `false`, never a panic.

use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::Signature;
use std::fmt;
use thiserror::Error;

use super::hash::sha256;
use super::keys::{recover_candidates, EcKeypair, EcPublicKey};
use super::multibase;
use crate::config::{RECOVERABLE_SIGNATURE_LENGTH, RECOVERY_HEADER_BASE, SIGNATURE_LENGTH};

/// Errors during signature operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature verification failed")]
    VerificationFailed,

    #[error("invalid signature bytes: expected 64 or 65 bytes, got {0}")]
    InvalidSignatureBytes(usize),

    #[error("invalid signature encoding: {0}")]
    InvalidEncoding(String),

    #[error("could not determine the recovery id for a fresh signature")]
    RecoveryIdUnavailable,
}

/// A fixed-width `r || s` ECDSA signature.
#[derive(Clone, PartialEq, Eq)]
pub struct EcSignature {
    bytes: [u8; SIGNATURE_LENGTH],
}

impl EcSignature {
    /// Accept exactly 64 raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        let bytes: [u8; SIGNATURE_LENGTH] = bytes
            .try_into()
            .map_err(|_| SignatureError::InvalidSignatureBytes(bytes.len()))?;
        Ok(Self { bytes })
    }

    /// Accept the wire form: 64 raw bytes, or 65 with a leading recovery
    /// header that is dropped.
    pub fn from_wire(bytes: &[u8]) -> Result<Self, SignatureError> {
        match bytes.len() {
            SIGNATURE_LENGTH => Self::from_bytes(bytes),
            RECOVERABLE_SIGNATURE_LENGTH => Self::from_bytes(&bytes[1..]),
            other => Err(SignatureError::InvalidSignatureBytes(other)),
        }
    }

    /// Decode a multibase `proofValue`.
    pub fn from_multibase(encoded: &str) -> Result<Self, SignatureError> {
        let bytes = multibase::decode(encoded)
            .map_err(|e| SignatureError::InvalidEncoding(e.to_string()))?;
        Self::from_wire(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.bytes
    }

    /// The big-endian `r` half.
    pub fn r(&self) -> &[u8] {
        &self.bytes[..SIGNATURE_LENGTH / 2]
    }

    /// The big-endian `s` half.
    pub fn s(&self) -> &[u8] {
        &self.bytes[SIGNATURE_LENGTH / 2..]
    }

    /// `None` when `r` or `s` is zero or not below the group order.
    pub(crate) fn to_p256(&self) -> Option<Signature> {
        Signature::from_slice(&self.bytes).ok()
    }
}

impl fmt::Debug for EcSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EcSignature({})", hex::encode(self.bytes))
    }
}

/// A signature together with the recovery id that selects the signer among
/// the two keys [`recover_candidates`] yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoverableSignature {
    pub signature: EcSignature,
    pub recovery_id: u8,
}

impl RecoverableSignature {
    /// The 65-byte wire form: `31 + recovery_id`, then `r || s`.
    pub fn to_wire_bytes(&self) -> [u8; RECOVERABLE_SIGNATURE_LENGTH] {
        let mut out = [0u8; RECOVERABLE_SIGNATURE_LENGTH];
        out[0] = RECOVERY_HEADER_BASE + self.recovery_id;
        out[1..].copy_from_slice(self.signature.as_bytes());
        out
    }

    /// The `proofValue` form: base58btc over the wire bytes.
    pub fn to_multibase(&self) -> String {
        multibase::encode_base58btc(&self.to_wire_bytes())
    }
}

// ---------------------------------------------------------------------------
// Sign / verify
// ---------------------------------------------------------------------------

/// Sign `payload` with SHA-256 + ECDSA-P256 and RFC 6979 nonces.
///
/// # Example
///
/// ```
/// use sigil_protocol::crypto::{sign, verify, EcKeypair};
///
/// let keypair = EcKeypair::generate();
/// let signature = sign(&keypair, b"{\"id\":\"did:example:1\"}");
/// assert!(verify(&keypair.public_key(), b"{\"id\":\"did:example:1\"}", &signature));
/// ```
pub fn sign(keypair: &EcKeypair, payload: &[u8]) -> EcSignature {
    let signature: Signature = keypair.signing_key().sign(payload);
    let mut bytes = [0u8; SIGNATURE_LENGTH];
    bytes.copy_from_slice(&signature.to_bytes());
    EcSignature { bytes }
}

/// Sign and work out the recovery id by matching the recovered candidates
/// against the signer's own key.
pub fn sign_recoverable(
    keypair: &EcKeypair,
    payload: &[u8],
) -> Result<RecoverableSignature, SignatureError> {
    let signature = sign(keypair, payload);
    let (even, odd) = recover_candidates(&sha256(payload), &signature)
        .map_err(|_| SignatureError::RecoveryIdUnavailable)?;

    let own = keypair.public_key();
    let recovery_id = if even == own {
        0
    } else if odd == own {
        1
    } else {
        return Err(SignatureError::RecoveryIdUnavailable);
    };

    Ok(RecoverableSignature {
        signature,
        recovery_id,
    })
}

/// Verify `signature` over `payload`. Returns `false` on any failure.
pub fn verify(public_key: &EcPublicKey, payload: &[u8], signature: &EcSignature) -> bool {
    match signature.to_p256() {
        Some(sig) => public_key.verifying_key().verify(payload, &sig).is_ok(),
        None => false,
    }
}

/// Verify a signature straight off the wire (64 or 65 bytes).
///
/// Any other length is simply `false`.
pub fn verify_raw(public_key: &EcPublicKey, payload: &[u8], signature_bytes: &[u8]) -> bool {
    match EcSignature::from_wire(signature_bytes) {
        Ok(signature) => verify(public_key, payload, &signature),
        Err(_) => false,
    }
}

/// Like [`verify`], but as a `Result` for `?`-heavy call sites.
pub fn verify_strict(
    public_key: &EcPublicKey,
    payload: &[u8],
    signature: &EcSignature,
) -> Result<(), SignatureError> {
    if verify(public_key, payload, signature) {
        Ok(())
    } else {
        Err(SignatureError::VerificationFailed)
    }
}
