//! # Key Management
//!
//! NIST P-256 keypairs, SEC1 point compression, and public-key recovery for
//! SIGIL identities.
//!
//! Every verification method in a DID document publishes its key as a
//! 33-byte compressed point wrapped in multibase. The lifecycle engine has
//! to turn that back into a full curve point before it can check a proof,
//! so decompression is on the hot path of every document mutation.
//!
//! ## Decompression
//!
//! A compressed key is `prefix || X`, where the prefix records the parity
//! of `Y` (`0x02` even, `0x03` odd). Recovering `Y` means solving
//!
//! ```text
//! y² = x³ − 3x + b  (mod p)
//! ```
//!
//! For P-256, `p ≡ 3 (mod 4)`, so a square root (when one exists) is
//! `rhs^((p+1)/4) mod p`. The two roots are `y` and `p − y`; the prefix
//! picks one. The resulting point is handed to `p256` for on-curve
//! validation before anything trusts it.
//!
//! ## Recovery
//!
//! Given a digest and an `(r, s)` signature, two keys are consistent with
//! `r`: one per parity of the ephemeral point `R`. [`recover_candidates`]
//! returns both and decides nothing. [`select_authorized`] is the policy
//! that picks one: the candidate that matches a key the caller already
//! trusts.
//!
//! ## Security considerations
//!
//! - Key generation uses `OsRng`.
//! - Secret key bytes are never logged. Nothing in this module logs at all.

use ecdsa::RecoveryId;
use num_bigint::BigUint;
use p256::ecdsa::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use std::fmt;
use thiserror::Error;

use super::multibase::{self, MultibaseError};
use super::signatures::EcSignature;
use crate::config::{
    COMPRESSED_KEY_LENGTH, COMPRESSED_PREFIX_EVEN, COMPRESSED_PREFIX_ODD, P256_COORDINATE_BYTES,
    UNCOMPRESSED_KEY_LENGTH,
};

/// P-256 field prime `p = 2^256 − 2^224 + 2^192 + 2^96 − 1`.
const P256_FIELD_PRIME: [u8; P256_COORDINATE_BYTES] = [
    0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
];

/// P-256 curve coefficient `b`.
const P256_COEFFICIENT_B: [u8; P256_COORDINATE_BYTES] = [
    0x5a, 0xc6, 0x35, 0xd8, 0xaa, 0x3a, 0x93, 0xe7, 0xb3, 0xeb, 0xbd, 0x55, 0x76, 0x98, 0x86, 0xbc,
    0x65, 0x1d, 0x06, 0xb0, 0xcc, 0x53, 0xb0, 0xf6, 0x3b, 0xce, 0x3c, 0x3e, 0x27, 0xd2, 0x60, 0x4b,
];

/// Errors that can occur during key operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid key size: expected {expected} bytes, got {actual}")]
    InvalidKeySize { expected: usize, actual: usize },

    #[error("invalid key format: {0}")]
    InvalidKeyFormat(&'static str),

    #[error("public key recovery failed: no point exists for the given coordinate")]
    RecoveryFailed,

    #[error("invalid secret key bytes: wrong length or not a valid scalar")]
    InvalidSecretKey,

    #[error("invalid multibase public key: {0}")]
    Multibase(#[from] MultibaseError),
}

// ---------------------------------------------------------------------------
// EcKeypair
// ---------------------------------------------------------------------------

/// A P-256 signing keypair.
///
/// `EcKeypair` does not implement `Serialize`. Secret material is exported
/// only through [`secret_key_bytes`](Self::secret_key_bytes).
pub struct EcKeypair {
    signing_key: SigningKey,
}

impl EcKeypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Reconstruct a keypair from a 32-byte big-endian secret scalar.
    ///
    /// Fails for zero and for values at or above the group order.
    pub fn from_bytes(secret: &[u8; P256_COORDINATE_BYTES]) -> Result<Self, KeyError> {
        let signing_key = SigningKey::from_slice(secret).map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self { signing_key })
    }

    /// Reconstruct a keypair from a hex-encoded secret scalar. This is the
    /// on-disk format `sigil-node init` writes.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|_| KeyError::InvalidSecretKey)?;
        let secret: [u8; P256_COORDINATE_BYTES] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey)?;
        Self::from_bytes(&secret)
    }

    /// The public half of this keypair.
    pub fn public_key(&self) -> EcPublicKey {
        EcPublicKey {
            key: self.signing_key.verifying_key().clone(),
        }
    }

    /// Export the raw 32-byte secret scalar. Handle with care.
    pub fn secret_key_bytes(&self) -> [u8; P256_COORDINATE_BYTES] {
        let mut out = [0u8; P256_COORDINATE_BYTES];
        out.copy_from_slice(&self.signing_key.to_bytes());
        out
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

impl fmt::Debug for EcKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the secret.
        f.debug_struct("EcKeypair")
            .field("public_key", &self.public_key())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// EcPublicKey
// ---------------------------------------------------------------------------

/// A validated P-256 public key.
///
/// Construction always goes through `p256`'s point validation, so holding
/// an `EcPublicKey` means holding a point that is on the curve and is not
/// the identity.
#[derive(Clone, PartialEq, Eq)]
pub struct EcPublicKey {
    key: VerifyingKey,
}

impl EcPublicKey {
    /// Compress to the 33-byte SEC1 form: parity prefix, then big-endian X.
    pub fn compress(&self) -> [u8; COMPRESSED_KEY_LENGTH] {
        // 0x04 || X || Y, both coordinates already zero-padded to 32 bytes.
        let point = self.key.to_encoded_point(false);
        let sec1 = point.as_bytes();
        let x = &sec1[1..1 + P256_COORDINATE_BYTES];
        let y = &sec1[1 + P256_COORDINATE_BYTES..];

        let mut out = [0u8; COMPRESSED_KEY_LENGTH];
        out[0] = if y[P256_COORDINATE_BYTES - 1] & 1 == 1 {
            COMPRESSED_PREFIX_ODD
        } else {
            COMPRESSED_PREFIX_EVEN
        };
        out[1..].copy_from_slice(x);
        out
    }

    /// Decompress a 33-byte SEC1 key by solving the curve equation for Y.
    pub fn decompress(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != COMPRESSED_KEY_LENGTH {
            return Err(KeyError::InvalidKeySize {
                expected: COMPRESSED_KEY_LENGTH,
                actual: bytes.len(),
            });
        }

        let prefix = bytes[0];
        if prefix != COMPRESSED_PREFIX_EVEN && prefix != COMPRESSED_PREFIX_ODD {
            return Err(KeyError::InvalidKeyFormat("compressed prefix must be 0x02 or 0x03"));
        }

        let p = BigUint::from_bytes_be(&P256_FIELD_PRIME);
        let x = BigUint::from_bytes_be(&bytes[1..]);
        if x >= p {
            return Err(KeyError::InvalidKeyFormat("x coordinate is not a field element"));
        }

        let rhs = curve_rhs(&x, &p);
        let root = mod_sqrt(&rhs, &p).ok_or(KeyError::RecoveryFailed)?;

        let want_odd = prefix == COMPRESSED_PREFIX_ODD;
        let y = if is_odd(&root) == want_odd {
            root
        } else {
            (&p - &root) % &p
        };

        let mut sec1 = [0u8; UNCOMPRESSED_KEY_LENGTH];
        sec1[0] = 0x04;
        sec1[1..1 + P256_COORDINATE_BYTES].copy_from_slice(&bytes[1..]);
        write_be_padded(&y, &mut sec1[1 + P256_COORDINATE_BYTES..]);

        let key = VerifyingKey::from_sec1_bytes(&sec1)
            .map_err(|_| KeyError::InvalidKeyFormat("point is not on the curve"))?;
        Ok(Self { key })
    }

    /// The `publicKeyMultibase` form: base58btc over the compressed point.
    pub fn to_multibase(&self) -> String {
        multibase::encode_base58btc(&self.compress())
    }

    /// Decode a `publicKeyMultibase` value in any supported base.
    pub fn from_multibase(encoded: &str) -> Result<Self, KeyError> {
        let bytes = multibase::decode(encoded)?;
        Self::decompress(&bytes)
    }

    /// Hex of the compressed point.
    pub fn to_hex(&self) -> String {
        hex::encode(self.compress())
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.key
    }
}

impl fmt::Debug for EcPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EcPublicKey({})", self.to_hex())
    }
}

impl fmt::Display for EcPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_multibase())
    }
}

// ---------------------------------------------------------------------------
// Recovery
// ---------------------------------------------------------------------------

/// Recover both public keys consistent with `signature` over `digest`.
///
/// The first candidate comes from the even-`R` point (recovery id 0), the
/// second from the odd one (recovery id 1). Exactly one of them signed the
/// digest; this function does not know which.
pub fn recover_candidates(
    digest: &[u8],
    signature: &EcSignature,
) -> Result<(EcPublicKey, EcPublicKey), KeyError> {
    let sig = signature.to_p256().ok_or(KeyError::RecoveryFailed)?;

    let recover = |y_odd: bool| {
        VerifyingKey::recover_from_prehash(digest, &sig, RecoveryId::new(y_odd, false))
            .map(|key| EcPublicKey { key })
            .map_err(|_| KeyError::RecoveryFailed)
    };

    Ok((recover(false)?, recover(true)?))
}

/// Pick the recovered candidate that matches a key the caller trusts.
///
/// Returns `None` when neither candidate is in `authorized`. Both matching
/// is impossible for distinct candidates, so the first match wins.
pub fn select_authorized(
    candidates: &(EcPublicKey, EcPublicKey),
    authorized: &[EcPublicKey],
) -> Option<EcPublicKey> {
    [&candidates.0, &candidates.1]
        .into_iter()
        .find(|candidate| authorized.contains(candidate))
        .cloned()
}

// ---------------------------------------------------------------------------
// Field arithmetic helpers
// ---------------------------------------------------------------------------

/// `x³ − 3x + b mod p`, with `−3x` computed as `3(p − x)` to stay unsigned.
fn curve_rhs(x: &BigUint, p: &BigUint) -> BigUint {
    let three = BigUint::from(3u32);
    let b = BigUint::from_bytes_be(&P256_COEFFICIENT_B);
    let x_cubed = x.modpow(&three, p);
    let minus_three_x = (&three * (p - x)) % p;
    (x_cubed + minus_three_x + b) % p
}

/// Square root modulo `p` for `p ≡ 3 (mod 4)`. `None` for non-residues.
fn mod_sqrt(value: &BigUint, p: &BigUint) -> Option<BigUint> {
    let exponent = (p + 1u32) >> 2;
    let root = value.modpow(&exponent, p);
    if (&root * &root) % p == *value {
        Some(root)
    } else {
        None
    }
}

fn is_odd(value: &BigUint) -> bool {
    value
        .to_bytes_be()
        .last()
        .map_or(false, |byte| byte & 1 == 1)
}

/// Write `value` big-endian into `out`, left-padded with zeros. Callers
/// guarantee `value < p`, so it always fits.
fn write_be_padded(value: &BigUint, out: &mut [u8]) {
    let be = value.to_bytes_be();
    let width = out.len();
    let start = width.saturating_sub(be.len());
    out[start..].copy_from_slice(&be[be.len() + start - width..]);
}
