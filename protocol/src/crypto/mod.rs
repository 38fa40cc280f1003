//! # Cryptographic Primitives for SIGIL
//!
//! Every proof that authorizes a DID document mutation flows through here:
//! a SHA-256 digest of the canonical payload, an ECDSA signature on NIST
//! P-256, and a 33-byte compressed public key published in the controller's
//! document.
//!
//! - **keys**: P-256 keypairs, SEC1 point compression and decompression,
//!   public-key recovery from a signature.
//! - **signatures**: fixed-width `r || s` ECDSA signing and verification.
//! - **hash**: SHA-256, the only digest the proof pipeline uses.
//! - **multibase**: the self-describing text encodings keys, proofs and
//!   document payloads travel in.
//!
//! ## A note on "rolling your own crypto"
//!
//! We don't. Signing, verification and recovery are thin wrappers around
//! the RustCrypto `p256` and `ecdsa` crates. The one piece of curve
//! arithmetic done by hand is point decompression, and it is checked
//! against `p256`'s own point validation before anything trusts it.

pub mod hash;
pub mod keys;
pub mod multibase;
pub mod signatures;

pub use hash::{sha256, sha256_hex};
pub use keys::{recover_candidates, select_authorized, EcKeypair, EcPublicKey, KeyError};
pub use multibase::{MultibaseEncoding, MultibaseError};
pub use signatures::{sign, verify, EcSignature, SignatureError};
