//! # DID Documents
//!
//! The data model for a SIGIL identity: the DID document, its verification
//! methods, and the purpose lists that say which key may do what.
//!
//! ## Document shape
//!
//! ```text
//! {
//!   "@context": ["https://www.w3.org/ns/did/v1"],
//!   "id": "did:example:tas",
//!   "controller": "did:example:tas",
//!   "created": "2024-05-19T04:32:03Z",
//!   "updated": "2024-05-19T04:32:03Z",
//!   "versionId": "1",
//!   "deactivated": false,
//!   "verificationMethod": [{ "id": "pin", "type": "Secp256r1VerificationKey2018", ... }],
//!   "capabilityInvocation": ["pin"],
//!   "service": [...]
//! }
//! ```
//!
//! ## Authorization policy
//!
//! Only keys listed in `capabilityInvocation` may authorize a mutation of a
//! document. [`DidDocument::resolve_signing_key`] checks membership in that
//! list *before* looking the key up, so an attacker probing for key ids
//! learns "not authorized" for every key that isn't, whether or not it
//! exists. The policy is fixed; there is no switch for it.
//!
//! ## Versions
//!
//! `versionId` travels as a decimal string for compatibility with existing
//! clients but is parsed into a [`VersionId`] (`u64`) at the boundary.
//! Ordering is numeric: `"10" > "9"`.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;
use thiserror::Error;

use super::status::DidStatus;
use crate::canonical::{CanonicalBytes, CanonicalError};
use crate::crypto::keys::{EcPublicKey, KeyError};
use crate::crypto::multibase::{self, MultibaseError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while working with DID documents.
#[derive(Debug, Error)]
pub enum DidError {
    /// The key is not listed in `capabilityInvocation`.
    #[error("key '{0}' is not authorized for capabilityInvocation")]
    KeyNotAuthorized(String),

    /// The key is authorized but no verification method carries its id.
    #[error("verification method '{0}' not found")]
    KeyNotFound(String),

    /// `switch_status` only understands the two in-service states.
    #[error("unsupported status for an in-service change: {0}")]
    UnsupportedStatus(DidStatus),

    /// The verification method's key type cannot verify P-256 proofs.
    #[error("unsupported key type for proof verification: {0}")]
    UnsupportedKeyType(KeyType),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(#[from] KeyError),

    #[error("invalid versionId '{0}': expected a positive decimal integer")]
    InvalidVersionId(String),

    #[error("invalid key URL '{0}': expected <did>?versionId=<n>#<keyId>")]
    KeyUrlParse(String),

    #[error("invalid document encoding: {0}")]
    Encoding(#[from] MultibaseError),

    #[error("invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("canonicalization failed: {0}")]
    Canonical(#[from] CanonicalError),
}

// ---------------------------------------------------------------------------
// VersionId
// ---------------------------------------------------------------------------

/// A document version: a positive integer compared numerically.
///
/// Serialized as a decimal string (`"12"`). Deserialization also accepts a
/// bare JSON number. Leading zeros, signs and whitespace are rejected so
/// that every version has exactly one textual form; the versioned ledger
/// key is built from that form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionId(u64);

impl VersionId {
    /// The version every new document starts at.
    pub const FIRST: VersionId = VersionId(1);

    /// `None` for zero.
    pub fn new(value: u64) -> Option<Self> {
        if value == 0 {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// The following version, or `None` at `u64::MAX`.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VersionId {
    type Err = DidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DidError::InvalidVersionId(s.to_string());

        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if s.len() > 1 && s.starts_with('0') {
            return Err(invalid());
        }
        let value: u64 = s.parse().map_err(|_| invalid())?;
        Self::new(value).ok_or_else(invalid)
    }
}

impl Serialize for VersionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct VersionIdVisitor;

        impl<'de> Visitor<'de> for VersionIdVisitor {
            type Value = VersionId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a positive integer version as a decimal string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<VersionId, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<VersionId, E> {
                VersionId::new(v).ok_or_else(|| E::custom("versionId must be positive"))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<VersionId, E> {
                u64::try_from(v)
                    .ok()
                    .and_then(VersionId::new)
                    .ok_or_else(|| E::custom("versionId must be positive"))
            }
        }

        deserializer.deserialize_any(VersionIdVisitor)
    }
}

// ---------------------------------------------------------------------------
// Closed vocabularies
// ---------------------------------------------------------------------------

/// Key and signature suite identifiers.
///
/// The `*VerificationKey2018` variants appear on verification methods, the
/// `*Signature2018` variants on proofs. Clients are not consistent about
/// which family they put in a proof's `type`, so both are accepted there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    RsaVerificationKey2018,
    Secp256k1VerificationKey2018,
    Secp256r1VerificationKey2018,
    RsaSignature2018,
    Secp256k1Signature2018,
    Secp256r1Signature2018,
}

impl KeyType {
    /// True for the NIST P-256 (secp256r1) suite, the only one proofs are
    /// checked against.
    pub fn is_p256(self) -> bool {
        matches!(
            self,
            Self::Secp256r1VerificationKey2018 | Self::Secp256r1Signature2018
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RsaVerificationKey2018 => "RsaVerificationKey2018",
            Self::Secp256k1VerificationKey2018 => "Secp256k1VerificationKey2018",
            Self::Secp256r1VerificationKey2018 => "Secp256r1VerificationKey2018",
            Self::RsaSignature2018 => "RsaSignature2018",
            Self::Secp256k1Signature2018 => "Secp256k1Signature2018",
            Self::Secp256r1Signature2018 => "Secp256r1Signature2018",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verification relationships a key can be listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProofPurpose {
    AssertionMethod,
    Authentication,
    KeyAgreement,
    CapabilityInvocation,
    CapabilityDelegation,
}

impl ProofPurpose {
    pub const ALL: [ProofPurpose; 5] = [
        Self::AssertionMethod,
        Self::Authentication,
        Self::KeyAgreement,
        Self::CapabilityInvocation,
        Self::CapabilityDelegation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AssertionMethod => "assertionMethod",
            Self::Authentication => "authentication",
            Self::KeyAgreement => "keyAgreement",
            Self::CapabilityInvocation => "capabilityInvocation",
            Self::CapabilityDelegation => "capabilityDelegation",
        }
    }
}

impl fmt::Display for ProofPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication factors a wallet demands before using a key.
///
/// A bitmask: `FREE | PIN` means either is acceptable. Values outside
/// `1..=7` are rejected by the schema validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthType(u8);

impl AuthType {
    pub const FREE: AuthType = AuthType(0b001);
    pub const PIN: AuthType = AuthType(0b010);
    pub const BIO: AuthType = AuthType(0b100);

    const ALL_BITS: u8 = 0b111;

    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: AuthType) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    /// At least one known factor and nothing else.
    pub fn is_valid(self) -> bool {
        self.0 != 0 && self.0 & !Self::ALL_BITS == 0
    }
}

impl BitOr for AuthType {
    type Output = AuthType;

    fn bitor(self, rhs: AuthType) -> AuthType {
        AuthType(self.0 | rhs.0)
    }
}

/// Service kinds a document may advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceType {
    LinkedDomains,
    #[serde(alias = "Credentialregistry")]
    CredentialRegistry,
}

// ---------------------------------------------------------------------------
// Document types
// ---------------------------------------------------------------------------

/// A service endpoint entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,

    #[serde(rename = "type")]
    pub service_type: ServiceType,

    pub service_endpoint: Vec<String>,
}

/// A verification method entry in a DID document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// Unique within the document. Usually a bare fragment like `"pin"`.
    pub id: String,

    #[serde(rename = "type")]
    pub key_type: KeyType,

    pub controller: String,

    /// Compressed public key in multibase.
    pub public_key_multibase: String,

    pub auth_type: AuthType,
}

impl VerificationMethod {
    /// Decode and decompress the published key.
    ///
    /// Only P-256 keys can be turned into an [`EcPublicKey`]; anything else
    /// is [`DidError::UnsupportedKeyType`].
    pub fn public_key(&self) -> Result<EcPublicKey, DidError> {
        if !self.key_type.is_p256() {
            return Err(DidError::UnsupportedKeyType(self.key_type));
        }
        Ok(EcPublicKey::from_multibase(&self.public_key_multibase)?)
    }
}

/// A DID document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    pub id: String,

    pub controller: String,

    pub created: String,

    pub updated: String,

    pub version_id: VersionId,

    #[serde(default)]
    pub deactivated: bool,

    pub verification_method: Vec<VerificationMethod>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertion_method: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authentication: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_agreement: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capability_invocation: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capability_delegation: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<Service>,
}

impl DidDocument {
    /// Parse a document from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self, DidError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serialize to JSON bytes (field order as declared, not canonical).
    pub fn to_json(&self) -> Result<Vec<u8>, DidError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode the `didDoc` field of an envelope: multibase, then JSON.
    pub fn from_multibase(encoded: &str) -> Result<Self, DidError> {
        let bytes = multibase::decode(encoded)?;
        Self::from_json(&bytes)
    }

    /// Encode for an envelope: canonical JSON, then base58btc multibase.
    pub fn to_multibase(&self) -> Result<String, DidError> {
        let canonical = CanonicalBytes::new(self)?;
        Ok(multibase::encode_base58btc(canonical.as_bytes()))
    }

    /// The key ids listed under `purpose`.
    pub fn purpose_keys(&self, purpose: ProofPurpose) -> &[String] {
        match purpose {
            ProofPurpose::AssertionMethod => &self.assertion_method,
            ProofPurpose::Authentication => &self.authentication,
            ProofPurpose::KeyAgreement => &self.key_agreement,
            ProofPurpose::CapabilityInvocation => &self.capability_invocation,
            ProofPurpose::CapabilityDelegation => &self.capability_delegation,
        }
    }

    /// Look a verification method up by id (bare fragment or absolute
    /// `did#fragment` form).
    pub fn verification_method(&self, key_id: &str) -> Option<&VerificationMethod> {
        self.verification_method
            .iter()
            .find(|vm| self.same_key(&vm.id, key_id))
    }

    /// Resolve the verification method allowed to sign mutations of this
    /// document.
    ///
    /// Fails with [`DidError::KeyNotAuthorized`] unless `key_id` is listed in
    /// `capabilityInvocation`, then with [`DidError::KeyNotFound`] unless a
    /// verification method carries that id.
    pub fn resolve_signing_key(&self, key_id: &str) -> Result<&VerificationMethod, DidError> {
        let authorized = self
            .capability_invocation
            .iter()
            .any(|entry| self.same_key(entry, key_id));
        if !authorized {
            return Err(DidError::KeyNotAuthorized(key_id.to_string()));
        }

        self.verification_method(key_id)
            .ok_or_else(|| DidError::KeyNotFound(key_id.to_string()))
    }

    /// Apply an in-service status to the `deactivated` flag.
    pub fn switch_status(&mut self, target: DidStatus) -> Result<(), DidError> {
        match target {
            DidStatus::Activated => self.deactivated = false,
            DidStatus::Deactivated => self.deactivated = true,
            other => return Err(DidError::UnsupportedStatus(other)),
        }
        Ok(())
    }

    /// `entry` names the same key as `key_id`, either verbatim or as
    /// `<this did>#<key_id>`.
    fn same_key(&self, entry: &str, key_id: &str) -> bool {
        if entry == key_id {
            return true;
        }
        entry
            .strip_prefix(self.id.as_str())
            .and_then(|rest| rest.strip_prefix('#'))
            .map_or(false, |fragment| fragment == key_id)
    }
}

// ---------------------------------------------------------------------------
// DidKeyUrl
// ---------------------------------------------------------------------------

/// A reference to one key of one document version:
/// `<did>?versionId=<n>#<keyId>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DidKeyUrl {
    pub did: String,
    pub version_id: VersionId,
    pub key_id: String,
}

impl DidKeyUrl {
    pub fn new(did: impl Into<String>, version_id: VersionId, key_id: impl Into<String>) -> Self {
        Self {
            did: did.into(),
            version_id,
            key_id: key_id.into(),
        }
    }

    /// Parse a key URL. Both `versionId=` and `#` must appear exactly once,
    /// in that order, and neither the version nor the key id may be empty.
    pub fn parse(url: &str) -> Result<Self, DidError> {
        let invalid = || DidError::KeyUrlParse(url.to_string());

        let mut halves = url.split("versionId=");
        let (head, tail) = match (halves.next(), halves.next(), halves.next()) {
            (Some(head), Some(tail), None) => (head, tail),
            _ => return Err(invalid()),
        };

        let mut parts = tail.split('#');
        let (version, key_id) = match (parts.next(), parts.next(), parts.next()) {
            (Some(version), Some(key_id), None) if !key_id.is_empty() => (version, key_id),
            _ => return Err(invalid()),
        };

        let version_id: VersionId = version.parse().map_err(|_| invalid())?;
        let did = head
            .strip_suffix('?')
            .or_else(|| head.strip_suffix('&'))
            .unwrap_or(head);

        Ok(Self::new(did, version_id, key_id))
    }
}

impl fmt::Display for DidKeyUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}?versionId={}#{}", self.did, self.version_id, self.key_id)
    }
}

impl FromStr for DidKeyUrl {
    type Err = DidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
