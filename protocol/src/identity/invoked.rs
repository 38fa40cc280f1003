//! # Invoked Documents
//!
//! An [`InvokedDocument`] is the signed envelope a client submits to create
//! or update a DID document:
//!
//! ```text
//! {
//!   "didDoc":     "z<base58btc of canonical DID document JSON>",
//!   "proof": {
//!     "type":               "Secp256r1Signature2018",
//!     "created":            "2024-05-19T04:32:03Z",
//!     "verificationMethod": "did:example:tas?versionId=1#pin",
//!     "proofPurpose":       "capabilityInvocation",
//!     "proofValue":         "z<base58btc of 65-byte signature>"
//!   },
//!   "controller": { "did": "did:example:tas", "certVcRef": "https://..." },
//!   "nonce":      "8f1c..."
//! }
//! ```
//!
//! The signed bytes are the canonical JSON of the whole envelope with
//! `proofValue` left out. The key that signs is named by
//! `proof.verificationMethod` and lives in the *controller's* document at
//! the referenced version, which may well be a different DID.
//!
//! [`InvokedDocumentBuilder`] produces envelopes the same way clients do;
//! the node's `sign` command and the test suites use it.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::did::{DidDocument, DidError, DidKeyUrl, KeyType, ProofPurpose};
use crate::canonical::{CanonicalBytes, CanonicalError};
use crate::crypto::keys::EcKeypair;
use crate::crypto::signatures::{self, EcSignature, SignatureError};

/// Errors from building or checking an envelope's proof.
#[derive(Debug, Error)]
pub enum ProofError {
    #[error("envelope is missing {0}")]
    MissingField(&'static str),

    #[error("proof has no proofValue")]
    MissingProofValue,

    #[error(transparent)]
    Document(#[from] DidError),

    #[error(transparent)]
    Canonical(#[from] CanonicalError),

    #[error(transparent)]
    Signature(#[from] SignatureError),
}

/// The party that controls a document and signs its envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub did: String,
    pub cert_vc_ref: String,
}

/// The proof block of an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeProof {
    #[serde(rename = "type")]
    pub key_type: KeyType,

    pub created: String,

    /// A key URL, `<did>?versionId=<n>#<keyId>`.
    pub verification_method: String,

    pub proof_purpose: ProofPurpose,

    #[serde(default, skip_serializing_if = "is_absent")]
    pub proof_value: Option<String>,
}

fn is_absent(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

/// A signed request to create or update a DID document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokedDocument {
    /// Multibase-encoded DID document JSON.
    pub did_doc: String,

    pub proof: InvokeProof,

    pub controller: Provider,

    pub nonce: String,
}

impl InvokedDocument {
    /// Parse an envelope from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self, DidError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Decode the embedded document.
    pub fn document(&self) -> Result<DidDocument, DidError> {
        DidDocument::from_multibase(&self.did_doc)
    }

    /// Parse `proof.verificationMethod`.
    pub fn key_url(&self) -> Result<DidKeyUrl, DidError> {
        DidKeyUrl::parse(&self.proof.verification_method)
    }

    /// The bytes the proof signs: the canonical envelope without
    /// `proofValue`.
    pub fn signing_payload(&self) -> Result<CanonicalBytes, CanonicalError> {
        let mut unsigned = self.clone();
        unsigned.proof.proof_value = None;
        CanonicalBytes::new(&unsigned)
    }

    /// Decode `proofValue` into a signature. Both the 65-byte recoverable
    /// form and a bare 64-byte `r || s` are accepted.
    pub fn proof_signature(&self) -> Result<EcSignature, ProofError> {
        let encoded = self
            .proof
            .proof_value
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or(ProofError::MissingProofValue)?;
        Ok(EcSignature::from_multibase(encoded)?)
    }

    /// Check the proof against `key_id` in the signer's document.
    ///
    /// The key must be listed in the signer's `capabilityInvocation` and be
    /// a P-256 key; the signature must verify over [`Self::signing_payload`].
    /// The declared `proofPurpose` is signed but not checked: authority comes
    /// from where the key sits in the signer's document.
    pub fn verify_with(&self, signer: &DidDocument, key_id: &str) -> Result<(), ProofError> {
        let method = signer.resolve_signing_key(key_id)?;
        let public_key = method.public_key()?;
        let signature = self.proof_signature()?;
        let payload = self.signing_payload()?;

        signatures::verify_strict(&public_key, payload.as_bytes(), &signature)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// InvokedDocumentBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for signed envelopes.
///
/// ```rust,no_run
/// use sigil_protocol::crypto::EcKeypair;
/// use sigil_protocol::identity::{DidKeyUrl, InvokedDocumentBuilder, VersionId};
/// # fn demo(doc: sigil_protocol::identity::DidDocument, keypair: EcKeypair) {
/// let envelope = InvokedDocumentBuilder::new(doc)
///     .controller("did:example:tas", "https://example.org/vc/tas")
///     .verification_method(DidKeyUrl::new("did:example:tas", VersionId::FIRST, "pin"))
///     .sign(&keypair)
///     .unwrap();
/// # }
/// ```
///
/// `created` defaults to the current UTC time and `nonce` to 16 random
/// bytes in hex. Both can be pinned for reproducible output.
pub struct InvokedDocumentBuilder {
    document: DidDocument,
    controller: Option<Provider>,
    verification_method: Option<DidKeyUrl>,
    key_type: KeyType,
    proof_purpose: ProofPurpose,
    created: Option<String>,
    nonce: Option<String>,
}

impl InvokedDocumentBuilder {
    pub fn new(document: DidDocument) -> Self {
        Self {
            document,
            controller: None,
            verification_method: None,
            key_type: KeyType::Secp256r1Signature2018,
            proof_purpose: ProofPurpose::CapabilityInvocation,
            created: None,
            nonce: None,
        }
    }

    pub fn controller(mut self, did: &str, cert_vc_ref: &str) -> Self {
        self.controller = Some(Provider {
            did: did.to_string(),
            cert_vc_ref: cert_vc_ref.to_string(),
        });
        self
    }

    pub fn verification_method(mut self, key_url: DidKeyUrl) -> Self {
        self.verification_method = Some(key_url);
        self
    }

    pub fn key_type(mut self, key_type: KeyType) -> Self {
        self.key_type = key_type;
        self
    }

    pub fn proof_purpose(mut self, purpose: ProofPurpose) -> Self {
        self.proof_purpose = purpose;
        self
    }

    pub fn created(mut self, created: &str) -> Self {
        self.created = Some(created.to_string());
        self
    }

    pub fn nonce(mut self, nonce: &str) -> Self {
        self.nonce = Some(nonce.to_string());
        self
    }

    /// Assemble the envelope without a `proofValue`.
    pub fn build_unsigned(self) -> Result<InvokedDocument, ProofError> {
        let controller = self.controller.ok_or(ProofError::MissingField("controller"))?;
        let key_url = self
            .verification_method
            .ok_or(ProofError::MissingField("proof.verificationMethod"))?;

        let created = self
            .created
            .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
        let nonce = self
            .nonce
            .unwrap_or_else(|| hex::encode(rand::random::<[u8; 16]>()));

        Ok(InvokedDocument {
            did_doc: self.document.to_multibase()?,
            proof: InvokeProof {
                key_type: self.key_type,
                created,
                verification_method: key_url.to_string(),
                proof_purpose: self.proof_purpose,
                proof_value: None,
            },
            controller,
            nonce,
        })
    }

    /// Assemble and sign, producing the 65-byte recoverable proof value.
    pub fn sign(self, keypair: &EcKeypair) -> Result<InvokedDocument, ProofError> {
        let mut envelope = self.build_unsigned()?;
        sign_envelope(&mut envelope, keypair)?;
        Ok(envelope)
    }
}

/// (Re)sign an envelope in place, replacing any existing `proofValue`.
pub fn sign_envelope(envelope: &mut InvokedDocument, keypair: &EcKeypair) -> Result<(), ProofError> {
    let payload = envelope.signing_payload()?;
    let signature = signatures::sign_recoverable(keypair, payload.as_bytes())?;
    envelope.proof.proof_value = Some(signature.to_multibase());
    Ok(())
}
