//! # DID Document Lifecycle Contract
//!
//! Registration, reads and status changes for DID documents. The flow for
//! a registration is:
//!
//! 1. **Authorize**: unless the declared role is `Tas`, the envelope's
//!    controller must already be registered and the proof must verify
//!    against the controller's key at the version the key URL names.
//! 2. **Decode**: the multibase payload becomes a [`DidDocument`] and
//!    passes schema validation.
//! 3. **Create or update**: a DID with no status record is created
//!    (ACTIVATED, at the document's version). Otherwise the new version
//!    must be strictly greater than the stored one; the old latest is
//!    archived under its versioned key and the status record advances.
//!
//! Every mutating operation stages its writes in a
//! [`LedgerTransaction`] and commits only after all checks pass. A
//! rejected request writes nothing.
//!
//! ## Reads
//!
//! A read for no particular version, or for the version the status record
//! points at, returns the latest document. Any other version returns the
//! archived snapshot. A missing record is `Ok(None)`, never an error.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use sigil_protocol::identity::{
    DidDocument, DidStatus, DocumentStatus, InvokedDocument, RoleType, SchemaValidator,
    StatusError, VersionId,
};
use sigil_protocol::storage::{Ledger, LedgerError, LedgerKey, LedgerTransaction};

use crate::error::ContractError;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A document snapshot together with its DID's current status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentAndStatus {
    pub document: DidDocument,
    pub status: DidStatus,
}

/// What a successful registration did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum RegistrationOutcome {
    /// First registration of this DID.
    Created { did: String, version: VersionId },
    /// A newer version replaced the latest document.
    #[serde(rename_all = "camelCase")]
    Updated {
        did: String,
        previous_version: VersionId,
        version: VersionId,
    },
}

impl RegistrationOutcome {
    pub fn did(&self) -> &str {
        match self {
            Self::Created { did, .. } | Self::Updated { did, .. } => did,
        }
    }

    pub fn version(&self) -> VersionId {
        match self {
            Self::Created { version, .. } | Self::Updated { version, .. } => *version,
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentContract
// ---------------------------------------------------------------------------

/// The DID document lifecycle operations.
#[derive(Debug, Clone, Default)]
pub struct DocumentContract {
    validator: SchemaValidator,
}

impl DocumentContract {
    pub fn new(validator: SchemaValidator) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> &SchemaValidator {
        &self.validator
    }

    /// Create or update a DID document from a signed envelope.
    ///
    /// `role` is recorded on creation and ignored on update.
    ///
    /// # Errors
    ///
    /// - [`ContractError::ProviderInvalid`] if the controller isn't registered.
    /// - [`ContractError::KeyUrlParse`] for a malformed `verificationMethod`.
    /// - [`ContractError::SignatureVerification`] /
    ///   [`ContractError::SignerUnavailable`] if the proof doesn't check out.
    /// - [`ContractError::DocumentConvert`] if the payload doesn't decode or
    ///   validate.
    /// - [`ContractError::VersionIdInvalid`] if an update doesn't advance
    ///   the version.
    pub fn register_document<L: Ledger>(
        &self,
        ledger: &mut L,
        envelope: &InvokedDocument,
        role: RoleType,
    ) -> Result<RegistrationOutcome, ContractError> {
        let mut tx = LedgerTransaction::new(ledger);

        if role.is_trust_anchor() {
            debug!(controller = %envelope.controller.did, "trust anchor registration, proof not checked");
        } else {
            verify_envelope(&tx, envelope)?;
        }

        let document = envelope
            .document()
            .map_err(|e| ContractError::DocumentConvert(e.to_string()))?;
        self.validator
            .validate_document(&document)
            .map_err(|e| ContractError::DocumentConvert(e.to_string()))?;

        let did = document.id.clone();
        let version = document.version_id;
        let status_key = LedgerKey::document_status(&did);
        let latest_key = LedgerKey::latest_document(&did);

        let outcome = match read_status(&tx, &did)? {
            None => {
                tx.insert(&latest_key, &document)
                    .map_err(ContractError::DocumentInsert)?;
                tx.insert(&status_key, &DocumentStatus::new(&did, version, role))
                    .map_err(ContractError::StatusInsert)?;
                RegistrationOutcome::Created { did, version }
            }
            Some(mut status) => {
                let stored: DidDocument = tx.get(&latest_key).map_err(ContractError::DocumentGet)?;
                if version <= stored.version_id {
                    warn!(%did, stored = %stored.version_id, candidate = %version, "stale document version");
                    return Err(ContractError::VersionIdInvalid {
                        stored: stored.version_id,
                        candidate: version,
                    });
                }

                tx.insert(&LedgerKey::versioned_document(&did, stored.version_id), &stored)
                    .map_err(ContractError::DocumentInsert)?;
                tx.put(&latest_key, &document)
                    .map_err(ContractError::DocumentPut)?;
                status.version = version;
                tx.put(&status_key, &status)
                    .map_err(ContractError::StatusPut)?;

                RegistrationOutcome::Updated {
                    did,
                    previous_version: stored.version_id,
                    version,
                }
            }
        };

        tx.commit().map_err(ContractError::DocumentPut)?;
        info!(did = %outcome.did(), version = %outcome.version(), ?role, "document registered");
        Ok(outcome)
    }

    /// Read a document and its DID's status.
    pub fn get_document_and_status<L: Ledger>(
        &self,
        ledger: &L,
        did: &str,
        version: Option<VersionId>,
    ) -> Result<Option<DocumentAndStatus>, ContractError> {
        Ok(read_document(ledger, did, version)?.map(|(document, status)| DocumentAndStatus {
            document,
            status: status.status,
        }))
    }

    /// Toggle a DID between ACTIVATED and DEACTIVATED.
    ///
    /// The chosen snapshot's `deactivated` flag flips. When that snapshot is
    /// the latest, the status record follows.
    pub fn set_in_service_status<L: Ledger>(
        &self,
        ledger: &mut L,
        did: &str,
        target: DidStatus,
        version: Option<VersionId>,
    ) -> Result<DidDocument, ContractError> {
        let mut tx = LedgerTransaction::new(ledger);

        let (mut document, mut status) =
            read_document(&tx, did, version)?.ok_or_else(|| not_found(did, version))?;

        // Validated for every snapshot; the record is only written for the latest.
        status.apply_in_service(target)?;
        document
            .switch_status(target)
            .map_err(|_| StatusError::UnsupportedStatus(target))?;

        if document.version_id == status.version {
            tx.put(&LedgerKey::latest_document(did), &document)
                .map_err(ContractError::DocumentPut)?;
            tx.put(&LedgerKey::document_status(did), &status)
                .map_err(ContractError::StatusPut)?;
        } else {
            tx.put(&LedgerKey::versioned_document(did, document.version_id), &document)
                .map_err(ContractError::DocumentPut)?;
        }

        tx.commit().map_err(ContractError::DocumentPut)?;
        info!(%did, version = %document.version_id, status = %target, "in-service status changed");
        Ok(document)
    }

    /// Revoke an in-service DID, or terminate a revoked one.
    ///
    /// `terminated_time` is recorded when terminating and must then be
    /// present.
    pub fn set_revocation_status<L: Ledger>(
        &self,
        ledger: &mut L,
        did: &str,
        target: DidStatus,
        terminated_time: Option<&str>,
    ) -> Result<DocumentStatus, ContractError> {
        let mut tx = LedgerTransaction::new(ledger);

        let mut status = read_status(&tx, did)?.ok_or_else(|| {
            ContractError::StatusGet(LedgerError::NotFound(
                LedgerKey::document_status(did).to_string(),
            ))
        })?;

        status.apply_revocation(target, terminated_time)?;
        tx.put(&LedgerKey::document_status(did), &status)
            .map_err(ContractError::StatusPut)?;

        tx.commit().map_err(ContractError::StatusPut)?;
        info!(%did, status = %target, "revocation status changed");
        Ok(status)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Authorize an envelope against the controller's registered keys.
fn verify_envelope<L: Ledger>(ledger: &L, envelope: &InvokedDocument) -> Result<(), ContractError> {
    let controller = &envelope.controller.did;

    let registered = ledger
        .exists(&LedgerKey::latest_document(controller))
        .map_err(ContractError::DocumentGet)?;
    if !registered {
        warn!(%controller, "envelope from unregistered controller");
        return Err(ContractError::ProviderInvalid(controller.clone()));
    }

    let key_url = envelope
        .key_url()
        .map_err(|e| ContractError::KeyUrlParse(e.to_string()))?;

    let (signer, _) = read_document(ledger, controller, Some(key_url.version_id))?.ok_or_else(
        || ContractError::SignerUnavailable {
            did: controller.clone(),
            version: key_url.version_id,
        },
    )?;

    if let Err(e) = envelope.verify_with(&signer, &key_url.key_id) {
        warn!(%controller, key = %key_url, error = %e, "proof rejected");
        return Err(e.into());
    }

    debug!(%controller, key = %key_url, "proof verified");
    Ok(())
}

fn read_status<L: Ledger>(ledger: &L, did: &str) -> Result<Option<DocumentStatus>, ContractError> {
    ledger
        .find(&LedgerKey::document_status(did))
        .map_err(|e| match e {
            LedgerError::Serialization(msg) => ContractError::StatusConvert(msg),
            other => ContractError::StatusGet(other),
        })
}

/// The snapshot a read for `version` resolves to, with the status record.
fn read_document<L: Ledger>(
    ledger: &L,
    did: &str,
    version: Option<VersionId>,
) -> Result<Option<(DidDocument, DocumentStatus)>, ContractError> {
    let Some(status) = read_status(ledger, did)? else {
        return Ok(None);
    };

    let key = match version {
        Some(v) if v != status.version => LedgerKey::versioned_document(did, v),
        _ => LedgerKey::latest_document(did),
    };

    let document: Option<DidDocument> = ledger.find(&key).map_err(ContractError::DocumentGet)?;
    Ok(document.map(|doc| (doc, status)))
}

fn not_found(did: &str, version: Option<VersionId>) -> ContractError {
    let key = match version {
        Some(v) => LedgerKey::versioned_document(did, v),
        None => LedgerKey::latest_document(did),
    };
    ContractError::DocumentGet(LedgerError::NotFound(key.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use sigil_protocol::crypto::EcKeypair;
    use sigil_protocol::identity::{
        AuthType, DidKeyUrl, InvokedDocumentBuilder, KeyType, VerificationMethod,
    };
    use sigil_protocol::storage::MemoryLedger;

    fn doc(did: &str, version: u64, key: &EcKeypair) -> DidDocument {
        DidDocument {
            context: vec!["https://www.w3.org/ns/did/v1".into()],
            id: did.into(),
            controller: did.into(),
            created: "2024-05-19T04:32:03Z".into(),
            updated: "2024-05-19T04:32:03Z".into(),
            version_id: VersionId::new(version).unwrap(),
            deactivated: false,
            verification_method: vec![VerificationMethod {
                id: "pin".into(),
                key_type: KeyType::Secp256r1VerificationKey2018,
                controller: did.into(),
                public_key_multibase: key.public_key().to_multibase(),
                auth_type: AuthType::PIN,
            }],
            assertion_method: vec![],
            authentication: vec!["pin".into()],
            key_agreement: vec![],
            capability_invocation: vec!["pin".into()],
            capability_delegation: vec![],
            service: vec![],
        }
    }

    fn signed(document: DidDocument, signer: &str, version: u64, key: &EcKeypair) -> InvokedDocument {
        InvokedDocumentBuilder::new(document)
            .controller(signer, "https://example.org/vc/cert")
            .verification_method(DidKeyUrl::new(signer, VersionId::new(version).unwrap(), "pin"))
            .created("2024-05-19T04:32:03Z")
            .nonce("01")
            .sign(key)
            .unwrap()
    }

    #[test]
    fn trust_anchor_registers_without_prior_state() {
        let mut ledger = MemoryLedger::new();
        let key = EcKeypair::generate();
        let contract = DocumentContract::default();

        let outcome = contract
            .register_document(&mut ledger, &signed(doc("did:ex:tas", 1, &key), "did:ex:tas", 1, &key), RoleType::Tas)
            .unwrap();
        assert_eq!(
            outcome,
            RegistrationOutcome::Created {
                did: "did:ex:tas".into(),
                version: VersionId::FIRST
            }
        );
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn non_anchor_from_unknown_controller_is_rejected() {
        let mut ledger = MemoryLedger::new();
        let key = EcKeypair::generate();
        let err = DocumentContract::default()
            .register_document(
                &mut ledger,
                &signed(doc("did:ex:w", 1, &key), "did:ex:tas", 1, &key),
                RoleType::Wallet,
            )
            .unwrap_err();
        assert!(matches!(err, ContractError::ProviderInvalid(did) if did == "did:ex:tas"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn missing_signer_version_is_a_signature_error() {
        let mut ledger = MemoryLedger::new();
        let key = EcKeypair::generate();
        let contract = DocumentContract::default();
        contract
            .register_document(&mut ledger, &signed(doc("did:ex:tas", 1, &key), "did:ex:tas", 1, &key), RoleType::Tas)
            .unwrap();

        let err = contract
            .register_document(
                &mut ledger,
                &signed(doc("did:ex:w", 1, &key), "did:ex:tas", 7, &key),
                RoleType::Wallet,
            )
            .unwrap_err();
        assert!(matches!(err, ContractError::SignerUnavailable { .. }));
        assert_eq!(err.kind(), ErrorKind::SignatureInvalid);
    }

    #[test]
    fn malformed_key_url_is_rejected() {
        let mut ledger = MemoryLedger::new();
        let key = EcKeypair::generate();
        let contract = DocumentContract::default();
        contract
            .register_document(&mut ledger, &signed(doc("did:ex:tas", 1, &key), "did:ex:tas", 1, &key), RoleType::Tas)
            .unwrap();

        let mut envelope = signed(doc("did:ex:w", 1, &key), "did:ex:tas", 1, &key);
        envelope.proof.verification_method = "did:ex:tas#pin".into();
        let err = contract
            .register_document(&mut ledger, &envelope, RoleType::Wallet)
            .unwrap_err();
        assert!(matches!(err, ContractError::KeyUrlParse(_)));
        assert_eq!(err.code(), "SSRVFCC01007");
    }

    #[test]
    fn invalid_document_is_a_convert_error() {
        let mut ledger = MemoryLedger::new();
        let key = EcKeypair::generate();
        let mut bad = doc("did:ex:tas", 1, &key);
        bad.capability_invocation.push("ghost".into());

        let err = DocumentContract::default()
            .register_document(&mut ledger, &signed(bad, "did:ex:tas", 1, &key), RoleType::Tas)
            .unwrap_err();
        assert!(matches!(err, ContractError::DocumentConvert(_)));
        assert!(ledger.is_empty());
    }

    #[test]
    fn read_of_unknown_did_is_none() {
        let ledger = MemoryLedger::new();
        assert!(DocumentContract::default()
            .get_document_and_status(&ledger, "did:ex:none", None)
            .unwrap()
            .is_none());
    }

    #[test]
    fn revocation_of_unknown_did_is_not_found() {
        let mut ledger = MemoryLedger::new();
        let err = DocumentContract::default()
            .set_revocation_status(&mut ledger, "did:ex:none", DidStatus::Revoked, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn outcome_json_is_tagged() {
        let outcome = RegistrationOutcome::Updated {
            did: "did:ex:a".into(),
            previous_version: VersionId::FIRST,
            version: VersionId::new(2).unwrap(),
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["outcome"], "updated");
        assert_eq!(value["previousVersion"], "1");
        assert_eq!(value["version"], "2");
    }
}
