//! # Contract Errors
//!
//! Every failure a lifecycle or credential operation can report, as one
//! closed enum. Callers branch on [`ContractError::kind`]; clients that
//! only see text get a stable [`ContractError::code`] in front of the
//! message:
//!
//! ```text
//! SSRVFCC01008: versionId 2 is not greater than the stored versionId 3
//! ```
//!
//! | Range   | Area                 |
//! |---------|----------------------|
//! | `01xxx` | DID documents        |
//! | `02xxx` | document status      |
//! | `03xxx` | credential metadata  |

use std::fmt;

use sigil_protocol::identity::{ProofError, SchemaError, StatusError, VcStatusError, VersionId};
use sigil_protocol::storage::LedgerError;
use thiserror::Error;

/// Prefix shared by every error code.
pub const ERROR_CODE_PREFIX: &str = "SSRVFCC";

/// Coarse classification of a [`ContractError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    ValidationFailed,
    KeyFormatInvalid,
    SignatureInvalid,
    VersionConflict,
    StatusTransitionInvalid,
    StorageFailure,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 8] = [
        Self::NotFound,
        Self::AlreadyExists,
        Self::ValidationFailed,
        Self::KeyFormatInvalid,
        Self::SignatureInvalid,
        Self::VersionConflict,
        Self::StatusTransitionInvalid,
        Self::StorageFailure,
    ];

    /// snake_case label, used for metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AlreadyExists => "already_exists",
            Self::ValidationFailed => "validation_failed",
            Self::KeyFormatInvalid => "key_format_invalid",
            Self::SignatureInvalid => "signature_invalid",
            Self::VersionConflict => "version_conflict",
            Self::StatusTransitionInvalid => "status_transition_invalid",
            Self::StorageFailure => "storage_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by the contract operations. All are terminal for the
/// operation that produced them; nothing is persisted.
#[derive(Debug, Error)]
pub enum ContractError {
    // -- DID documents ------------------------------------------------------
    #[error("failed to insert did document: {0}")]
    DocumentInsert(#[source] LedgerError),

    #[error("failed to get did document: {0}")]
    DocumentGet(#[source] LedgerError),

    #[error("failed to update did document: {0}")]
    DocumentPut(#[source] LedgerError),

    /// The envelope's controller has no registered document.
    #[error("provider is invalid: no document registered for {0}")]
    ProviderInvalid(String),

    /// The embedded document failed to decode or validate.
    #[error("failed to convert did document: {0}")]
    DocumentConvert(String),

    #[error("signature verification failed: {0}")]
    SignatureVerification(#[from] ProofError),

    /// The key URL names a controller version that isn't stored.
    #[error("signature verification failed: no document for {did} at versionId {version}")]
    SignerUnavailable { did: String, version: VersionId },

    #[error("verificationMethod is invalid: {0}")]
    KeyUrlParse(String),

    #[error("versionId {candidate} is not greater than the stored versionId {stored}")]
    VersionIdInvalid {
        stored: VersionId,
        candidate: VersionId,
    },

    // -- Document status ----------------------------------------------------
    #[error("failed to insert did document status: {0}")]
    StatusInsert(#[source] LedgerError),

    #[error("failed to get did document status: {0}")]
    StatusGet(#[source] LedgerError),

    #[error("failed to update did document status: {0}")]
    StatusPut(#[source] LedgerError),

    #[error("failed to convert did document status: {0}")]
    StatusConvert(String),

    #[error("did document status is invalid: {0}")]
    StatusInvalid(#[from] StatusError),

    // -- Credential metadata ------------------------------------------------
    #[error("failed to insert vc meta: {0}")]
    VcMetaInsert(#[source] LedgerError),

    #[error("failed to get vc meta: {0}")]
    VcMetaGet(#[source] LedgerError),

    #[error("failed to update vc meta: {0}")]
    VcMetaPut(#[source] LedgerError),

    #[error("failed to convert vc meta: {0}")]
    VcMetaConvert(#[from] SchemaError),

    #[error("vc meta status is invalid: {0}")]
    VcMetaStatusInvalid(#[from] VcStatusError),
}

impl ContractError {
    /// The five-digit code without the prefix.
    pub fn code_number(&self) -> &'static str {
        match self {
            Self::DocumentInsert(_) => "01001",
            Self::DocumentGet(_) => "01002",
            Self::DocumentPut(_) => "01003",
            Self::ProviderInvalid(_) => "01004",
            Self::DocumentConvert(_) => "01005",
            Self::SignatureVerification(_) | Self::SignerUnavailable { .. } => "01006",
            Self::KeyUrlParse(_) => "01007",
            Self::VersionIdInvalid { .. } => "01008",
            Self::StatusInsert(_) => "02001",
            Self::StatusGet(_) => "02002",
            Self::StatusPut(_) => "02003",
            Self::StatusConvert(_) => "02004",
            Self::StatusInvalid(_) => "02005",
            Self::VcMetaInsert(_) => "03001",
            Self::VcMetaGet(_) => "03002",
            Self::VcMetaPut(_) => "03003",
            Self::VcMetaConvert(_) => "03004",
            Self::VcMetaStatusInvalid(_) => "03005",
        }
    }

    /// Full code, e.g. `SSRVFCC01006`.
    pub fn code(&self) -> String {
        format!("{ERROR_CODE_PREFIX}{}", self.code_number())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DocumentInsert(e)
            | Self::DocumentGet(e)
            | Self::DocumentPut(e)
            | Self::StatusInsert(e)
            | Self::StatusGet(e)
            | Self::StatusPut(e)
            | Self::VcMetaInsert(e)
            | Self::VcMetaGet(e)
            | Self::VcMetaPut(e) => ledger_kind(e),
            Self::ProviderInvalid(_) => ErrorKind::NotFound,
            Self::DocumentConvert(_)
            | Self::KeyUrlParse(_)
            | Self::StatusConvert(_)
            | Self::VcMetaConvert(_) => ErrorKind::ValidationFailed,
            Self::SignatureVerification(e) => proof_kind(e),
            Self::SignerUnavailable { .. } => ErrorKind::SignatureInvalid,
            Self::VersionIdInvalid { .. } => ErrorKind::VersionConflict,
            Self::StatusInvalid(_) | Self::VcMetaStatusInvalid(_) => {
                ErrorKind::StatusTransitionInvalid
            }
        }
    }

    /// `"<code>: <message>"`, the form returned to clients.
    pub fn to_client_string(&self) -> String {
        format!("{}: {}", self.code(), self)
    }
}

fn ledger_kind(e: &LedgerError) -> ErrorKind {
    match e {
        LedgerError::NotFound(_) => ErrorKind::NotFound,
        LedgerError::AlreadyExists(_) => ErrorKind::AlreadyExists,
        LedgerError::Serialization(_) => ErrorKind::ValidationFailed,
        LedgerError::Sled(_) => ErrorKind::StorageFailure,
    }
}

fn proof_kind(e: &ProofError) -> ErrorKind {
    use sigil_protocol::identity::DidError;

    match e {
        ProofError::Document(DidError::InvalidPublicKey(_))
        | ProofError::Document(DidError::UnsupportedKeyType(_)) => ErrorKind::KeyFormatInvalid,
        _ => ErrorKind::SignatureInvalid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigil_protocol::identity::DidStatus;
    use std::collections::HashSet;

    fn samples() -> Vec<ContractError> {
        let v = |n| VersionId::new(n).unwrap();
        vec![
            ContractError::DocumentInsert(LedgerError::AlreadyExists("k".into())),
            ContractError::DocumentGet(LedgerError::NotFound("k".into())),
            ContractError::DocumentPut(LedgerError::Serialization("bad".into())),
            ContractError::ProviderInvalid("did:example:x".into()),
            ContractError::DocumentConvert("bad".into()),
            ContractError::SignatureVerification(ProofError::MissingProofValue),
            ContractError::KeyUrlParse("x".into()),
            ContractError::VersionIdInvalid {
                stored: v(3),
                candidate: v(2),
            },
            ContractError::StatusInsert(LedgerError::AlreadyExists("k".into())),
            ContractError::StatusGet(LedgerError::NotFound("k".into())),
            ContractError::StatusPut(LedgerError::NotFound("k".into())),
            ContractError::StatusConvert("bad".into()),
            ContractError::StatusInvalid(StatusError::UnsupportedStatus(DidStatus::Revoked)),
            ContractError::VcMetaInsert(LedgerError::AlreadyExists("k".into())),
            ContractError::VcMetaGet(LedgerError::NotFound("k".into())),
            ContractError::VcMetaPut(LedgerError::NotFound("k".into())),
            ContractError::VcMetaConvert(SchemaError::MissingField("id".into())),
        ]
    }

    #[test]
    fn codes_are_prefixed_and_unique() {
        let mut seen = HashSet::new();
        for err in samples() {
            let code = err.code();
            assert!(code.starts_with(ERROR_CODE_PREFIX));
            assert_eq!(code.len(), ERROR_CODE_PREFIX.len() + 5);
            assert!(seen.insert(code), "duplicate code for {err:?}");
        }
    }

    #[test]
    fn version_conflict_reads_well() {
        let err = ContractError::VersionIdInvalid {
            stored: VersionId::new(3).unwrap(),
            candidate: VersionId::new(2).unwrap(),
        };
        assert_eq!(err.kind(), ErrorKind::VersionConflict);
        assert_eq!(
            err.to_client_string(),
            "SSRVFCC01008: versionId 2 is not greater than the stored versionId 3"
        );
    }

    #[test]
    fn ledger_errors_classify_by_cause() {
        assert_eq!(
            ContractError::VcMetaInsert(LedgerError::AlreadyExists("k".into())).kind(),
            ErrorKind::AlreadyExists
        );
        assert_eq!(
            ContractError::DocumentGet(LedgerError::NotFound("k".into())).kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn bad_key_material_is_a_key_format_error() {
        use sigil_protocol::crypto::KeyError;
        use sigil_protocol::identity::DidError;

        let err = ContractError::SignatureVerification(ProofError::Document(
            DidError::InvalidPublicKey(KeyError::RecoveryFailed),
        ));
        assert_eq!(err.kind(), ErrorKind::KeyFormatInvalid);
        assert_eq!(err.code_number(), "01006");

        let err = ContractError::SignatureVerification(ProofError::MissingProofValue);
        assert_eq!(err.kind(), ErrorKind::SignatureInvalid);
    }

    #[test]
    fn kind_labels_are_distinct() {
        let labels: HashSet<_> = ErrorKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(labels.len(), ErrorKind::ALL.len());
    }
}
