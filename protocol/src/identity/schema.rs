//! # Schema Validation
//!
//! Serde already rejects documents with missing required fields, unknown
//! enum values or a malformed `versionId`. [`SchemaValidator`] checks the
//! things a type can't express:
//!
//! - required strings are non-empty, DIDs start with `did:`
//! - `created` / `updated` and the credential dates are timestamps
//! - verification method ids are unique and every purpose entry points at
//!   one of them
//! - `authType` is a valid factor mask and P-256 keys actually decode
//! - context entries and service endpoints parse as URLs with a host
//! - the document stays under the configured size limits
//!
//! The validator is an explicit value built once from configuration and
//! passed to the contracts; there is no global registry of rules.

use chrono::{DateTime, NaiveDateTime};
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

use super::credential::VcMeta;
use super::did::{DidDocument, ProofPurpose};
use crate::config::{DEFAULT_MAX_SERVICES, DEFAULT_MAX_VERIFICATION_METHODS, DID_CORE_CONTEXT};
use crate::crypto::keys::EcPublicKey;

/// A schema violation. The first one found is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("{0} is required")]
    MissingField(String),

    #[error("{field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("{field} has more than {max} entries")]
    TooMany { field: &'static str, max: usize },

    #[error("duplicate verification method id '{0}'")]
    DuplicateId(String),

    #[error("{purpose} references unknown verification method '{key_id}'")]
    DanglingReference { purpose: ProofPurpose, key_id: String },

    #[error("@context must include {0}")]
    MissingCoreContext(&'static str),
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> SchemaError {
    SchemaError::InvalidField {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Structural validation for documents and credential metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaValidator {
    pub require_did_core_context: bool,
    pub max_verification_methods: usize,
    pub max_services: usize,
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self {
            require_did_core_context: false,
            max_verification_methods: DEFAULT_MAX_VERIFICATION_METHODS,
            max_services: DEFAULT_MAX_SERVICES,
        }
    }
}

impl SchemaValidator {
    pub fn validate_document(&self, doc: &DidDocument) -> Result<(), SchemaError> {
        if doc.context.is_empty() {
            return Err(SchemaError::MissingField("@context".into()));
        }
        for (i, ctx) in doc.context.iter().enumerate() {
            require_url(&format!("@context[{i}]"), ctx)?;
        }
        if self.require_did_core_context && !doc.context.iter().any(|c| c == DID_CORE_CONTEXT) {
            return Err(SchemaError::MissingCoreContext(DID_CORE_CONTEXT));
        }

        require_did("id", &doc.id)?;
        require_did("controller", &doc.controller)?;
        require_timestamp("created", &doc.created)?;
        require_timestamp("updated", &doc.updated)?;

        if doc.verification_method.is_empty() {
            return Err(SchemaError::MissingField("verificationMethod".into()));
        }
        if doc.verification_method.len() > self.max_verification_methods {
            return Err(SchemaError::TooMany {
                field: "verificationMethod",
                max: self.max_verification_methods,
            });
        }

        let mut seen = HashSet::new();
        for (i, vm) in doc.verification_method.iter().enumerate() {
            let field = |name: &str| format!("verificationMethod[{i}].{name}");

            require_non_empty(&field("id"), &vm.id)?;
            if !seen.insert(vm.id.as_str()) {
                return Err(SchemaError::DuplicateId(vm.id.clone()));
            }
            require_non_empty(&field("controller"), &vm.controller)?;
            require_non_empty(&field("publicKeyMultibase"), &vm.public_key_multibase)?;
            if !vm.auth_type.is_valid() {
                return Err(invalid(
                    field("authType"),
                    format!("{} is not a valid factor mask", vm.auth_type.bits()),
                ));
            }
            if vm.key_type.is_p256() {
                EcPublicKey::from_multibase(&vm.public_key_multibase)
                    .map_err(|e| invalid(field("publicKeyMultibase"), e.to_string()))?;
            }
        }

        for purpose in ProofPurpose::ALL {
            for key_id in doc.purpose_keys(purpose) {
                if doc.verification_method(key_id).is_none() {
                    return Err(SchemaError::DanglingReference {
                        purpose,
                        key_id: key_id.clone(),
                    });
                }
            }
        }

        if doc.service.len() > self.max_services {
            return Err(SchemaError::TooMany {
                field: "service",
                max: self.max_services,
            });
        }
        for (i, service) in doc.service.iter().enumerate() {
            require_non_empty(&format!("service[{i}].id"), &service.id)?;
            if service.service_endpoint.is_empty() {
                return Err(SchemaError::MissingField(format!("service[{i}].serviceEndpoint")));
            }
            for (j, endpoint) in service.service_endpoint.iter().enumerate() {
                require_url(&format!("service[{i}].serviceEndpoint[{j}]"), endpoint)?;
            }
        }

        Ok(())
    }

    pub fn validate_vc_meta(&self, meta: &VcMeta) -> Result<(), SchemaError> {
        require_non_empty("id", &meta.id)?;
        require_did("issuer.did", &meta.issuer.did)?;
        require_url("issuer.certVcRef", &meta.issuer.cert_vc_ref)?;
        require_non_empty("subject", &meta.subject)?;
        require_url("credentialSchema.id", &meta.credential_schema.id)?;
        require_timestamp("issuanceDate", &meta.issuance_date)?;
        require_timestamp("validFrom", &meta.valid_from)?;
        require_timestamp("validUntil", &meta.valid_until)?;
        require_non_empty("formatVersion", &meta.format_version)?;
        require_non_empty("language", &meta.language)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Field checks
// ---------------------------------------------------------------------------

fn require_non_empty(field: &str, value: &str) -> Result<(), SchemaError> {
    if value.trim().is_empty() {
        Err(SchemaError::MissingField(field.to_string()))
    } else {
        Ok(())
    }
}

fn require_did(field: &str, value: &str) -> Result<(), SchemaError> {
    require_non_empty(field, value)?;
    match value.strip_prefix("did:") {
        Some(rest) if rest.contains(':') => Ok(()),
        _ => Err(invalid(field, "expected did:<method>:<id>")),
    }
}

/// Absolute URL with a non-empty host.
fn require_url(field: &str, value: &str) -> Result<(), SchemaError> {
    require_non_empty(field, value)?;
    let parsed = Url::parse(value).map_err(|e| invalid(field, format!("not a URL: {e}")))?;
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(invalid(field, "URL has no host")),
    }
}

/// RFC 3339, or the same without an offset (read as UTC).
fn require_timestamp(field: &str, value: &str) -> Result<(), SchemaError> {
    require_non_empty(field, value)?;
    let ok = DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok();
    if ok {
        Ok(())
    } else {
        Err(invalid(field, "expected an RFC 3339 timestamp"))
    }
}
