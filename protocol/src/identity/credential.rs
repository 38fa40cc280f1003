//! Verifiable-credential metadata records.
//!
//! The registry does not store credentials themselves, only enough about
//! each one (issuer, schema, validity window, status) for a verifier to
//! check that it has not been suspended or revoked.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::invoked::Provider;

/// Credential status. REVOKED is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VcStatus {
    Active,
    Inactive,
    Revoked,
}

impl fmt::Display for VcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Revoked => "REVOKED",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CredentialSchemaType {
    OsdSchemaCredential,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSchema {
    pub id: String,

    #[serde(rename = "type")]
    pub schema_type: CredentialSchemaType,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot update credential status from {from} to {to}")]
pub struct VcStatusError {
    pub from: VcStatus,
    pub to: VcStatus,
}

/// Metadata for one issued credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VcMeta {
    pub id: String,
    pub issuer: Provider,
    pub subject: String,
    pub credential_schema: CredentialSchema,
    pub status: VcStatus,
    pub issuance_date: String,
    pub valid_from: String,
    pub valid_until: String,
    pub format_version: String,
    pub language: String,
}

impl VcMeta {
    /// Move to `target`. Setting the current status again is an error, as
    /// is any change once revoked.
    pub fn update_status(&mut self, target: VcStatus) -> Result<(), VcStatusError> {
        if self.status == target || self.status == VcStatus::Revoked {
            return Err(VcStatusError {
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        Ok(())
    }
}
