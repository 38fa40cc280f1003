//! # Document Status
//!
//! Every registered DID has exactly one status record alongside its
//! documents. The record carries the lifecycle state, the version it
//! currently points at, and the role the identity was registered with.
//!
//! ```text
//!                  in-service toggle
//!      ┌───────────┐ ───────────────▶ ┌─────────────┐
//!      │ ACTIVATED │                  │ DEACTIVATED │
//!      └───────────┘ ◀─────────────── └─────────────┘
//!            │                               │
//!            └───────────┐       ┌───────────┘
//!                        ▼       ▼
//!                      ┌───────────┐
//!                      │  REVOKED  │
//!                      └───────────┘
//!                            │
//!                            ▼
//!                      ┌────────────┐
//!                      │ TERMINATED │  (final)
//!                      └────────────┘
//! ```
//!
//! There are two families of transition and each has its own entry point:
//! [`DocumentStatus::apply_in_service`] for the top row and
//! [`DocumentStatus::apply_revocation`] for the way down. Nothing moves
//! back up.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::did::VersionId;

/// Lifecycle state of a DID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DidStatus {
    Activated,
    Deactivated,
    Revoked,
    Terminated,
}

impl DidStatus {
    pub const ALL: [DidStatus; 4] = [
        Self::Activated,
        Self::Deactivated,
        Self::Revoked,
        Self::Terminated,
    ];

    /// ACTIVATED or DEACTIVATED: the two states an in-service toggle moves
    /// between.
    pub fn is_in_service(self) -> bool {
        matches!(self, Self::Activated | Self::Deactivated)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Activated => "ACTIVATED",
            Self::Deactivated => "DEACTIVATED",
            Self::Revoked => "REVOKED",
            Self::Terminated => "TERMINATED",
        }
    }
}

impl fmt::Display for DidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DidStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| StatusError::UnknownStatus(s.to_string()))
    }
}

/// Role an identity was registered with.
///
/// Only [`RoleType::Tas`] changes behavior: a trust anchor bootstraps the
/// registry and its documents are not proof-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleType {
    Tas,
    Wallet,
    Issuer,
    WalletProvider,
    AppProvider,
    ListProvider,
    OpProvider,
    KycProvider,
    NotificationProvider,
    LogProvider,
    PortalProvider,
    DelegationProvider,
    StorageProvider,
    BackupProvider,
    Etc,
}

impl RoleType {
    /// The trust anchor role.
    pub fn is_trust_anchor(self) -> bool {
        self == Self::Tas
    }
}

/// Errors from status transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    #[error("cannot move from {from} to {to}")]
    StatusInvalid { from: DidStatus, to: DidStatus },

    #[error("{0} is not reachable through this operation")]
    UnsupportedStatus(DidStatus),

    #[error("TERMINATED requires a termination time")]
    MissingTerminatedTime,

    #[error("unknown status '{0}'")]
    UnknownStatus(String),
}

/// Check an in-service toggle. Idempotent toggles are allowed.
pub fn in_service_transition(current: DidStatus, target: DidStatus) -> Result<(), StatusError> {
    if !target.is_in_service() {
        return Err(StatusError::UnsupportedStatus(target));
    }
    if !current.is_in_service() {
        return Err(StatusError::StatusInvalid {
            from: current,
            to: target,
        });
    }
    Ok(())
}

/// Check a revocation-family transition: an in-service DID may be revoked,
/// a revoked DID may be terminated, and nothing else.
pub fn revocation_transition(current: DidStatus, target: DidStatus) -> Result<(), StatusError> {
    match (current, target) {
        (DidStatus::Activated | DidStatus::Deactivated, DidStatus::Revoked) => Ok(()),
        (DidStatus::Revoked, DidStatus::Terminated) => Ok(()),
        (_, DidStatus::Activated | DidStatus::Deactivated) => {
            Err(StatusError::UnsupportedStatus(target))
        }
        (from, to) => Err(StatusError::StatusInvalid { from, to }),
    }
}

/// The per-DID status record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStatus {
    pub did: String,

    pub status: DidStatus,

    /// The version the latest document carries.
    pub version: VersionId,

    #[serde(rename = "type")]
    pub role: RoleType,

    /// Wire name is `cancelled_time`.
    #[serde(
        rename = "cancelled_time",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub terminated_time: Option<String>,
}

impl DocumentStatus {
    /// Status record for a freshly created DID.
    pub fn new(did: impl Into<String>, version: VersionId, role: RoleType) -> Self {
        Self {
            did: did.into(),
            status: DidStatus::Activated,
            version,
            role,
            terminated_time: None,
        }
    }

    /// Toggle between ACTIVATED and DEACTIVATED.
    pub fn apply_in_service(&mut self, target: DidStatus) -> Result<(), StatusError> {
        in_service_transition(self.status, target)?;
        self.status = target;
        Ok(())
    }

    /// Revoke or terminate. `terminated_time` is required when terminating
    /// and ignored otherwise.
    pub fn apply_revocation(
        &mut self,
        target: DidStatus,
        terminated_time: Option<&str>,
    ) -> Result<(), StatusError> {
        revocation_transition(self.status, target)?;
        if target == DidStatus::Terminated {
            let time = terminated_time
                .filter(|t| !t.is_empty())
                .ok_or(StatusError::MissingTerminatedTime)?;
            self.terminated_time = Some(time.to_string());
        }
        self.status = target;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: DidStatus) -> DocumentStatus {
        let mut s = DocumentStatus::new("did:example:tas", VersionId::FIRST, RoleType::Tas);
        s.status = status;
        s
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(serde_json::to_string(&DidStatus::Deactivated).unwrap(), "\"DEACTIVATED\"");
        assert_eq!("TERMINATED".parse::<DidStatus>().unwrap(), DidStatus::Terminated);
        assert!("activated".parse::<DidStatus>().is_err());
    }

    #[test]
    fn role_wire_names() {
        assert_eq!(serde_json::to_string(&RoleType::Tas).unwrap(), "\"Tas\"");
        assert_eq!(
            serde_json::from_str::<RoleType>("\"KycProvider\"").unwrap(),
            RoleType::KycProvider
        );
        assert!(serde_json::from_str::<RoleType>("\"Admin\"").is_err());
    }

    #[test]
    fn status_record_json_shape() {
        let value = serde_json::to_value(record(DidStatus::Activated)).unwrap();
        assert_eq!(value["status"], "ACTIVATED");
        assert_eq!(value["version"], "1");
        assert_eq!(value["type"], "Tas");
        assert!(value.get("cancelled_time").is_none());
    }

    #[test]
    fn in_service_toggle_both_ways_and_idempotent() {
        let mut s = record(DidStatus::Activated);
        s.apply_in_service(DidStatus::Deactivated).unwrap();
        assert_eq!(s.status, DidStatus::Deactivated);
        s.apply_in_service(DidStatus::Deactivated).unwrap();
        s.apply_in_service(DidStatus::Activated).unwrap();
        assert_eq!(s.status, DidStatus::Activated);
    }

    #[test]
    fn in_service_rejects_revocation_targets() {
        let mut s = record(DidStatus::Activated);
        assert_eq!(
            s.apply_in_service(DidStatus::Revoked),
            Err(StatusError::UnsupportedStatus(DidStatus::Revoked))
        );
        assert_eq!(s.status, DidStatus::Activated);
    }

    #[test]
    fn in_service_rejects_revoked_current() {
        let mut s = record(DidStatus::Revoked);
        assert_eq!(
            s.apply_in_service(DidStatus::Activated),
            Err(StatusError::StatusInvalid {
                from: DidStatus::Revoked,
                to: DidStatus::Activated
            })
        );
    }

    #[test]
    fn revoke_then_terminate_records_time() {
        let mut s = record(DidStatus::Deactivated);
        s.apply_revocation(DidStatus::Revoked, None).unwrap();
        s.apply_revocation(DidStatus::Terminated, Some("2024-06-01T00:00:00Z"))
            .unwrap();
        assert_eq!(s.status, DidStatus::Terminated);
        assert_eq!(s.terminated_time.as_deref(), Some("2024-06-01T00:00:00Z"));

        let value = serde_json::to_value(&s).unwrap();
        assert_eq!(value["cancelled_time"], "2024-06-01T00:00:00Z");
        assert!(value.get("terminatedTime").is_none());
        assert_eq!(serde_json::from_value::<DocumentStatus>(value).unwrap(), s);
    }

    #[test]
    fn terminate_without_time_is_rejected() {
        let mut s = record(DidStatus::Revoked);
        assert_eq!(
            s.apply_revocation(DidStatus::Terminated, Some("")),
            Err(StatusError::MissingTerminatedTime)
        );
        assert_eq!(s.status, DidStatus::Revoked);
    }

    #[test]
    fn terminated_is_final() {
        for target in DidStatus::ALL {
            assert!(revocation_transition(DidStatus::Terminated, target).is_err());
            assert!(in_service_transition(DidStatus::Terminated, target).is_err());
        }
    }

    #[test]
    fn transition_tables_are_exactly_the_allowed_sets() {
        use DidStatus::*;
        let in_service_ok = [
            (Activated, Activated),
            (Activated, Deactivated),
            (Deactivated, Activated),
            (Deactivated, Deactivated),
        ];
        let revocation_ok = [(Activated, Revoked), (Deactivated, Revoked), (Revoked, Terminated)];

        for from in DidStatus::ALL {
            for to in DidStatus::ALL {
                assert_eq!(
                    in_service_transition(from, to).is_ok(),
                    in_service_ok.contains(&(from, to)),
                    "in-service {from} -> {to}"
                );
                assert_eq!(
                    revocation_transition(from, to).is_ok(),
                    revocation_ok.contains(&(from, to)),
                    "revocation {from} -> {to}"
                );
            }
        }
    }
}
