//! # Credential Metadata Contract
//!
//! Register, read and change the status of verifiable-credential metadata.
//! A record is written once; afterwards only its status moves, and a
//! REVOKED record never moves again.

use tracing::{info, warn};

use sigil_protocol::identity::{SchemaValidator, VcMeta, VcStatus};
use sigil_protocol::storage::{Ledger, LedgerError, LedgerKey};

use crate::error::ContractError;

#[derive(Debug, Clone, Default)]
pub struct VcMetaContract {
    validator: SchemaValidator,
}

impl VcMetaContract {
    pub fn new(validator: SchemaValidator) -> Self {
        Self { validator }
    }

    /// Store a new credential record. Its id must not be registered yet.
    pub fn register_vc_meta<L: Ledger>(&self, ledger: &mut L, meta: &VcMeta) -> Result<(), ContractError> {
        self.validator.validate_vc_meta(meta)?;

        ledger
            .insert(&LedgerKey::vc_meta(&meta.id), meta)
            .map_err(|e| {
                warn!(vc = %meta.id, error = %e, "vc meta rejected");
                ContractError::VcMetaInsert(e)
            })?;

        info!(vc = %meta.id, issuer = %meta.issuer.did, "vc meta registered");
        Ok(())
    }

    /// `Ok(None)` if no record exists for `vc_id`.
    pub fn get_vc_meta<L: Ledger>(&self, ledger: &L, vc_id: &str) -> Result<Option<VcMeta>, ContractError> {
        ledger
            .find(&LedgerKey::vc_meta(vc_id))
            .map_err(ContractError::VcMetaGet)
    }

    /// Move a credential to `target` and return the updated record.
    pub fn update_vc_status<L: Ledger>(
        &self,
        ledger: &mut L,
        vc_id: &str,
        target: VcStatus,
    ) -> Result<VcMeta, ContractError> {
        let key = LedgerKey::vc_meta(vc_id);
        let mut meta: VcMeta = ledger
            .find(&key)
            .map_err(ContractError::VcMetaGet)?
            .ok_or_else(|| ContractError::VcMetaGet(LedgerError::NotFound(key.to_string())))?;

        let previous = meta.status;
        meta.update_status(target)?;
        ledger.put(&key, &meta).map_err(ContractError::VcMetaPut)?;

        info!(vc = %vc_id, from = %previous, to = %target, "vc status changed");
        Ok(meta)
    }
}
