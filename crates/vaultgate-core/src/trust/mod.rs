//! Device trust registry.
//!
//! Trust is asserted by a live [`VerificationDevice`] row for an
//! (account, device) pair. Rows are written once and soft-deleted to
//! revoke; trusting again after a revocation appends a fresh row instead
//! of resurrecting the old one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};
use vaultgate_state::{Repository, RepositoryError, register_repository_item};

use crate::{
    AccountId, CAS_ATTEMPTS, CoreError, DeviceId, VerificationDeviceId,
    account::{self, Account},
    device::{self, Device},
    error::{ConflictError, NotFoundError},
};

/// Asserts that a device is trusted for an account.
#[allow(missing_docs)]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationDevice {
    pub id: VerificationDeviceId,
    pub account_id: AccountId,
    pub device_id: DeviceId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub revision: u64,
}

register_repository_item!(VerificationDevice, "VerificationDevice");

impl VerificationDevice {
    pub(crate) fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    fn is_live_for(&self, account_id: AccountId, device_id: DeviceId) -> bool {
        !self.is_deleted() && self.account_id == account_id && self.device_id == device_id
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum TrustDeviceError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<TrustDeviceError> for CoreError {
    fn from(value: TrustDeviceError) -> Self {
        match value {
            TrustDeviceError::NotFound(e) => e.into(),
            TrustDeviceError::Repository(e) => e.into(),
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum RevokeTrustError {
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<RevokeTrustError> for CoreError {
    fn from(value: RevokeTrustError) -> Self {
        match value {
            RevokeTrustError::Conflict(e) => e.into(),
            RevokeTrustError::Repository(e) => e.into(),
        }
    }
}

/// Returns whether `device_id` is currently trusted for `account_id`.
pub(crate) async fn is_trusted<R: Repository<VerificationDevice> + ?Sized>(
    repository: &R,
    account_id: AccountId,
    device_id: DeviceId,
) -> Result<bool, RepositoryError> {
    Ok(repository
        .list()
        .await?
        .iter()
        .any(|verification| verification.is_live_for(account_id, device_id)))
}

/// Returns the live trusted device ids for `account_id`.
pub(crate) async fn list_trusted<R: Repository<VerificationDevice> + ?Sized>(
    repository: &R,
    account_id: AccountId,
) -> Result<Vec<DeviceId>, RepositoryError> {
    let mut ids: Vec<DeviceId> = repository
        .list()
        .await?
        .into_iter()
        .filter(|verification| !verification.is_deleted() && verification.account_id == account_id)
        .map(|verification| verification.device_id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

/// Marks `device_id` as trusted for `account_id`.
///
/// Idempotent: when a live trust row already exists the call returns
/// without writing.
#[instrument(err, skip_all, fields(account_id = %account_id, device_id = %device_id))]
pub(crate) async fn trust_device(
    accounts: &dyn Repository<Account>,
    devices: &dyn Repository<Device>,
    verifications: &dyn Repository<VerificationDevice>,
    account_id: AccountId,
    device_id: DeviceId,
) -> Result<(), TrustDeviceError> {
    account::get_live(accounts, account_id)
        .await?
        .ok_or(NotFoundError::Account)?;
    device::get_live(devices, device_id)
        .await?
        .ok_or(NotFoundError::Device)?;

    if is_trusted(verifications, account_id, device_id).await? {
        return Ok(());
    }

    let now = Utc::now();
    let verification = VerificationDevice {
        id: VerificationDeviceId::new_v4(),
        account_id,
        device_id,
        created_at: now,
        updated_at: now,
        deleted_at: None,
        revision: 1,
    };
    verifications
        .set(verification.id.to_string(), verification)
        .await?;
    debug!("Trusted device");

    Ok(())
}

/// Withdraws trust from `device_id` for `account_id`.
///
/// Soft-deletes every live trust row for the pair; revoking a pair that is
/// not trusted is a no-op. Sessions that already completed verification are
/// unaffected and remain valid until they expire.
#[instrument(err, skip_all, fields(account_id = %account_id, device_id = %device_id))]
pub(crate) async fn revoke_trust<R: Repository<VerificationDevice> + ?Sized>(
    repository: &R,
    account_id: AccountId,
    device_id: DeviceId,
) -> Result<(), RevokeTrustError> {
    let rows: Vec<VerificationDevice> = repository
        .list()
        .await?
        .into_iter()
        .filter(|verification| verification.is_live_for(account_id, device_id))
        .collect();

    for row in rows {
        retire_row(repository, row).await?;
    }
    debug!("Revoked device trust");

    Ok(())
}

/// Soft-deletes one trust row. Converges when another writer retired or
/// removed the row first.
pub(crate) async fn retire_row<R: Repository<VerificationDevice> + ?Sized>(
    repository: &R,
    row: VerificationDevice,
) -> Result<(), RevokeTrustError> {
    let mut current = row;

    for _ in 0..CAS_ATTEMPTS {
        if current.is_deleted() {
            return Ok(());
        }

        let now = Utc::now();
        let mut updated = current.clone();
        updated.deleted_at = Some(now);
        updated.updated_at = now;
        updated.revision = current.revision + 1;

        if repository
            .replace(updated.id.to_string(), current.revision, updated)
            .await?
        {
            return Ok(());
        }

        match repository.get(current.id.to_string()).await? {
            Some(reloaded) => current = reloaded,
            None => return Ok(()),
        }
    }

    Err(ConflictError::ConcurrentUpdate.into())
}
