use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};
use vaultgate_crypto::{Salt, Verifier};
use vaultgate_state::{Repository, RepositoryError};

use crate::{
    AccountId, CoreError, DeviceId,
    account::{self, Account, MfaType},
    device::{self, Device},
    error::{ConflictError, NotFoundError, ValidationError},
    trust::{self, TrustDeviceError, VerificationDevice},
};

/// Payload for registering a new account.
#[allow(missing_docs)]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    /// Opaque login identifier the client derives from its credentials.
    pub account_key: String,
    pub username: String,
    /// The device performing the registration; becomes the account's first
    /// trusted device.
    pub device_id: DeviceId,
    pub verifier: Verifier,
    pub salt: Salt,
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum SignUpError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<SignUpError> for CoreError {
    fn from(value: SignUpError) -> Self {
        match value {
            SignUpError::Validation(e) => e.into(),
            SignUpError::NotFound(e) => e.into(),
            SignUpError::Conflict(e) => e.into(),
            SignUpError::Repository(e) => e.into(),
        }
    }
}

impl From<TrustDeviceError> for SignUpError {
    fn from(value: TrustDeviceError) -> Self {
        match value {
            TrustDeviceError::NotFound(e) => e.into(),
            TrustDeviceError::Repository(e) => e.into(),
        }
    }
}

/// Creates an account from client-derived verifier material and trusts the
/// registering device.
///
/// Nothing password-derivable is accepted or stored. The account key of a
/// soft-deleted account is free for registration again.
#[instrument(err, skip_all)]
pub(super) async fn sign_up(
    accounts: &dyn Repository<Account>,
    devices: &dyn Repository<Device>,
    verifications: &dyn Repository<VerificationDevice>,
    request: SignUpRequest,
) -> Result<AccountId, SignUpError> {
    if request.account_key.trim().is_empty() {
        return Err(ValidationError {
            field: "accountKey",
            reason: "must not be empty",
        }
        .into());
    }
    if request.username.trim().is_empty() {
        return Err(ValidationError {
            field: "username",
            reason: "must not be empty",
        }
        .into());
    }
    if request.verifier.as_bytes().is_empty() {
        return Err(ValidationError {
            field: "verifier",
            reason: "must not be empty",
        }
        .into());
    }
    if request.salt.as_bytes().is_empty() {
        return Err(ValidationError {
            field: "salt",
            reason: "must not be empty",
        }
        .into());
    }

    device::get_live(devices, request.device_id)
        .await?
        .ok_or(NotFoundError::Device)?;

    if account::find_by_account_key(accounts, &request.account_key)
        .await?
        .is_some()
    {
        return Err(ConflictError::AccountKeyTaken.into());
    }

    let now = Utc::now();
    let account = Account {
        id: AccountId::new_v4(),
        account_key: request.account_key,
        username: request.username,
        verifier: request.verifier,
        salt: request.salt,
        mfa_type: MfaType::None,
        created_at: now,
        updated_at: now,
        deleted_at: None,
        revision: 1,
    };
    let account_id = account.id;
    accounts.set(account_id.to_string(), account).await?;

    trust::trust_device(
        accounts,
        devices,
        verifications,
        account_id,
        request.device_id,
    )
    .await?;
    info!(account_id = %account_id, "Account registered");

    Ok(account_id)
}
