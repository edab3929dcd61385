use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument};
use vaultgate_state::{Repository, RepositoryError};

use crate::{
    AccountId, CAS_ATTEMPTS, CoreError,
    account::{self, Account, MfaType},
    auth::{LogoutError, Session, session},
    error::{ConflictError, NotFoundError},
    trust::{self, RevokeTrustError, VerificationDevice},
};

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum SetMfaTypeError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<SetMfaTypeError> for CoreError {
    fn from(value: SetMfaTypeError) -> Self {
        match value {
            SetMfaTypeError::NotFound(e) => e.into(),
            SetMfaTypeError::Conflict(e) => e.into(),
            SetMfaTypeError::Repository(e) => e.into(),
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum DeleteAccountError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<DeleteAccountError> for CoreError {
    fn from(value: DeleteAccountError) -> Self {
        match value {
            DeleteAccountError::NotFound(e) => e.into(),
            DeleteAccountError::Conflict(e) => e.into(),
            DeleteAccountError::Repository(e) => e.into(),
        }
    }
}

impl From<RevokeTrustError> for DeleteAccountError {
    fn from(value: RevokeTrustError) -> Self {
        match value {
            RevokeTrustError::Conflict(e) => e.into(),
            RevokeTrustError::Repository(e) => e.into(),
        }
    }
}

/// Changes which second factor the account demands at login.
///
/// Takes effect on the next sign-in; sessions already open are untouched.
#[instrument(err, skip_all, fields(account_id = %account_id, mfa_type = ?mfa_type))]
pub(super) async fn set_mfa_type(
    accounts: &dyn Repository<Account>,
    account_id: AccountId,
    mfa_type: MfaType,
) -> Result<(), SetMfaTypeError> {
    let mut current = account::get_live(accounts, account_id)
        .await?
        .ok_or(NotFoundError::Account)?;

    for _ in 0..CAS_ATTEMPTS {
        if current.mfa_type == mfa_type {
            return Ok(());
        }

        let mut updated = current.clone();
        updated.mfa_type = mfa_type;
        updated.updated_at = Utc::now();
        updated.revision = current.revision + 1;

        if accounts
            .replace(account_id.to_string(), current.revision, updated)
            .await?
        {
            info!("Second factor updated");
            return Ok(());
        }

        current = account::get_live(accounts, account_id)
            .await?
            .ok_or(NotFoundError::Account)?;
    }

    Err(ConflictError::ConcurrentUpdate.into())
}

/// Soft-deletes the account and everything hanging off it.
///
/// The tombstone lands first so the account key frees immediately; trust
/// rows and live sessions are then retired. Notifications are left in
/// place as delivery history.
#[instrument(err, skip_all, fields(account_id = %account_id))]
pub(super) async fn delete_account(
    accounts: &dyn Repository<Account>,
    verifications: &dyn Repository<VerificationDevice>,
    sessions: &dyn Repository<Session>,
    account_id: AccountId,
) -> Result<(), DeleteAccountError> {
    let account = account::get_live(accounts, account_id)
        .await?
        .ok_or(NotFoundError::Account)?;

    tombstone_account(accounts, account).await?;

    let trust_rows: Vec<VerificationDevice> = verifications
        .list()
        .await?
        .into_iter()
        .filter(|verification| verification.account_id == account_id && !verification.is_deleted())
        .collect();
    for row in trust_rows {
        trust::retire_row(verifications, row).await?;
    }

    let live_sessions: Vec<Session> = sessions
        .list()
        .await?
        .into_iter()
        .filter(|session| session.account_id == account_id && !session.is_deleted())
        .collect();
    for session in live_sessions {
        match session::logout(sessions, session.id).await {
            // Raced with a logout that removed the record; nothing left to do.
            Ok(()) | Err(LogoutError::NotFound(_)) => {}
            Err(LogoutError::Conflict(e)) => return Err(e.into()),
            Err(LogoutError::Repository(e)) => return Err(e.into()),
        }
    }

    info!("Account deleted");
    Ok(())
}

/// Soft-deletes the account record. A lost compare-and-set against another
/// deleter converges; the cascades are idempotent either way.
async fn tombstone_account(
    accounts: &dyn Repository<Account>,
    account: Account,
) -> Result<(), DeleteAccountError> {
    let mut current = account;

    for _ in 0..CAS_ATTEMPTS {
        if current.is_deleted() {
            return Ok(());
        }

        let now = Utc::now();
        let mut updated = current.clone();
        updated.deleted_at = Some(now);
        updated.updated_at = now;
        updated.revision = current.revision + 1;

        if accounts
            .replace(current.id.to_string(), current.revision, updated)
            .await?
        {
            return Ok(());
        }

        match accounts.get(current.id.to_string()).await? {
            Some(reloaded) => current = reloaded,
            None => return Ok(()),
        }
    }

    Err(ConflictError::ConcurrentUpdate.into())
}
