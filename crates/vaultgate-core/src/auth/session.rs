use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};
use vaultgate_crypto::EphemeralSecret;
use vaultgate_state::{Repository, RepositoryError, register_repository_item};

use crate::{
    AccountId, CAS_ATTEMPTS, CoreError, DeviceId, SessionId,
    error::{ConflictError, NotFoundError},
};

/// Whether a login still needs out-of-band device approval.
///
/// `Required` moves to `Completed` through an approval and never back.
/// `NotRequired` never changes.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerifyStage {
    Required,
    Completed,
    NotRequired,
}

/// One login attempt.
///
/// Holds the server-side ephemeral secret for the handshake so the two
/// login messages may land on different process instances. The secret is
/// written once at creation and never rewritten; the whole record becomes
/// permanently invalid once `expires_at` passes, whatever the stage.
#[allow(missing_docs)]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub account_id: AccountId,
    pub device_id: DeviceId,
    /// Server-side handshake secret. Zeroized on drop, redacted in logs.
    pub server_secret: EphemeralSecret,
    pub expires_at: DateTime<Utc>,
    pub stage: VerifyStage,
    /// Stamped by the first successful handshake finalization.
    pub finalized_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub revision: u64,
}

register_repository_item!(Session, "Session");

impl Session {
    pub(crate) fn new(
        account_id: AccountId,
        device_id: DeviceId,
        server_secret: EphemeralSecret,
        stage: VerifyStage,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SessionId::new_v4(),
            account_id,
            device_id,
            server_secret,
            expires_at: now + ttl,
            stage,
            finalized_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            revision: 1,
        }
    }

    pub(crate) fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub(crate) fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Fetches the session by id, treating soft-deleted records as absent.
pub(crate) async fn get_live(
    repository: &dyn Repository<Session>,
    id: SessionId,
) -> Result<Option<Session>, RepositoryError> {
    Ok(repository
        .get(id.to_string())
        .await?
        .filter(|session| !session.is_deleted()))
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum LogoutError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<LogoutError> for CoreError {
    fn from(value: LogoutError) -> Self {
        match value {
            LogoutError::NotFound(e) => e.into(),
            LogoutError::Conflict(e) => e.into(),
            LogoutError::Repository(e) => e.into(),
        }
    }
}

/// Revokes a session by soft-deleting it.
///
/// The guard starts rejecting its token on the next protected call.
/// Logging out an already logged-out session is a no-op.
#[instrument(err, skip_all, fields(session_id = %session_id))]
pub(crate) async fn logout<R: Repository<Session> + ?Sized>(
    repository: &R,
    session_id: SessionId,
) -> Result<(), LogoutError> {
    let mut current = repository
        .get(session_id.to_string())
        .await?
        .ok_or(NotFoundError::Session)?;

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
            .replace(session_id.to_string(), current.revision, updated)
            .await?
        {
            info!("Session revoked");
            return Ok(());
        }

        current = repository
            .get(session_id.to_string())
            .await?
            .ok_or(NotFoundError::Session)?;
    }

    Err(ConflictError::ConcurrentUpdate.into())
}

/// Soft-deletes every live session past its expiry. Returns how many were
/// swept. Sessions are already unusable once expired; this is hygiene, not
/// enforcement.
#[instrument(err, skip_all)]
pub(super) async fn purge_expired_sessions<R: Repository<Session> + ?Sized>(
    repository: &R,
) -> Result<usize, RepositoryError> {
    let now = Utc::now();
    let expired: Vec<Session> = repository
        .list()
        .await?
        .into_iter()
        .filter(|session| !session.is_deleted() && session.is_expired(now))
        .collect();

    let mut purged = 0;
    for session in expired {
        let mut updated = session.clone();
        updated.deleted_at = Some(now);
        updated.updated_at = now;
        updated.revision = session.revision + 1;

        // A lost race means another writer touched the session; leave it
        // for the next sweep.
        if repository
            .replace(session.id.to_string(), session.revision, updated)
            .await?
        {
            purged += 1;
        }
    }
    info!(purged, "Purged expired sessions");

    Ok(purged)
}
