//! Per-request admission check for protected operations.
//!
//! Every protected call re-resolves the bearer token against the live
//! session, so revocation and expiry take effect immediately rather than
//! at the next login.

use chrono::Utc;
use thiserror::Error;
use vaultgate_state::{Repository, RepositoryError};

use crate::{
    AccountId, CoreError, DeviceId, Server, SessionId,
    auth::{BearerToken, Session, VerifyStage, bearer_token::TokenSigner, session},
    error::{ForbiddenError, UnauthorizedError},
};

/// The identity a verified token resolves to.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthContext {
    pub account_id: AccountId,
    pub device_id: DeviceId,
    pub session_id: SessionId,
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum AuthorizeError {
    #[error(transparent)]
    Unauthorized(#[from] UnauthorizedError),
    #[error(transparent)]
    Forbidden(#[from] ForbiddenError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<AuthorizeError> for CoreError {
    fn from(value: AuthorizeError) -> Self {
        match value {
            AuthorizeError::Unauthorized(e) => e.into(),
            AuthorizeError::Forbidden(e) => e.into(),
            AuthorizeError::Repository(e) => e.into(),
        }
    }
}

/// Resolves a bearer token to the session it is bound to and checks the
/// session still admits protected calls.
///
/// A token whose session is gone reads the same as a forged one; the
/// caller learns nothing about whether the session ever existed.
pub(crate) async fn authorize(
    sessions: &dyn Repository<Session>,
    token_signer: &TokenSigner,
    token: &BearerToken,
) -> Result<AuthContext, AuthorizeError> {
    let claims = token_signer.verify(token)?;

    let now = Utc::now();
    if now > claims.expires_at {
        return Err(UnauthorizedError::SessionExpired.into());
    }

    let session = session::get_live(sessions, claims.session_id)
        .await?
        .ok_or(UnauthorizedError::InvalidToken)?;

    if session.account_id != claims.account_id || session.device_id != claims.device_id {
        return Err(UnauthorizedError::TokenBindingMismatch.into());
    }
    if session.is_expired(now) {
        return Err(UnauthorizedError::SessionExpired.into());
    }
    if session.stage == VerifyStage::Required {
        return Err(ForbiddenError::VerificationPending.into());
    }

    Ok(AuthContext {
        account_id: session.account_id,
        device_id: session.device_id,
        session_id: session.id,
    })
}

/// Admission checks for protected operations.
pub struct GuardClient {
    pub(crate) server: Server,
}

impl GuardClient {
    fn new(server: Server) -> Self {
        Self { server }
    }

    /// Verifies a bearer token and returns the identity it resolves to.
    pub async fn authorize(&self, token: &BearerToken) -> Result<AuthContext, AuthorizeError> {
        let internal = &self.server.internal;
        authorize(internal.sessions.as_ref(), &internal.token_signer, token).await
    }
}

impl Server {
    /// Admission checks for protected operations.
    pub fn guard(&self) -> GuardClient {
        GuardClient::new(self.clone())
    }
}
