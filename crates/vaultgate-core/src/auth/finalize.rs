use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};
use vaultgate_crypto::{EphemeralPublic, Handshake, HandshakeError, Proof};
use vaultgate_state::{Repository, RepositoryError};

use crate::{
    CAS_ATTEMPTS, CoreError, SessionId,
    account::{self, Account},
    auth::{
        Session,
        bearer_token::{BearerToken, TokenClaims, TokenSigner},
        session,
    },
    error::{
        ConflictError, InternalError, NotFoundError, UnauthorizedError, ValidationError,
    },
};

/// Payload for the second login message.
#[allow(missing_docs)]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub session_id: SessionId,
    pub client_public: EphemeralPublic,
    pub client_proof: Proof,
}

/// A finished handshake.
#[allow(missing_docs)]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    pub token: BearerToken,
    /// Proof the client checks to authenticate the server in return.
    pub server_proof: Proof,
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum StartSessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    Unauthorized(#[from] UnauthorizedError),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error(transparent)]
    Internal(#[from] InternalError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<StartSessionError> for CoreError {
    fn from(value: StartSessionError) -> Self {
        match value {
            StartSessionError::Validation(e) => e.into(),
            StartSessionError::NotFound(e) => e.into(),
            StartSessionError::Unauthorized(e) => e.into(),
            StartSessionError::Conflict(e) => e.into(),
            StartSessionError::Internal(e) => e.into(),
            StartSessionError::Repository(e) => e.into(),
        }
    }
}

/// Completes the handshake and mints the session's bearer token.
///
/// The proof check happens against the stored server secret; a mismatch
/// leaves the session untouched. Success stamps `finalized_at` once and
/// returns a token whose lifetime mirrors the session. Retries after a
/// success are safe and produce the identical token. The token is minted
/// whatever the verification stage; the guard is what withholds protected
/// access while approval is pending.
#[instrument(err, skip_all, fields(session_id = %request.session_id))]
pub(super) async fn start_session(
    accounts: &dyn Repository<Account>,
    sessions: &dyn Repository<Session>,
    handshake: &dyn Handshake,
    token_signer: &TokenSigner,
    request: StartSessionRequest,
) -> Result<StartSessionResponse, StartSessionError> {
    let session = session::get_live(sessions, request.session_id)
        .await?
        .ok_or(NotFoundError::Session)?;

    let now = Utc::now();
    if session.is_expired(now) {
        return Err(UnauthorizedError::SessionExpired.into());
    }

    let account = account::get_live(accounts, session.account_id)
        .await?
        .ok_or(NotFoundError::Account)?;

    let server_proof = handshake
        .verify_proof(
            &account.verifier,
            &session.server_secret,
            &request.client_public,
            &request.client_proof,
        )
        .map_err(|error| match error {
            HandshakeError::ProofMismatch => {
                warn!("Client proof mismatch");
                UnauthorizedError::InvalidProof.into()
            }
            HandshakeError::InvalidClientEphemeral => ValidationError {
                field: "clientPublic",
                reason: "not a valid public ephemeral",
            }
            .into(),
            HandshakeError::Primitive(message) => {
                StartSessionError::from(InternalError(message))
            }
        })?;

    let claims = TokenClaims {
        account_id: session.account_id,
        device_id: session.device_id,
        session_id: session.id,
        expires_at: session.expires_at,
    };

    stamp_finalized(sessions, session, now).await?;

    let token = token_signer
        .mint(&claims)
        .map_err(|error| InternalError(error.to_string()))?;
    info!("Handshake finalized");

    Ok(StartSessionResponse {
        token,
        server_proof,
    })
}

/// Records the first successful finalization. Converges silently when the
/// stamp is already there.
async fn stamp_finalized(
    sessions: &dyn Repository<Session>,
    session: Session,
    now: DateTime<Utc>,
) -> Result<(), StartSessionError> {
    let mut current = session;

    for _ in 0..CAS_ATTEMPTS {
        if current.finalized_at.is_some() {
            return Ok(());
        }

        let mut updated = current.clone();
        updated.finalized_at = Some(now);
        updated.updated_at = now;
        updated.revision = current.revision + 1;

        if sessions
            .replace(current.id.to_string(), current.revision, updated)
            .await?
        {
            return Ok(());
        }

        current = session::get_live(sessions, current.id)
            .await?
            .ok_or(NotFoundError::Session)?;
    }

    Err(ConflictError::ConcurrentUpdate.into())
}
