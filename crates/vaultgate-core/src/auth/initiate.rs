use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};
use vaultgate_crypto::{Ephemeral, EphemeralPublic, Handshake, HandshakeError, Salt};
use vaultgate_state::{Repository, RepositoryError};

use crate::{
    CoreError, DeviceId, SessionId,
    account::{self, Account},
    auth::{ApprovalPolicy, Session},
    device::{self, Device},
    error::{ConflictError, InternalError, NotFoundError},
    trust::{self, VerificationDevice},
};

/// Payload for the first login message.
#[allow(missing_docs)]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub account_key: String,
    pub device_id: DeviceId,
}

/// The server half of the first login message.
#[allow(missing_docs)]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub session_id: SessionId,
    /// Server public ephemeral for the key exchange.
    pub server_public: EphemeralPublic,
    /// Salt the client needs to derive its proof.
    pub salt: Salt,
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum SignInError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error(transparent)]
    Internal(#[from] InternalError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<SignInError> for CoreError {
    fn from(value: SignInError) -> Self {
        match value {
            SignInError::NotFound(e) => e.into(),
            SignInError::Conflict(e) => e.into(),
            SignInError::Internal(e) => e.into(),
            SignInError::Repository(e) => e.into(),
        }
    }
}

pub(super) struct InitiatedLogin {
    pub(super) response: SignInResponse,
    pub(super) session: Session,
}

/// Opens a login session for `account_key` from `device_id`.
///
/// Resolves the live account, records the device if it was never seen
/// before, asks the policy for the required verification stage and stores a
/// fresh session holding the server-side ephemeral secret. The secret never
/// leaves the store; the caller only gets the public half and the salt.
#[instrument(err, skip_all, fields(device_id = %request.device_id))]
pub(super) async fn initiate_login(
    accounts: &dyn Repository<Account>,
    devices: &dyn Repository<Device>,
    verifications: &dyn Repository<VerificationDevice>,
    sessions: &dyn Repository<Session>,
    handshake: &dyn Handshake,
    policy: &dyn ApprovalPolicy,
    session_ttl: Duration,
    request: SignInRequest,
) -> Result<InitiatedLogin, SignInError> {
    let account = account::find_by_account_key(accounts, &request.account_key)
        .await?
        .ok_or(NotFoundError::Account)?;

    let now = Utc::now();
    if devices.get(request.device_id.to_string()).await?.is_none() {
        let bare = Device::bare(request.device_id, now);
        devices.set(bare.id.to_string(), bare).await?;
        debug!("Created bare device record");
    }

    let device_trusted = trust::is_trusted(verifications, account.id, request.device_id).await?;
    let stage = policy.required_stage(account.mfa_type, device_trusted);

    let Ephemeral { secret, public } = handshake
        .generate_ephemeral(&account.verifier)
        .map_err(|error| match error {
            HandshakeError::Primitive(message) => InternalError(message),
            other => InternalError(other.to_string()),
        })?;

    let session = Session::new(
        account.id,
        request.device_id,
        secret,
        stage,
        session_ttl,
        now,
    );
    sessions.set(session.id.to_string(), session.clone()).await?;
    info!(session_id = %session.id, stage = ?stage, "Login initiated");

    Ok(InitiatedLogin {
        response: SignInResponse {
            session_id: session.id,
            server_public: public,
            salt: account.salt,
        },
        session,
    })
}

#[cfg(test)]
mod tests {
    use vaultgate_test::{MemoryRepository, StubHandshake};

    use super::*;
    use crate::{AccountId, auth::DefaultApprovalPolicy, auth::VerifyStage, testutil};

    struct Fixture {
        accounts: MemoryRepository<Account>,
        devices: MemoryRepository<Device>,
        verifications: MemoryRepository<VerificationDevice>,
        sessions: MemoryRepository<Session>,
        handshake: StubHandshake,
        account_id: AccountId,
        device_id: DeviceId,
    }

    impl Fixture {
        async fn sign_in(&self, request: SignInRequest) -> Result<InitiatedLogin, SignInError> {
            initiate_login(
                &self.accounts,
                &self.devices,
                &self.verifications,
                &self.sessions,
                &self.handshake,
                &DefaultApprovalPolicy,
                Duration::minutes(10),
                request,
            )
            .await
        }
    }

    async fn fixture() -> Fixture {
        let accounts = MemoryRepository::<Account>::default();
        let devices = MemoryRepository::<Device>::default();

        let account = testutil::account("alice");
        let device = testutil::device();
        let (account_id, device_id) = (account.id, device.id);
        accounts.set(account_id.to_string(), account).await.unwrap();
        devices.set(device_id.to_string(), device).await.unwrap();

        Fixture {
            accounts,
            devices,
            verifications: MemoryRepository::default(),
            sessions: MemoryRepository::default(),
            handshake: StubHandshake::default(),
            account_id,
            device_id,
        }
    }

    fn request(device_id: DeviceId) -> SignInRequest {
        SignInRequest {
            account_key: "alice".to_owned(),
            device_id,
        }
    }

    #[tokio::test]
    async fn test_trusted_device_without_mfa_skips_verification() {
        let f = fixture().await;
        trust::trust_device(
            &f.accounts,
            &f.devices,
            &f.verifications,
            f.account_id,
            f.device_id,
        )
        .await
        .unwrap();

        let initiated = f.sign_in(request(f.device_id)).await.unwrap();

        assert_eq!(initiated.session.stage, VerifyStage::NotRequired);
        assert_eq!(initiated.response.salt.as_bytes(), b"test-salt");
        assert!(!initiated.response.server_public.is_empty());

        let stored = f
            .sessions
            .get(initiated.response.session_id.to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.account_id, f.account_id);
        assert_eq!(stored.device_id, f.device_id);
        assert!(stored.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn test_untrusted_device_requires_verification() {
        let f = fixture().await;

        let initiated = f.sign_in(request(f.device_id)).await.unwrap();

        assert_eq!(initiated.session.stage, VerifyStage::Required);
    }

    #[tokio::test]
    async fn test_mfa_forces_verification_even_when_trusted() {
        let f = fixture().await;
        trust::trust_device(
            &f.accounts,
            &f.devices,
            &f.verifications,
            f.account_id,
            f.device_id,
        )
        .await
        .unwrap();

        let mut account = f
            .accounts
            .get(f.account_id.to_string())
            .await
            .unwrap()
            .unwrap();
        account.mfa_type = crate::account::MfaType::Fingerprint;
        f.accounts
            .set(f.account_id.to_string(), account)
            .await
            .unwrap();

        let initiated = f.sign_in(request(f.device_id)).await.unwrap();

        assert_eq!(initiated.session.stage, VerifyStage::Required);
    }

    #[tokio::test]
    async fn test_unseen_device_gets_bare_record() {
        let f = fixture().await;
        let unseen = DeviceId::new_v4();

        f.sign_in(request(unseen)).await.unwrap();

        let created = f.devices.get(unseen.to_string()).await.unwrap().unwrap();
        assert_eq!(created.os, None);
        assert_eq!(created.hostname, None);
    }

    #[tokio::test]
    async fn test_unknown_account_key_fails_not_found() {
        let f = fixture().await;

        let result = f
            .sign_in(SignInRequest {
                account_key: "nobody".to_owned(),
                device_id: f.device_id,
            })
            .await;

        assert!(matches!(
            result,
            Err(SignInError::NotFound(NotFoundError::Account))
        ));
    }
}
