use vaultgate_state::RepositoryError;

use crate::{
    AccountId, Server, SessionId,
    approval::{self, RequestApprovalError},
    auth::{
        LogoutError, SignInError, SignInRequest, SignInResponse, SignUpError, SignUpRequest,
        StartSessionError, StartSessionRequest, StartSessionResponse, VerifyStage, finalize,
        initiate, register, session,
    },
};

/// Registration, login handshake, and session lifecycle operations.
pub struct AuthClient {
    pub(crate) server: Server,
}

impl AuthClient {
    fn new(server: Server) -> Self {
        Self { server }
    }

    /// Registers an account and trusts the registering device.
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<AccountId, SignUpError> {
        let internal = &self.server.internal;
        register::sign_up(
            internal.accounts.as_ref(),
            internal.devices.as_ref(),
            internal.verifications.as_ref(),
            request,
        )
        .await
    }

    /// Opens a login session and, when the policy demands verification,
    /// fans approval notifications out to the account's trusted devices.
    pub async fn sign_in(&self, request: SignInRequest) -> Result<SignInResponse, SignInError> {
        let internal = &self.server.internal;
        let initiated = initiate::initiate_login(
            internal.accounts.as_ref(),
            internal.devices.as_ref(),
            internal.verifications.as_ref(),
            internal.sessions.as_ref(),
            internal.handshake.as_ref(),
            internal.policy.as_ref(),
            internal.settings.session_ttl,
            request,
        )
        .await?;

        if initiated.session.stage == VerifyStage::Required {
            approval::request_approval(
                internal.verifications.as_ref(),
                internal.notifications.as_ref(),
                &initiated.session,
            )
            .await?;
        }

        Ok(initiated.response)
    }

    /// Completes the handshake and returns the session's bearer token.
    pub async fn start_session(
        &self,
        request: StartSessionRequest,
    ) -> Result<StartSessionResponse, StartSessionError> {
        let internal = &self.server.internal;
        finalize::start_session(
            internal.accounts.as_ref(),
            internal.sessions.as_ref(),
            internal.handshake.as_ref(),
            &internal.token_signer,
            request,
        )
        .await
    }

    /// Revokes a session.
    pub async fn logout(&self, session_id: SessionId) -> Result<(), LogoutError> {
        session::logout(self.server.internal.sessions.as_ref(), session_id).await
    }

    /// Sweeps sessions past their expiry. Returns how many were removed.
    pub async fn purge_expired_sessions(&self) -> Result<usize, RepositoryError> {
        session::purge_expired_sessions(self.server.internal.sessions.as_ref()).await
    }
}

impl From<RequestApprovalError> for SignInError {
    fn from(value: RequestApprovalError) -> Self {
        match value {
            RequestApprovalError::NotFound(e) => e.into(),
            RequestApprovalError::Conflict(e) => e.into(),
            RequestApprovalError::Repository(e) => e.into(),
        }
    }
}

impl Server {
    /// Login and session operations.
    pub fn auth(&self) -> AuthClient {
        AuthClient::new(self.clone())
    }
}
