use crate::{
    AccountId, Server,
    account::{DeleteAccountError, MfaType, SetMfaTypeError, manage},
};

/// Account management operations.
pub struct AccountsClient {
    pub(crate) server: Server,
}

impl AccountsClient {
    fn new(server: Server) -> Self {
        Self { server }
    }

    /// Changes which second factor the account demands at login.
    pub async fn set_mfa_type(
        &self,
        account_id: AccountId,
        mfa_type: MfaType,
    ) -> Result<(), SetMfaTypeError> {
        manage::set_mfa_type(self.server.internal.accounts.as_ref(), account_id, mfa_type).await
    }

    /// Soft-deletes the account, revoking its device trust and sessions.
    pub async fn delete(&self, account_id: AccountId) -> Result<(), DeleteAccountError> {
        let internal = &self.server.internal;
        manage::delete_account(
            internal.accounts.as_ref(),
            internal.verifications.as_ref(),
            internal.sessions.as_ref(),
            account_id,
        )
        .await
    }
}

impl Server {
    /// Account management operations.
    pub fn accounts(&self) -> AccountsClient {
        AccountsClient::new(self.clone())
    }
}
