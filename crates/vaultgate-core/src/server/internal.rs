use std::sync::Arc;

use vaultgate_crypto::Handshake;
use vaultgate_state::Repository;

use crate::{
    account::Account,
    approval::PushNotification,
    auth::{ApprovalPolicy, Session, bearer_token::TokenSigner},
    device::Device,
    server::ServerSettings,
    trust::VerificationDevice,
};

pub(crate) struct ServerInternal {
    pub(crate) accounts: Arc<dyn Repository<Account>>,
    pub(crate) devices: Arc<dyn Repository<Device>>,
    pub(crate) verifications: Arc<dyn Repository<VerificationDevice>>,
    pub(crate) sessions: Arc<dyn Repository<Session>>,
    pub(crate) notifications: Arc<dyn Repository<PushNotification>>,

    pub(crate) settings: ServerSettings,
    pub(crate) handshake: Arc<dyn Handshake>,
    pub(crate) policy: Arc<dyn ApprovalPolicy>,
    pub(crate) token_signer: TokenSigner,
}

impl std::fmt::Debug for ServerInternal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerInternal")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
