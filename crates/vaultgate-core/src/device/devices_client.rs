use vaultgate_state::RepositoryError;

use crate::{
    AccountId, DeviceId, Server,
    device::{CreateDeviceError, CreateDeviceRequest, create},
    trust::{self, RevokeTrustError, TrustDeviceError},
};

/// Device registration and trust operations.
pub struct DevicesClient {
    pub(crate) server: Server,
}

impl DevicesClient {
    fn new(server: Server) -> Self {
        Self { server }
    }

    /// Registers a device and returns its id.
    pub async fn create(&self, request: CreateDeviceRequest) -> Result<DeviceId, CreateDeviceError> {
        create::create_device(self.server.internal.devices.as_ref(), request).await
    }

    /// Whether the device currently holds a live trust row for the account.
    pub async fn is_trusted(
        &self,
        account_id: AccountId,
        device_id: DeviceId,
    ) -> Result<bool, RepositoryError> {
        trust::is_trusted(
            self.server.internal.verifications.as_ref(),
            account_id,
            device_id,
        )
        .await
    }

    /// Marks the device as trusted for the account.
    pub async fn trust(
        &self,
        account_id: AccountId,
        device_id: DeviceId,
    ) -> Result<(), TrustDeviceError> {
        let internal = &self.server.internal;
        trust::trust_device(
            internal.accounts.as_ref(),
            internal.devices.as_ref(),
            internal.verifications.as_ref(),
            account_id,
            device_id,
        )
        .await
    }

    /// Withdraws the device's trust for the account. Completed sessions
    /// stay valid until they expire.
    pub async fn revoke_trust(
        &self,
        account_id: AccountId,
        device_id: DeviceId,
    ) -> Result<(), RevokeTrustError> {
        trust::revoke_trust(
            self.server.internal.verifications.as_ref(),
            account_id,
            device_id,
        )
        .await
    }

    /// The devices currently trusted for the account.
    pub async fn list_trusted(&self, account_id: AccountId) -> Result<Vec<DeviceId>, RepositoryError> {
        trust::list_trusted(self.server.internal.verifications.as_ref(), account_id).await
    }
}

impl Server {
    /// Device registration and trust operations.
    pub fn devices(&self) -> DevicesClient {
        DevicesClient::new(self.clone())
    }
}
