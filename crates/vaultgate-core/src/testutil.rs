//! Record builders shared by unit tests.

use chrono::{Duration, Utc};
use vaultgate_crypto::{EphemeralSecret, Salt, Verifier};

use crate::{
    AccountId, DeviceId, NotificationId, SessionId,
    account::{Account, MfaType},
    approval::{ApprovalPayload, DeliveryStage, PushNotification},
    auth::{Session, VerifyStage},
    device::Device,
};

pub(crate) fn account(account_key: &str) -> Account {
    let now = Utc::now();
    Account {
        id: AccountId::new_v4(),
        account_key: account_key.to_owned(),
        username: format!("{account_key}@example.com"),
        verifier: Verifier::new(b"test-verifier".to_vec()),
        salt: Salt::new(b"test-salt".to_vec()),
        mfa_type: MfaType::None,
        created_at: now,
        updated_at: now,
        deleted_at: None,
        revision: 1,
    }
}

pub(crate) fn device() -> Device {
    Device::bare(DeviceId::new_v4(), Utc::now())
}

pub(crate) fn session(account_id: AccountId, device_id: DeviceId, stage: VerifyStage) -> Session {
    Session::new(
        account_id,
        device_id,
        EphemeralSecret::new(b"test-server-secret".to_vec()),
        stage,
        Duration::minutes(10),
        Utc::now(),
    )
}

pub(crate) fn expired_session(account_id: AccountId, device_id: DeviceId) -> Session {
    Session::new(
        account_id,
        device_id,
        EphemeralSecret::new(b"test-server-secret".to_vec()),
        VerifyStage::Required,
        Duration::minutes(-10),
        Utc::now(),
    )
}

pub(crate) fn notification(
    account_id: AccountId,
    recipient_device_id: DeviceId,
    session_id: SessionId,
    requesting_device_id: DeviceId,
) -> PushNotification {
    let now = Utc::now();
    PushNotification {
        id: NotificationId::new_v4(),
        account_id,
        recipient_device_id,
        payload: ApprovalPayload {
            session_id,
            device_id: requesting_device_id,
        },
        stage: DeliveryStage::Created,
        delivered_at: None,
        resolution: None,
        created_at: now,
        updated_at: now,
        deleted_at: None,
        revision: 1,
    }
}
