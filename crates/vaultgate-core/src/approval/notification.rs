use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vaultgate_state::{Repository, RepositoryError, register_repository_item};

use crate::{
    AccountId, DeviceId, NotificationId, SessionId, error::InvalidStateTransitionError,
};

/// How far an approval notification has moved through the delivery pipeline.
///
/// Stages only ever advance, one step at a time. Dispatch and read receipts
/// happen outside this crate; callers report them through
/// [`mark_sent`](crate::approval::mark_sent) and
/// [`mark_arrived`](crate::approval::mark_arrived).
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryStage {
    Created,
    Sent,
    Arrived,
}

impl DeliveryStage {
    /// Validates that `self -> target` is a legal single-step advance.
    pub fn advance_to(
        self,
        target: DeliveryStage,
    ) -> Result<DeliveryStage, InvalidStateTransitionError> {
        match (self, target) {
            (DeliveryStage::Created, DeliveryStage::Sent)
            | (DeliveryStage::Sent, DeliveryStage::Arrived) => Ok(target),
            (from, to) => Err(InvalidStateTransitionError { from, to }),
        }
    }
}

/// What a trusted device is asked to vouch for.
///
/// Opaque to the delivery layer; only the approval handlers interpret it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalPayload {
    /// The session waiting on approval.
    pub session_id: SessionId,
    /// The device that initiated the login.
    pub device_id: DeviceId,
}

/// The recorded outcome of an approval notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum NotificationResolution {
    /// A trusted device vouched for the requesting one.
    #[serde(rename_all = "camelCase")]
    Approved {
        /// The device that approved.
        by: DeviceId,
        /// When the approval was recorded.
        at: DateTime<Utc>,
    },
    /// A trusted device rejected the request.
    #[serde(rename_all = "camelCase")]
    Denied {
        /// The device that denied.
        by: DeviceId,
        /// When the denial was recorded.
        at: DateTime<Utc>,
    },
}

/// One out-of-band approval request, addressed to a single trusted device.
#[allow(missing_docs)]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushNotification {
    pub id: NotificationId,
    pub account_id: AccountId,
    /// The trusted device this notification is addressed to.
    pub recipient_device_id: DeviceId,
    pub payload: ApprovalPayload,
    pub stage: DeliveryStage,
    /// Stamped when the recipient acknowledges receipt.
    pub delivered_at: Option<DateTime<Utc>>,
    /// Recorded once an approver responds; never overwritten afterwards.
    pub resolution: Option<NotificationResolution>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub revision: u64,
}

register_repository_item!(PushNotification, "PushNotification");

impl PushNotification {
    pub(crate) fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Fetches the notification by id, treating soft-deleted records as absent.
pub(crate) async fn get_live(
    repository: &dyn Repository<PushNotification>,
    id: NotificationId,
) -> Result<Option<PushNotification>, RepositoryError> {
    Ok(repository
        .get(id.to_string())
        .await?
        .filter(|notification| !notification.is_deleted()))
}
