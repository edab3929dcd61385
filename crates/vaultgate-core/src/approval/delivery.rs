use chrono::Utc;
use thiserror::Error;
use tracing::{debug, instrument};
use vaultgate_state::{Repository, RepositoryError};

use crate::{
    CAS_ATTEMPTS, CoreError, NotificationId,
    approval::{DeliveryStage, PushNotification, notification},
    error::{ConflictError, InvalidStateTransitionError, NotFoundError},
};

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    InvalidStateTransition(#[from] InvalidStateTransitionError),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<DeliveryError> for CoreError {
    fn from(value: DeliveryError) -> Self {
        match value {
            DeliveryError::NotFound(e) => e.into(),
            DeliveryError::InvalidStateTransition(e) => e.into(),
            DeliveryError::Conflict(e) => e.into(),
            DeliveryError::Repository(e) => e.into(),
        }
    }
}

/// Records that the push transport accepted the notification.
pub(super) async fn mark_sent(
    repository: &dyn Repository<PushNotification>,
    notification_id: NotificationId,
) -> Result<(), DeliveryError> {
    advance_delivery(repository, notification_id, DeliveryStage::Sent).await
}

/// Records the recipient device's delivery receipt.
pub(super) async fn mark_arrived(
    repository: &dyn Repository<PushNotification>,
    notification_id: NotificationId,
) -> Result<(), DeliveryError> {
    advance_delivery(repository, notification_id, DeliveryStage::Arrived).await
}

#[instrument(err, skip_all, fields(notification_id = %notification_id, target = ?target))]
async fn advance_delivery(
    repository: &dyn Repository<PushNotification>,
    notification_id: NotificationId,
    target: DeliveryStage,
) -> Result<(), DeliveryError> {
    let mut current = notification::get_live(repository, notification_id)
        .await?
        .ok_or(NotFoundError::Notification)?;

    for _ in 0..CAS_ATTEMPTS {
        let stage = current.stage.advance_to(target)?;

        let now = Utc::now();
        let mut updated = current.clone();
        updated.stage = stage;
        if target == DeliveryStage::Arrived {
            updated.delivered_at = Some(now);
        }
        updated.updated_at = now;
        updated.revision = current.revision + 1;

        if repository
            .replace(current.id.to_string(), current.revision, updated)
            .await?
        {
            debug!("Delivery stage advanced");
            return Ok(());
        }

        current = notification::get_live(repository, notification_id)
            .await?
            .ok_or(NotFoundError::Notification)?;
    }

    Err(ConflictError::ConcurrentUpdate.into())
}

#[cfg(test)]
mod tests {
    use vaultgate_test::MemoryRepository;

    use super::*;
    use crate::{AccountId, DeviceId, SessionId, testutil};

    async fn seeded() -> (MemoryRepository<PushNotification>, NotificationId) {
        let repository = MemoryRepository::<PushNotification>::default();
        let pending = testutil::notification(
            AccountId::new_v4(),
            DeviceId::new_v4(),
            SessionId::new_v4(),
            DeviceId::new_v4(),
        );
        let id = pending.id;
        repository.set(id.to_string(), pending).await.unwrap();
        (repository, id)
    }

    #[tokio::test]
    async fn test_delivery_advances_one_stage_at_a_time() {
        let (repository, id) = seeded().await;

        mark_sent(&repository, id).await.unwrap();
        let sent = repository.get(id.to_string()).await.unwrap().unwrap();
        assert_eq!(sent.stage, DeliveryStage::Sent);
        assert!(sent.delivered_at.is_none());

        mark_arrived(&repository, id).await.unwrap();
        let arrived = repository.get(id.to_string()).await.unwrap().unwrap();
        assert_eq!(arrived.stage, DeliveryStage::Arrived);
        assert!(arrived.delivered_at.is_some());
        assert_eq!(arrived.revision, 3);
    }

    #[tokio::test]
    async fn test_receipt_before_send_is_rejected() {
        let (repository, id) = seeded().await;

        let result = mark_arrived(&repository, id).await;

        assert!(matches!(
            result,
            Err(DeliveryError::InvalidStateTransition(
                InvalidStateTransitionError {
                    from: DeliveryStage::Created,
                    to: DeliveryStage::Arrived,
                }
            ))
        ));
    }

    #[tokio::test]
    async fn test_double_send_is_rejected() {
        let (repository, id) = seeded().await;

        mark_sent(&repository, id).await.unwrap();
        let result = mark_sent(&repository, id).await;

        assert!(matches!(
            result,
            Err(DeliveryError::InvalidStateTransition(
                InvalidStateTransitionError {
                    from: DeliveryStage::Sent,
                    to: DeliveryStage::Sent,
                }
            ))
        ));
    }

    #[tokio::test]
    async fn test_unknown_notification_fails_not_found() {
        let (repository, _) = seeded().await;

        let result = mark_sent(&repository, NotificationId::new_v4()).await;

        assert!(matches!(
            result,
            Err(DeliveryError::NotFound(NotFoundError::Notification))
        ));
    }
}
