use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument};
use vaultgate_state::{Repository, RepositoryError};

use crate::{
    CoreError, NotificationId,
    approval::{ApprovalPayload, DeliveryStage, PushNotification},
    auth::{Session, VerifyStage},
    error::{ConflictError, NotFoundError},
    trust::{self, VerificationDevice},
};

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum RequestApprovalError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<RequestApprovalError> for CoreError {
    fn from(value: RequestApprovalError) -> Self {
        match value {
            RequestApprovalError::NotFound(e) => e.into(),
            RequestApprovalError::Conflict(e) => e.into(),
            RequestApprovalError::Repository(e) => e.into(),
        }
    }
}

/// Fans an approval request out to every trusted device of the session's
/// account.
///
/// Returns the created notification ids. The list is empty when the account
/// has no trusted devices left; the session then simply expires unapproved.
#[instrument(err, skip_all, fields(session_id = %session.id))]
pub(crate) async fn request_approval(
    verifications: &dyn Repository<VerificationDevice>,
    notifications: &dyn Repository<PushNotification>,
    session: &Session,
) -> Result<Vec<NotificationId>, RequestApprovalError> {
    if session.stage != VerifyStage::Required {
        return Err(ConflictError::ApprovalNotPending.into());
    }

    let recipients = trust::list_trusted(verifications, session.account_id).await?;

    let now = Utc::now();
    let mut created = Vec::with_capacity(recipients.len());
    for recipient_device_id in recipients {
        let notification = PushNotification {
            id: NotificationId::new_v4(),
            account_id: session.account_id,
            recipient_device_id,
            payload: ApprovalPayload {
                session_id: session.id,
                device_id: session.device_id,
            },
            stage: DeliveryStage::Created,
            delivered_at: None,
            resolution: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            revision: 1,
        };
        notifications
            .set(notification.id.to_string(), notification.clone())
            .await?;
        created.push(notification.id);
    }
    info!(recipients = created.len(), "Approval requested");

    Ok(created)
}
