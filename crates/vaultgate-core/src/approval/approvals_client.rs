use crate::{
    DeviceId, NotificationId, Server, SessionId,
    approval::{DeliveryError, RequestApprovalError, RespondError, delivery, request, respond},
    auth::session,
    error::NotFoundError,
};

/// Out-of-band login verification operations.
pub struct ApprovalsClient {
    pub(crate) server: Server,
}

impl ApprovalsClient {
    fn new(server: Server) -> Self {
        Self { server }
    }

    /// Re-issues approval notifications for a pending session, one per
    /// trusted device. Returns the ids of the created notifications.
    pub async fn request_approval(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<NotificationId>, RequestApprovalError> {
        let internal = &self.server.internal;
        let session = session::get_live(internal.sessions.as_ref(), session_id)
            .await?
            .ok_or(NotFoundError::Session)?;

        request::request_approval(
            internal.verifications.as_ref(),
            internal.notifications.as_ref(),
            &session,
        )
        .await
    }

    /// Approves the login a notification refers to, trusting the device
    /// that asked for it.
    pub async fn approve(
        &self,
        notification_id: NotificationId,
        approver_device_id: DeviceId,
    ) -> Result<(), RespondError> {
        let internal = &self.server.internal;
        respond::approve(
            internal.accounts.as_ref(),
            internal.devices.as_ref(),
            internal.verifications.as_ref(),
            internal.sessions.as_ref(),
            internal.notifications.as_ref(),
            notification_id,
            approver_device_id,
        )
        .await
    }

    /// Denies the login a notification refers to.
    pub async fn deny(
        &self,
        notification_id: NotificationId,
        approver_device_id: DeviceId,
    ) -> Result<(), RespondError> {
        let internal = &self.server.internal;
        respond::deny(
            internal.verifications.as_ref(),
            internal.sessions.as_ref(),
            internal.notifications.as_ref(),
            notification_id,
            approver_device_id,
        )
        .await
    }

    /// Records that the push transport accepted a notification.
    pub async fn mark_sent(&self, notification_id: NotificationId) -> Result<(), DeliveryError> {
        delivery::mark_sent(self.server.internal.notifications.as_ref(), notification_id).await
    }

    /// Records a recipient device's delivery receipt.
    pub async fn mark_arrived(&self, notification_id: NotificationId) -> Result<(), DeliveryError> {
        delivery::mark_arrived(self.server.internal.notifications.as_ref(), notification_id).await
    }
}

impl Server {
    /// Login approval operations.
    pub fn approvals(&self) -> ApprovalsClient {
        ApprovalsClient::new(self.clone())
    }
}
