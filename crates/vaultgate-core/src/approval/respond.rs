use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument, warn};
use vaultgate_state::{Repository, RepositoryError};

use crate::{
    CAS_ATTEMPTS, CoreError, DeviceId, NotificationId,
    account::Account,
    approval::{NotificationResolution, PushNotification, notification},
    auth::{Session, VerifyStage, session},
    device::Device,
    error::{ConflictError, ForbiddenError, NotFoundError, UnauthorizedError},
    trust::{self, TrustDeviceError, VerificationDevice},
};

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum RespondError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    Unauthorized(#[from] UnauthorizedError),
    #[error(transparent)]
    Forbidden(#[from] ForbiddenError),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<RespondError> for CoreError {
    fn from(value: RespondError) -> Self {
        match value {
            RespondError::NotFound(e) => e.into(),
            RespondError::Unauthorized(e) => e.into(),
            RespondError::Forbidden(e) => e.into(),
            RespondError::Conflict(e) => e.into(),
            RespondError::Repository(e) => e.into(),
        }
    }
}

impl From<TrustDeviceError> for RespondError {
    fn from(value: TrustDeviceError) -> Self {
        match value {
            TrustDeviceError::NotFound(e) => e.into(),
            TrustDeviceError::Repository(e) => e.into(),
        }
    }
}

/// Accepts an approval callback from a trusted device.
///
/// Trusts the requesting device first, then moves the session
/// `Required -> Completed` and records the outcome on the notification.
/// Duplicate callbacks for an already-completed session succeed without
/// touching anything.
#[instrument(err, skip_all, fields(notification_id = %notification_id, approver_device_id = %approver_device_id))]
pub(crate) async fn approve(
    accounts: &dyn Repository<Account>,
    devices: &dyn Repository<Device>,
    verifications: &dyn Repository<VerificationDevice>,
    sessions: &dyn Repository<Session>,
    notifications: &dyn Repository<PushNotification>,
    notification_id: NotificationId,
    approver_device_id: DeviceId,
) -> Result<(), RespondError> {
    let pending = load_notification_for(
        verifications,
        notifications,
        notification_id,
        approver_device_id,
    )
    .await?;

    let session = session::get_live(sessions, pending.payload.session_id)
        .await?
        .ok_or(NotFoundError::Session)?;

    if session.stage == VerifyStage::Completed {
        return Ok(());
    }
    if session.is_expired(Utc::now()) {
        return Err(UnauthorizedError::SessionExpired.into());
    }
    if session.stage == VerifyStage::NotRequired {
        return Err(ConflictError::ApprovalNotPending.into());
    }
    if matches!(pending.resolution, Some(NotificationResolution::Denied { .. })) {
        return Err(ConflictError::AlreadyResolved.into());
    }

    // Trust before the stage flip so a partial failure leaves the session
    // still pending rather than completed without a trusted device.
    trust::trust_device(
        accounts,
        devices,
        verifications,
        pending.account_id,
        pending.payload.device_id,
    )
    .await?;

    complete_session(sessions, session).await?;

    let resolution = NotificationResolution::Approved {
        by: approver_device_id,
        at: Utc::now(),
    };
    record_resolution(notifications, pending, resolution).await?;
    info!("Login approved");

    Ok(())
}

/// Accepts a denial callback from a trusted device.
///
/// Records the refusal and leaves the session `Required`; it expires at its
/// TTL unless a sibling notification is approved first. Denying an
/// already-denied notification is a no-op; denying after the session
/// completed fails, since an approval cannot be retracted.
#[instrument(err, skip_all, fields(notification_id = %notification_id, approver_device_id = %approver_device_id))]
pub(crate) async fn deny(
    verifications: &dyn Repository<VerificationDevice>,
    sessions: &dyn Repository<Session>,
    notifications: &dyn Repository<PushNotification>,
    notification_id: NotificationId,
    approver_device_id: DeviceId,
) -> Result<(), RespondError> {
    let pending = load_notification_for(
        verifications,
        notifications,
        notification_id,
        approver_device_id,
    )
    .await?;

    if matches!(pending.resolution, Some(NotificationResolution::Denied { .. })) {
        return Ok(());
    }

    let session = session::get_live(sessions, pending.payload.session_id)
        .await?
        .ok_or(NotFoundError::Session)?;

    if session.stage == VerifyStage::Completed {
        return Err(ConflictError::AlreadyResolved.into());
    }
    if session.stage == VerifyStage::NotRequired {
        return Err(ConflictError::ApprovalNotPending.into());
    }

    let resolution = NotificationResolution::Denied {
        by: approver_device_id,
        at: Utc::now(),
    };
    record_resolution(notifications, pending, resolution).await?;
    info!("Login denied");

    Ok(())
}

/// Loads the notification and checks the responder is currently trusted for
/// its account.
async fn load_notification_for(
    verifications: &dyn Repository<VerificationDevice>,
    notifications: &dyn Repository<PushNotification>,
    notification_id: NotificationId,
    approver_device_id: DeviceId,
) -> Result<PushNotification, RespondError> {
    let pending = notification::get_live(notifications, notification_id)
        .await?
        .ok_or(NotFoundError::Notification)?;

    if !trust::is_trusted(verifications, pending.account_id, approver_device_id).await? {
        warn!("Responder is not trusted for the account");
        return Err(ForbiddenError::DeviceNotTrusted.into());
    }

    Ok(pending)
}

/// Moves the session `Required -> Completed`. A compare-and-set loss
/// against a concurrent approval converges on the completed session.
async fn complete_session(
    sessions: &dyn Repository<Session>,
    session: Session,
) -> Result<(), RespondError> {
    let mut current = session;

    for _ in 0..CAS_ATTEMPTS {
        if current.stage == VerifyStage::Completed {
            return Ok(());
        }

        let now = Utc::now();
        let mut updated = current.clone();
        updated.stage = VerifyStage::Completed;
        updated.updated_at = now;
        updated.revision = current.revision + 1;

        if sessions
            .replace(current.id.to_string(), current.revision, updated)
            .await?
        {
            return Ok(());
        }

        current = session::get_live(sessions, current.id)
            .await?
            .ok_or(NotFoundError::Session)?;
    }

    Err(ConflictError::ConcurrentUpdate.into())
}

/// Writes the outcome onto the notification. An existing resolution is
/// never overwritten.
async fn record_resolution(
    notifications: &dyn Repository<PushNotification>,
    pending: PushNotification,
    resolution: NotificationResolution,
) -> Result<(), RespondError> {
    let mut current = pending;

    for _ in 0..CAS_ATTEMPTS {
        if current.resolution.is_some() {
            return Ok(());
        }

        let now = Utc::now();
        let mut updated = current.clone();
        updated.resolution = Some(resolution.clone());
        updated.updated_at = now;
        updated.revision = current.revision + 1;

        if notifications
            .replace(current.id.to_string(), current.revision, updated)
            .await?
        {
            return Ok(());
        }

        current = notification::get_live(notifications, current.id)
            .await?
            .ok_or(NotFoundError::Notification)?;
    }

    Err(ConflictError::ConcurrentUpdate.into())
}

#[cfg(test)]
mod tests {
    use vaultgate_test::MemoryRepository;

    use super::*;
    use crate::{AccountId, SessionId, testutil};

    struct Fixture {
        accounts: MemoryRepository<Account>,
        devices: MemoryRepository<Device>,
        verifications: MemoryRepository<VerificationDevice>,
        sessions: MemoryRepository<Session>,
        notifications: MemoryRepository<PushNotification>,
        account_id: AccountId,
        /// Trusted device the notifications are addressed to.
        approver: DeviceId,
        /// Untrusted device that initiated the login.
        requester: DeviceId,
        session_id: SessionId,
        notification_id: NotificationId,
    }

    impl Fixture {
        async fn approve(&self, id: NotificationId, by: DeviceId) -> Result<(), RespondError> {
            approve(
                &self.accounts,
                &self.devices,
                &self.verifications,
                &self.sessions,
                &self.notifications,
                id,
                by,
            )
            .await
        }

        async fn deny(&self, id: NotificationId, by: DeviceId) -> Result<(), RespondError> {
            deny(
                &self.verifications,
                &self.sessions,
                &self.notifications,
                id,
                by,
            )
            .await
        }

        async fn session(&self) -> Session {
            self.sessions
                .get(self.session_id.to_string())
                .await
                .unwrap()
                .unwrap()
        }

        async fn notification(&self) -> PushNotification {
            self.notifications
                .get(self.notification_id.to_string())
                .await
                .unwrap()
                .unwrap()
        }
    }

    async fn fixture_with_session(session: Session) -> Fixture {
        let accounts = MemoryRepository::<Account>::default();
        let devices = MemoryRepository::<Device>::default();
        let verifications = MemoryRepository::<VerificationDevice>::default();
        let sessions = MemoryRepository::<Session>::default();
        let notifications = MemoryRepository::<PushNotification>::default();

        let mut account = testutil::account("alice");
        account.id = session.account_id;
        let account_id = account.id;
        accounts.set(account_id.to_string(), account).await.unwrap();

        let approver_device = testutil::device();
        let approver = approver_device.id;
        devices
            .set(approver.to_string(), approver_device)
            .await
            .unwrap();
        trust::trust_device(&accounts, &devices, &verifications, account_id, approver)
            .await
            .unwrap();

        let requester = session.device_id;
        let requester_device = Device::bare(requester, Utc::now());
        devices
            .set(requester.to_string(), requester_device)
            .await
            .unwrap();

        let session_id = session.id;
        sessions.set(session_id.to_string(), session).await.unwrap();

        let pending = testutil::notification(account_id, approver, session_id, requester);
        let notification_id = pending.id;
        notifications
            .set(notification_id.to_string(), pending)
            .await
            .unwrap();

        Fixture {
            accounts,
            devices,
            verifications,
            sessions,
            notifications,
            account_id,
            approver,
            requester,
            session_id,
            notification_id,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with_session(testutil::session(
            AccountId::new_v4(),
            DeviceId::new_v4(),
            VerifyStage::Required,
        ))
        .await
    }

    #[tokio::test]
    async fn test_approve_completes_session_and_trusts_requester() {
        let f = fixture().await;

        f.approve(f.notification_id, f.approver).await.unwrap();

        assert_eq!(f.session().await.stage, VerifyStage::Completed);
        assert!(
            trust::is_trusted(&f.verifications, f.account_id, f.requester)
                .await
                .unwrap()
        );
        assert!(matches!(
            f.notification().await.resolution,
            Some(NotificationResolution::Approved { by, .. }) if by == f.approver
        ));
    }

    #[tokio::test]
    async fn test_approve_by_untrusted_device_is_forbidden() {
        let f = fixture().await;
        let outsider = DeviceId::new_v4();

        let result = f.approve(f.notification_id, outsider).await;

        assert!(matches!(
            result,
            Err(RespondError::Forbidden(ForbiddenError::DeviceNotTrusted))
        ));
        assert_eq!(f.session().await.stage, VerifyStage::Required);
    }

    #[tokio::test]
    async fn test_duplicate_approve_is_a_quiet_success() {
        let f = fixture().await;

        f.approve(f.notification_id, f.approver).await.unwrap();
        let session_revision = f.session().await.revision;
        let notification_revision = f.notification().await.revision;

        f.approve(f.notification_id, f.approver).await.unwrap();

        assert_eq!(f.session().await.revision, session_revision);
        assert_eq!(f.notification().await.revision, notification_revision);
    }

    #[tokio::test]
    async fn test_approve_expired_session_is_unauthorized() {
        let f = fixture_with_session(testutil::expired_session(
            AccountId::new_v4(),
            DeviceId::new_v4(),
        ))
        .await;

        let result = f.approve(f.notification_id, f.approver).await;

        assert!(matches!(
            result,
            Err(RespondError::Unauthorized(
                UnauthorizedError::SessionExpired
            ))
        ));
        assert_eq!(f.session().await.stage, VerifyStage::Required);
    }

    #[tokio::test]
    async fn test_approve_not_required_session_is_a_conflict() {
        let f = fixture_with_session(testutil::session(
            AccountId::new_v4(),
            DeviceId::new_v4(),
            VerifyStage::NotRequired,
        ))
        .await;

        let result = f.approve(f.notification_id, f.approver).await;

        assert!(matches!(
            result,
            Err(RespondError::Conflict(ConflictError::ApprovalNotPending))
        ));
    }

    #[tokio::test]
    async fn test_approve_after_deny_on_same_notification_is_a_conflict() {
        let f = fixture().await;

        f.deny(f.notification_id, f.approver).await.unwrap();
        let result = f.approve(f.notification_id, f.approver).await;

        assert!(matches!(
            result,
            Err(RespondError::Conflict(ConflictError::AlreadyResolved))
        ));
        assert_eq!(f.session().await.stage, VerifyStage::Required);
    }

    #[tokio::test]
    async fn test_deny_records_refusal_without_trusting_or_completing() {
        let f = fixture().await;

        f.deny(f.notification_id, f.approver).await.unwrap();

        assert_eq!(f.session().await.stage, VerifyStage::Required);
        assert!(
            !trust::is_trusted(&f.verifications, f.account_id, f.requester)
                .await
                .unwrap()
        );
        assert!(matches!(
            f.notification().await.resolution,
            Some(NotificationResolution::Denied { by, .. }) if by == f.approver
        ));
    }

    #[tokio::test]
    async fn test_deny_twice_is_a_quiet_success() {
        let f = fixture().await;

        f.deny(f.notification_id, f.approver).await.unwrap();
        let revision = f.notification().await.revision;

        f.deny(f.notification_id, f.approver).await.unwrap();

        assert_eq!(f.notification().await.revision, revision);
    }

    #[tokio::test]
    async fn test_deny_after_completion_cannot_retract_the_approval() {
        let f = fixture().await;

        f.approve(f.notification_id, f.approver).await.unwrap();
        // A second notification for the same session, still unresolved.
        let sibling = testutil::notification(f.account_id, f.approver, f.session_id, f.requester);
        let sibling_id = sibling.id;
        f.notifications
            .set(sibling_id.to_string(), sibling)
            .await
            .unwrap();

        let result = f.deny(sibling_id, f.approver).await;

        assert!(matches!(
            result,
            Err(RespondError::Conflict(ConflictError::AlreadyResolved))
        ));
        assert_eq!(f.session().await.stage, VerifyStage::Completed);
    }

    #[tokio::test]
    async fn test_deny_then_approve_through_sibling_notification() {
        let f = fixture().await;
        let sibling = testutil::notification(f.account_id, f.approver, f.session_id, f.requester);
        let sibling_id = sibling.id;
        f.notifications
            .set(sibling_id.to_string(), sibling)
            .await
            .unwrap();

        f.deny(f.notification_id, f.approver).await.unwrap();
        f.approve(sibling_id, f.approver).await.unwrap();

        assert_eq!(f.session().await.stage, VerifyStage::Completed);
        assert!(
            trust::is_trusted(&f.verifications, f.account_id, f.requester)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_unknown_notification_fails_not_found() {
        let f = fixture().await;

        let result = f.approve(NotificationId::new_v4(), f.approver).await;

        assert!(matches!(
            result,
            Err(RespondError::NotFound(NotFoundError::Notification))
        ));
    }

    #[tokio::test]
    async fn test_approve_after_logout_fails_not_found() {
        let f = fixture().await;
        crate::auth::session::logout(&f.sessions, f.session_id)
            .await
            .unwrap();

        let result = f.approve(f.notification_id, f.approver).await;

        assert!(matches!(
            result,
            Err(RespondError::NotFound(NotFoundError::Session))
        ));
    }
}
