//! Shared error taxonomy.
//!
//! Each operation exposes its own error enum carrying only the failures that
//! operation can produce, built from the leaf types here via
//! `#[error(transparent)]`. [`CoreError`] is the rollup for embedders that
//! funnel every operation through one surface.

use thiserror::Error;
use vaultgate_state::RepositoryError;

use crate::approval::DeliveryStage;

/// Malformed input that no stored state was consulted for.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid {field}: {reason}")]
pub struct ValidationError {
    /// The offending request field.
    pub field: &'static str,
    /// Why the value was rejected.
    pub reason: &'static str,
}

/// A referenced entity does not exist, or is soft-deleted.
#[allow(missing_docs)]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("Account not found")]
    Account,
    #[error("Device not found")]
    Device,
    #[error("Session not found")]
    Session,
    #[error("Notification not found")]
    Notification,
}

/// The caller failed to establish the identity it claims.
#[allow(missing_docs)]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnauthorizedError {
    #[error("Session expired")]
    SessionExpired,
    #[error("Invalid proof")]
    InvalidProof,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token does not match the session it names")]
    TokenBindingMismatch,
}

/// The caller is authenticated but not allowed to do this.
#[allow(missing_docs)]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ForbiddenError {
    #[error("Verification pending")]
    VerificationPending,
    #[error("Device is not trusted for this account")]
    DeviceNotTrusted,
}

/// The request is well-formed but clashes with current state.
#[allow(missing_docs)]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConflictError {
    #[error("Account key is already registered")]
    AccountKeyTaken,
    #[error("Session does not require approval")]
    ApprovalNotPending,
    #[error("Notification is already resolved")]
    AlreadyResolved,
    #[error("Record was modified concurrently, retry the operation")]
    ConcurrentUpdate,
}

/// A delivery stage change was attempted out of order.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid delivery transition from {from:?} to {to:?}")]
pub struct InvalidStateTransitionError {
    /// The stage the notification is currently in.
    pub from: DeliveryStage,
    /// The stage the caller tried to move it to.
    pub to: DeliveryStage,
}

/// A cryptographic primitive or encoding step failed for a reason that is
/// not the caller's fault.
#[derive(Debug, Error)]
#[error("Internal error: {0}")]
pub struct InternalError(pub String);

/// Rollup of every failure the protocol can produce.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    Unauthorized(#[from] UnauthorizedError),
    #[error(transparent)]
    Forbidden(#[from] ForbiddenError),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error(transparent)]
    InvalidStateTransition(#[from] InvalidStateTransitionError),
    #[error(transparent)]
    Internal(#[from] InternalError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_rejected_state() {
        assert_eq!(
            UnauthorizedError::SessionExpired.to_string(),
            "Session expired"
        );
        assert_eq!(
            ForbiddenError::VerificationPending.to_string(),
            "Verification pending"
        );
        assert_eq!(
            InvalidStateTransitionError {
                from: DeliveryStage::Created,
                to: DeliveryStage::Arrived,
            }
            .to_string(),
            "Invalid delivery transition from Created to Arrived"
        );
    }

    #[test]
    fn test_rollup_is_transparent() {
        let rolled: CoreError = UnauthorizedError::InvalidProof.into();
        assert_eq!(rolled.to_string(), "Invalid proof");
    }
}
