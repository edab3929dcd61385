use crate::{account::MfaType, auth::VerifyStage};

/// Decides whether a new login needs out-of-band approval.
///
/// Supplied at [`Server`](crate::Server) construction; implementations must
/// be pure functions of their inputs.
pub trait ApprovalPolicy: Send + Sync {
    /// Computes the verification stage for a session about to be created.
    fn required_stage(&self, mfa_type: MfaType, device_trusted: bool) -> VerifyStage;
}

/// The stock rule: approval is required unless the device is already
/// trusted and the account has no second factor configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultApprovalPolicy;

impl ApprovalPolicy for DefaultApprovalPolicy {
    fn required_stage(&self, mfa_type: MfaType, device_trusted: bool) -> VerifyStage {
        if !device_trusted || mfa_type != MfaType::None {
            VerifyStage::Required
        } else {
            VerifyStage::NotRequired
        }
    }
}
