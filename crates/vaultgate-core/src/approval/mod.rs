//! Out-of-band login approval: notification fan-out to trusted devices,
//! delivery tracking, and the approve or deny callbacks.

mod approvals_client;
pub use approvals_client::*;
mod delivery;
pub use delivery::*;
mod notification;
pub use notification::*;
mod request;
pub use request::RequestApprovalError;
pub(crate) use request::request_approval;
mod respond;
pub use respond::*;
