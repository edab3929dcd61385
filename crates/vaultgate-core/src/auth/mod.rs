//! Account registration, the login handshake, and session lifecycle.

mod auth_client;
pub use auth_client::*;
pub(crate) mod bearer_token;
pub use bearer_token::{BearerToken, TokenClaims};
mod finalize;
pub use finalize::*;
mod initiate;
pub use initiate::*;
mod policy;
pub use policy::*;
mod register;
pub use register::*;
pub(crate) mod session;
pub use session::{LogoutError, Session, VerifyStage};
