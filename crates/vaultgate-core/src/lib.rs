#![doc = include_str!("../README.md")]

pub mod account;
pub mod approval;
pub mod auth;
pub mod device;
mod error;
pub mod guard;
pub mod server;
pub mod trust;
pub use error::{
    ConflictError, CoreError, ForbiddenError, InternalError, InvalidStateTransitionError,
    NotFoundError, UnauthorizedError, ValidationError,
};
pub use server::{Server, ServerSettings};

mod ids;
pub use ids::*;

#[cfg(test)]
pub(crate) mod testutil;

/// How many rounds an optimistic update retries a lost compare-and-set
/// before reporting [`ConflictError::ConcurrentUpdate`].
pub(crate) const CAS_ATTEMPTS: usize = 3;
