#![doc = include_str!("../README.md")]

pub mod registry;
pub mod repository;

pub use registry::{RepositoryNotFoundError, StateRegistry};
pub use repository::{Repository, RepositoryError, RepositoryItem};
