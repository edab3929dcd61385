#![doc = include_str!("../README.md")]

mod handshake;
pub use handshake::{STUB_SERVER_PROOF, StubHandshake};
mod repository;
pub use repository::MemoryRepository;
mod server;
pub use server::{TestServer, memory_registry};
