#![doc = include_str!("../README.md")]

mod encoding;
pub use encoding::{FromStrVisitor, NotB64Encoded};
mod handshake;
pub use handshake::{Handshake, HandshakeError};
mod types;
pub use types::{Ephemeral, EphemeralPublic, EphemeralSecret, Proof, Salt, Verifier};
mod util;
pub use util::generate_random_bytes;

#[cfg(feature = "srp")]
mod srp;
#[cfg(feature = "srp")]
pub use crate::srp::{SrpClientFlow, SrpClientSession, SrpHandshake, derive_verifier};
