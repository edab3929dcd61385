use thiserror::Error;

use crate::{Ephemeral, EphemeralPublic, EphemeralSecret, Proof, Verifier};

/// Errors produced by a [`Handshake`] implementation.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The client sent a public ephemeral value the exchange rejects outright,
    /// such as one that reduces to zero modulo the group prime.
    #[error("Invalid client ephemeral value")]
    InvalidClientEphemeral,
    /// The client's proof did not match the stored verifier.
    #[error("Proof verification failed")]
    ProofMismatch,
    /// The underlying primitive failed for a reason outside the protocol.
    #[error("Handshake primitive error: {0}")]
    Primitive(String),
}

/// Server side of a verifier-based key exchange.
///
/// The session layer treats the exchange as opaque: it stores the secret half
/// of the ephemeral with the pending login, forwards the public half to the
/// client, and later asks the same implementation to check the client's proof.
/// Implementations must be stateless so that the two calls may land on
/// different instances.
pub trait Handshake: Send + Sync {
    /// Generate a fresh ephemeral pair bound to a stored verifier.
    fn generate_ephemeral(&self, verifier: &Verifier) -> Result<Ephemeral, HandshakeError>;

    /// Check the client's proof against an exchange previously started with
    /// [`generate_ephemeral`](Self::generate_ephemeral).
    ///
    /// On success returns the server's own proof, which the client can use to
    /// confirm the server really holds the verifier.
    fn verify_proof(
        &self,
        verifier: &Verifier,
        secret: &EphemeralSecret,
        client_public: &EphemeralPublic,
        client_proof: &Proof,
    ) -> Result<Proof, HandshakeError>;
}
