//! SRP-6a implementation of the [`Handshake`] trait, using the 4096-bit group
//! from RFC 5054 with SHA-256 as the hash.
//!
//! The client half of the exchange lives here as well. Production clients run
//! it on their own devices; inside this workspace it exists so end to end
//! tests can drive a real exchange against the server half.

use sha2::Sha256;
use srp::{
    client::{SrpClient, SrpClientVerifier},
    groups::G_4096,
    server::SrpServer,
};

use crate::{
    Ephemeral, EphemeralPublic, EphemeralSecret, Handshake, HandshakeError, Proof, Salt, Verifier,
    generate_random_bytes,
};

const EPHEMERAL_SECRET_LEN: usize = 64;
const SALT_LEN: usize = 16;

/// Server side of the SRP-6a exchange.
///
/// Stateless; both trait methods construct the underlying [`SrpServer`] on
/// demand, so a single instance can serve any number of concurrent logins.
#[derive(Clone, Debug, Default)]
pub struct SrpHandshake;

impl Handshake for SrpHandshake {
    fn generate_ephemeral(&self, verifier: &Verifier) -> Result<Ephemeral, HandshakeError> {
        let server = SrpServer::<Sha256>::new(&G_4096);
        let secret = generate_random_bytes(EPHEMERAL_SECRET_LEN);
        let public = server.compute_public_ephemeral(&secret, verifier.as_bytes());
        Ok(Ephemeral {
            secret: EphemeralSecret::new(secret.to_vec()),
            public: EphemeralPublic::new(public),
        })
    }

    fn verify_proof(
        &self,
        verifier: &Verifier,
        secret: &EphemeralSecret,
        client_public: &EphemeralPublic,
        client_proof: &Proof,
    ) -> Result<Proof, HandshakeError> {
        let server = SrpServer::<Sha256>::new(&G_4096);
        let server_verifier = server
            .process_reply(
                secret.as_bytes(),
                verifier.as_bytes(),
                client_public.as_bytes(),
            )
            .map_err(|_| HandshakeError::InvalidClientEphemeral)?;
        server_verifier
            .verify_client(client_proof.as_bytes())
            .map_err(|_| HandshakeError::ProofMismatch)?;
        Ok(Proof::new(server_verifier.proof().to_vec()))
    }
}

/// Derive the verifier and a fresh salt for a new account.
///
/// Run by the client at registration; only the resulting pair ever reaches the
/// server.
pub fn derive_verifier(identity: &str, password: &[u8]) -> (Verifier, Salt) {
    let client = SrpClient::<Sha256>::new(&G_4096);
    let salt = generate_random_bytes(SALT_LEN);
    let verifier = client.compute_verifier(identity.as_bytes(), password, &salt);
    (Verifier::new(verifier), Salt::new(salt.to_vec()))
}

/// Client side of one SRP login exchange.
///
/// Follows the message order a real client uses: send the public ephemeral,
/// receive the salt and the server's public value, send the proof, then check
/// the server's proof.
pub struct SrpClientFlow {
    client: SrpClient<'static, Sha256>,
    identity: Vec<u8>,
    password: Vec<u8>,
    secret: Vec<u8>,
    public: Vec<u8>,
}

impl SrpClientFlow {
    /// Start an exchange for the given identity and password.
    pub fn new(identity: &str, password: &[u8]) -> Self {
        let client = SrpClient::<Sha256>::new(&G_4096);
        let secret = generate_random_bytes(EPHEMERAL_SECRET_LEN);
        let public = client.compute_public_ephemeral(&secret);
        Self {
            client,
            identity: identity.as_bytes().to_vec(),
            password: password.to_vec(),
            secret: secret.to_vec(),
            public,
        }
    }

    /// The client's public ephemeral value, sent to the server to open the
    /// exchange.
    pub fn public(&self) -> EphemeralPublic {
        EphemeralPublic::new(self.public.clone())
    }

    /// Process the server's reply and derive the shared session key.
    pub fn prove(
        &self,
        salt: &Salt,
        server_public: &EphemeralPublic,
    ) -> Result<SrpClientSession, HandshakeError> {
        let verifier = self
            .client
            .process_reply(
                &self.secret,
                &self.identity,
                &self.password,
                salt.as_bytes(),
                server_public.as_bytes(),
            )
            .map_err(|e| HandshakeError::Primitive(e.to_string()))?;
        Ok(SrpClientSession { inner: verifier })
    }
}

/// A client exchange that has processed the server's reply and can produce and
/// check proofs.
pub struct SrpClientSession {
    inner: SrpClientVerifier<Sha256>,
}

impl SrpClientSession {
    /// The client's proof, sent to the server to finish the login.
    pub fn proof(&self) -> Proof {
        Proof::new(self.inner.proof().to_vec())
    }

    /// Check the server's proof, confirming it holds the real verifier.
    pub fn verify_server(&self, proof: &Proof) -> Result<(), HandshakeError> {
        self.inner
            .verify_server(proof.as_bytes())
            .map_err(|_| HandshakeError::ProofMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_exchange_succeeds() {
        let (verifier, salt) = derive_verifier("alice", b"hunter2");

        let client = SrpClientFlow::new("alice", b"hunter2");
        let handshake = SrpHandshake;

        let ephemeral = handshake.generate_ephemeral(&verifier).unwrap();
        let session = client.prove(&salt, &ephemeral.public).unwrap();

        let server_proof = handshake
            .verify_proof(
                &verifier,
                &ephemeral.secret,
                &client.public(),
                &session.proof(),
            )
            .unwrap();
        session.verify_server(&server_proof).unwrap();
    }

    #[test]
    fn test_wrong_password_is_rejected() {
        let (verifier, salt) = derive_verifier("alice", b"hunter2");

        let client = SrpClientFlow::new("alice", b"swordfish");
        let handshake = SrpHandshake;

        let ephemeral = handshake.generate_ephemeral(&verifier).unwrap();
        let session = client.prove(&salt, &ephemeral.public).unwrap();

        let result = handshake.verify_proof(
            &verifier,
            &ephemeral.secret,
            &client.public(),
            &session.proof(),
        );
        assert!(matches!(result, Err(HandshakeError::ProofMismatch)));
    }

    #[test]
    fn test_each_exchange_uses_fresh_ephemerals() {
        let (verifier, _) = derive_verifier("alice", b"hunter2");
        let handshake = SrpHandshake;

        let first = handshake.generate_ephemeral(&verifier).unwrap();
        let second = handshake.generate_ephemeral(&verifier).unwrap();
        assert_ne!(first.public, second.public);
    }
}
