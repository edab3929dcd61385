use std::sync::atomic::{AtomicU64, Ordering};

use vaultgate_crypto::{
    Ephemeral, EphemeralPublic, EphemeralSecret, Handshake, HandshakeError, Proof, Verifier,
};

/// A deterministic [`Handshake`] for tests.
///
/// Ephemerals are drawn from a counter so every exchange is unique but
/// reproducible within a test. A proof passes verification exactly when its
/// bytes equal the stored verifier's bytes, which lets a test play the part of
/// a client that knows the password by sending the verifier back as its proof.
#[derive(Default)]
pub struct StubHandshake {
    counter: AtomicU64,
}

/// The fixed proof [`StubHandshake`] returns for every successful
/// verification.
pub const STUB_SERVER_PROOF: &[u8] = b"stub-server-proof";

impl Handshake for StubHandshake {
    fn generate_ephemeral(&self, _verifier: &Verifier) -> Result<Ephemeral, HandshakeError> {
        let nonce = self.counter.fetch_add(1, Ordering::Relaxed);
        Ok(Ephemeral {
            secret: EphemeralSecret::new(nonce.to_be_bytes().to_vec()),
            public: EphemeralPublic::new(nonce.to_be_bytes().to_vec()),
        })
    }

    fn verify_proof(
        &self,
        verifier: &Verifier,
        _secret: &EphemeralSecret,
        client_public: &EphemeralPublic,
        client_proof: &Proof,
    ) -> Result<Proof, HandshakeError> {
        if client_public.is_empty() {
            return Err(HandshakeError::InvalidClientEphemeral);
        }
        if client_proof.as_bytes() != verifier.as_bytes() {
            return Err(HandshakeError::ProofMismatch);
        }
        Ok(Proof::new(STUB_SERVER_PROOF.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_proof_matching_verifier() {
        let handshake = StubHandshake::default();
        let verifier = Verifier::new(b"secret".to_vec());

        let ephemeral = handshake.generate_ephemeral(&verifier).unwrap();
        let proof = handshake
            .verify_proof(
                &verifier,
                &ephemeral.secret,
                &EphemeralPublic::new(vec![1]),
                &Proof::new(b"secret".to_vec()),
            )
            .unwrap();

        assert_eq!(proof.as_bytes(), STUB_SERVER_PROOF);
    }

    #[test]
    fn test_rejects_wrong_proof() {
        let handshake = StubHandshake::default();
        let verifier = Verifier::new(b"secret".to_vec());

        let ephemeral = handshake.generate_ephemeral(&verifier).unwrap();
        let result = handshake.verify_proof(
            &verifier,
            &ephemeral.secret,
            &EphemeralPublic::new(vec![1]),
            &Proof::new(b"wrong".to_vec()),
        );

        assert!(matches!(result, Err(HandshakeError::ProofMismatch)));
    }

    #[test]
    fn test_rejects_empty_client_public() {
        let handshake = StubHandshake::default();
        let verifier = Verifier::new(b"secret".to_vec());

        let ephemeral = handshake.generate_ephemeral(&verifier).unwrap();
        let result = handshake.verify_proof(
            &verifier,
            &ephemeral.secret,
            &EphemeralPublic::new(vec![]),
            &Proof::new(b"secret".to_vec()),
        );

        assert!(matches!(
            result,
            Err(HandshakeError::InvalidClientEphemeral)
        ));
    }

    #[test]
    fn test_ephemerals_are_unique() {
        let handshake = StubHandshake::default();
        let verifier = Verifier::new(b"secret".to_vec());

        let first = handshake.generate_ephemeral(&verifier).unwrap();
        let second = handshake.generate_ephemeral(&verifier).unwrap();

        assert_ne!(first.public, second.public);
    }
}
