use chrono::Duration;
use vaultgate_crypto::generate_random_bytes;

/// Tunables applied to every operation of one [`Server`](crate::Server).
pub struct ServerSettings {
    /// How long a session stays usable after sign-in.
    pub session_ttl: Duration,
    /// Key the bearer token authentication codes are computed with.
    ///
    /// Defaults to a fresh random key, which invalidates all outstanding
    /// tokens on restart. Deployments serving one store from several
    /// instances must configure the same key everywhere.
    pub token_signing_key: Vec<u8>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            session_ttl: Duration::minutes(10),
            token_signing_key: generate_random_bytes(32).to_vec(),
        }
    }
}

impl std::fmt::Debug for ServerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerSettings")
            .field("session_ttl", &self.session_ttl)
            .finish_non_exhaustive()
    }
}
