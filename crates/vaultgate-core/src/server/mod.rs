//! Server construction and the handles the per-area clients hang off.

mod internal;
pub(crate) use internal::ServerInternal;
mod settings;
pub use settings::ServerSettings;

use std::sync::Arc;

use vaultgate_crypto::Handshake;
use vaultgate_state::{RepositoryNotFoundError, StateRegistry};

use crate::auth::{ApprovalPolicy, DefaultApprovalPolicy, bearer_token::TokenSigner};

/// One configured server instance.
///
/// Cheap to clone; clones share the same repositories, settings, and
/// signing key. Operations are grouped into per-area clients reached
/// through accessor methods such as [`Server::auth`].
#[derive(Clone, Debug)]
pub struct Server {
    pub(crate) internal: Arc<ServerInternal>,
}

impl Server {
    /// Builds a server over the registry's repositories, under the default
    /// approval policy.
    ///
    /// Fails when any of the five record stores is missing from the
    /// registry, so misconfiguration surfaces at startup rather than on
    /// first use.
    pub fn new(
        registry: &StateRegistry,
        handshake: Arc<dyn Handshake>,
        settings: ServerSettings,
    ) -> Result<Self, RepositoryNotFoundError> {
        Self::with_policy(registry, handshake, Arc::new(DefaultApprovalPolicy), settings)
    }

    /// Like [`Server::new`], but with a caller-supplied approval policy.
    pub fn with_policy(
        registry: &StateRegistry,
        handshake: Arc<dyn Handshake>,
        policy: Arc<dyn ApprovalPolicy>,
        settings: ServerSettings,
    ) -> Result<Self, RepositoryNotFoundError> {
        let token_signer = TokenSigner::new(settings.token_signing_key.clone());
        let internal = ServerInternal {
            accounts: registry.get_required()?,
            devices: registry.get_required()?,
            verifications: registry.get_required()?,
            sessions: registry.get_required()?,
            notifications: registry.get_required()?,
            settings,
            handshake,
            policy,
            token_signer,
        };

        Ok(Self {
            internal: Arc::new(internal),
        })
    }
}

#[cfg(test)]
mod tests {
    use vaultgate_test::{MemoryRepository, StubHandshake};

    use super::*;
    use crate::{account::Account, device::Device};

    #[test]
    fn test_construction_fails_fast_when_a_repository_is_missing() {
        let registry = StateRegistry::new();
        registry.register(Arc::new(MemoryRepository::<Account>::default()));
        registry.register(Arc::new(MemoryRepository::<Device>::default()));

        let result = Server::new(
            &registry,
            Arc::new(StubHandshake::default()),
            ServerSettings::default(),
        );

        assert!(result.is_err());
    }
}
