use std::sync::Arc;

use vaultgate_core::{
    Server, ServerSettings, account::Account, approval::PushNotification, auth::Session,
    device::Device, trust::VerificationDevice,
};
use vaultgate_crypto::Handshake;
use vaultgate_state::StateRegistry;

use crate::{MemoryRepository, StubHandshake};

/// A fully wired in-memory [`Server`] for tests.
///
/// The registry stays reachable so a test can look at the raw records
/// behind the server's back.
pub struct TestServer {
    #[allow(missing_docs)]
    pub server: Server,
    /// The registry the server was built from.
    pub registry: StateRegistry,
}

impl TestServer {
    /// A server over empty in-memory repositories, the stub handshake, and
    /// default settings.
    pub fn new() -> Self {
        Self::build(Arc::new(StubHandshake::default()), ServerSettings::default())
    }

    /// Like [`TestServer::new`] with custom settings.
    pub fn with_settings(settings: ServerSettings) -> Self {
        Self::build(Arc::new(StubHandshake::default()), settings)
    }

    /// Like [`TestServer::new`] with a custom handshake implementation.
    pub fn with_handshake(handshake: Arc<dyn Handshake>) -> Self {
        Self::build(handshake, ServerSettings::default())
    }

    fn build(handshake: Arc<dyn Handshake>, settings: ServerSettings) -> Self {
        let registry = memory_registry();
        let server =
            Server::new(&registry, handshake, settings).expect("all repositories are registered");

        Self { server, registry }
    }
}

impl Default for TestServer {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`StateRegistry`] with an empty [`MemoryRepository`] registered for
/// every record the server persists.
pub fn memory_registry() -> StateRegistry {
    let registry = StateRegistry::new();
    registry.register(Arc::new(MemoryRepository::<Account>::default()));
    registry.register(Arc::new(MemoryRepository::<Device>::default()));
    registry.register(Arc::new(MemoryRepository::<VerificationDevice>::default()));
    registry.register(Arc::new(MemoryRepository::<Session>::default()));
    registry.register(Arc::new(MemoryRepository::<PushNotification>::default()));
    registry
}
