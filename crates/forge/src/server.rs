//! `ForgeServer` builder and accept loop.
//!
//! This is the entry point for running the platform: it ties together
//! transport → protocol → conversion → runtime. Game-specific logic
//! never lives here — a room's behavior comes from whatever validator
//! the Conversion Pipeline synthesizes (or a caller deploys directly).

use std::sync::Arc;

use forge_conversion::{ConversionConfig, ConversionPipeline};
use forge_llm::{CollaboratorBudget, RetryingCollaborator, TextCollaborator};
use forge_protocol::{Codec, JsonCodec};
use forge_room::RoomManager;
use forge_sandbox::Sandbox;
use forge_store::{ArtifactStore, StoreAdapter};
use forge_transport::{Transport, WebSocketTransport};

use crate::auth::Authenticator;
use crate::config::ForgeConfig;
use crate::error::ForgeError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it's cheap to clone across tasks; every field is
/// itself already safe to share (stores and the room manager guard
/// their own interior mutability).
pub(crate) struct ServerState<S, B, C, A> {
    pub(crate) store: Arc<S>,
    pub(crate) rooms: Arc<RoomManager<S, B>>,
    pub(crate) conversion: Arc<ConversionPipeline<S, B, C>>,
    pub(crate) auth: A,
    pub(crate) config: ForgeConfig,
    pub(crate) codec: JsonCodec,
}

/// Builder for configuring and starting a [`ForgeServer`].
pub struct ForgeServerBuilder {
    config: ForgeConfig,
}

impl ForgeServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ForgeConfig::default(),
        }
    }

    pub fn config(mut self, config: ForgeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.config.bind_addr = addr.into();
        self
    }

    /// Builds and binds the server. `store`/`sandbox`/`artifacts` are the
    /// caller's chosen backends (the in-memory references are fine for
    /// development); `collaborator` is the LLM boundary used by the
    /// Conversion Pipeline; `auth` validates each connection's handshake
    /// token.
    pub async fn build<S, B, C, A>(
        self,
        store: Arc<S>,
        sandbox: Arc<B>,
        artifacts: Arc<dyn ArtifactStore>,
        collaborator: C,
        auth: A,
    ) -> Result<ForgeServer<S, B, C, A>, ForgeError>
    where
        S: StoreAdapter + Send + Sync + 'static,
        B: Sandbox + Send + Sync + 'static,
        C: TextCollaborator,
        A: Authenticator,
    {
        let transport = WebSocketTransport::bind_with_max_payload(
            &self.config.bind_addr,
            self.config.max_payload_bytes,
        )
        .await?;

        let rooms = Arc::new(RoomManager::new(
            store.clone(),
            sandbox,
            self.config.runtime.clone(),
        ));
        rooms.clone().spawn_reconnect_sweep(self.config.reconnect_sweep_interval);
        let collaborator = Arc::new(RetryingCollaborator::new(
            collaborator,
            CollaboratorBudget::default(),
        ));
        let conversion = Arc::new(ConversionPipeline::new(
            store.clone(),
            rooms.clone(),
            artifacts,
            collaborator,
            ConversionConfig {
                max_concurrent: self.config.conversion.max_concurrent,
            },
        ));

        let state = Arc::new(ServerState {
            store,
            rooms,
            conversion,
            auth,
            config: self.config,
            codec: JsonCodec,
        });

        Ok(ForgeServer { transport, state })
    }
}

impl Default for ForgeServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running instance of the platform, accepting WebSocket connections.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ForgeServer<S, B, C, A> {
    transport: WebSocketTransport,
    state: Arc<ServerState<S, B, C, A>>,
}

impl<S, B, C, A> ForgeServer<S, B, C, A>
where
    S: StoreAdapter + Send + Sync + 'static,
    B: Sandbox + Send + Sync + 'static,
    C: TextCollaborator,
    A: Authenticator,
{
    pub fn builder() -> ForgeServerBuilder {
        ForgeServerBuilder::new()
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop: accepts incoming connections and spawns a
    /// handler task for each. Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), ForgeError> {
        tracing::info!(bind_addr = %self.state.config.bind_addr, "forge server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
