//! `EncoreServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → coordinator → rooms.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use encore_content::RoundContentProvider;
use encore_protocol::{Codec, JsonCodec};
use encore_room::{GameConfig, RoomRegistry};
use encore_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{Coordinator, EncoreError};

/// How long a connection may stay silent before it is dropped.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<P, C> {
    pub(crate) coordinator: Coordinator<P>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting an Encore server.
///
/// ```rust,no_run
/// use encore::prelude::*;
///
/// # async fn run() -> Result<(), EncoreError> {
/// let server = EncoreServerBuilder::new()
///     .bind("0.0.0.0:3001")
///     .build(PlaceholderProvider::new())
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct EncoreServerBuilder {
    bind_addr: String,
    game_config: GameConfig,
    idle_timeout: Duration,
}

impl EncoreServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3001".to_string(),
            game_config: GameConfig::default(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Sets the address to listen on.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets round timing and limits for every room.
    pub fn game_config(mut self, config: GameConfig) -> Self {
        self.game_config = config;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Binds the listener. Frames are JSON over WebSocket.
    pub async fn build<P: RoundContentProvider>(
        self,
        provider: P,
    ) -> Result<EncoreServer<P, JsonCodec>, EncoreError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let rooms = RoomRegistry::new(provider, self.game_config);

        let state = Arc::new(ServerState {
            coordinator: Coordinator::new(rooms),
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
        });

        Ok(EncoreServer { transport, state })
    }
}

impl Default for EncoreServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Encore server. Call [`run()`](Self::run) to start accepting.
pub struct EncoreServer<P, C> {
    transport: WebSocketTransport,
    state: Arc<ServerState<P, C>>,
}

impl<P, C> EncoreServer<P, C>
where
    P: RoundContentProvider,
    C: Codec,
{
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    pub fn coordinator(&self) -> &Coordinator<P> {
        &self.state.coordinator
    }

    /// Accepts connections until the process is terminated.
    pub async fn run(self) -> Result<(), EncoreError> {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` resolves, then closes every
    /// room.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> Result<(), EncoreError> {
        tracing::info!("Encore server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "accept failed"),
                },
                () = &mut shutdown => break,
            }
        }

        tracing::info!(rooms = self.state.coordinator.rooms().room_count(), "shutting down");
        self.state.coordinator.rooms().shutdown().await;
        Ok(())
    }
}
