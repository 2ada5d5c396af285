//! `AccordServer` builder and server loop.
//!
//! This is the entry point for running a swap-handshake coordinator. It
//! ties together all the layers: transport → protocol → session → room,
//! plus the thin HTTP surface for session creation/lookup.

use std::sync::Arc;

use accord_protocol::{Codec, JsonCodec, ServerEvent};
use accord_room::RoomManager;
use accord_session::{SessionLocks, SessionStore};
use accord_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::{http, AccordError};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The room
/// manager needs a `Mutex` (room creation and teardown mutate it); the
/// store and lock registry synchronize internally.
pub(crate) struct ServerState<S: SessionStore, C: Codec> {
    pub(crate) store: S,
    pub(crate) locks: SessionLocks,
    pub(crate) rooms: Mutex<RoomManager<ServerEvent>>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting an Accord server.
///
/// # Example
///
/// ```rust,no_run
/// use accord::prelude::*;
///
/// # async fn run() -> Result<(), AccordError> {
/// let server = AccordServerBuilder::new()
///     .bind("0.0.0.0:6001")
///     .http_bind("0.0.0.0:6000")
///     .build(MemoryStore::new())
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct AccordServerBuilder {
    ws_bind: String,
    http_bind: String,
}

impl AccordServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            ws_bind: "127.0.0.1:6001".to_string(),
            http_bind: "127.0.0.1:6000".to_string(),
        }
    }

    /// Sets the address the WebSocket transport binds to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.ws_bind = addr.to_string();
        self
    }

    /// Sets the address the HTTP surface binds to.
    pub fn http_bind(mut self, addr: &str) -> Self {
        self.http_bind = addr.to_string();
        self
    }

    /// Builds the server on top of the given session store.
    ///
    /// Uses `JsonCodec` as the wire codec.
    pub async fn build<S: SessionStore>(
        self,
        store: S,
    ) -> Result<AccordServer<S, JsonCodec>, AccordError> {
        let transport = WebSocketTransport::bind(&self.ws_bind).await?;
        let http_listener = tokio::net::TcpListener::bind(&self.http_bind)
            .await
            .map_err(AccordError::Http)?;

        let state = Arc::new(ServerState {
            store,
            locks: SessionLocks::new(),
            rooms: Mutex::new(RoomManager::new()),
            codec: JsonCodec,
        });

        Ok(AccordServer {
            transport,
            http_listener,
            state,
        })
    }
}

impl Default for AccordServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Accord server.
///
/// Call [`run()`](Self::run) to start serving.
pub struct AccordServer<S: SessionStore, C: Codec> {
    transport: WebSocketTransport,
    http_listener: tokio::net::TcpListener,
    state: Arc<ServerState<S, C>>,
}

impl<S: SessionStore, C: Codec + Clone> AccordServer<S, C> {
    /// Creates a new builder.
    pub fn builder() -> AccordServerBuilder {
        AccordServerBuilder::new()
    }

    /// Returns the local address the WebSocket transport is bound to.
    pub fn ws_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns the local address the HTTP surface is bound to.
    pub fn http_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.http_listener.local_addr()
    }

    /// Runs the server.
    ///
    /// Serves the HTTP surface in a background task and accepts
    /// WebSocket connections on the current one, spawning a handler
    /// task per connection. Connection failures are logged and never
    /// bring the process down. Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), AccordError> {
        tracing::info!("Accord server running");

        let router = http::router(Arc::clone(&self.state));
        let http_listener = self.http_listener;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(http_listener, router).await {
                tracing::error!(error = %e, "http surface exited");
            }
        });

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(conn, state).await
                        {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    // Includes upgrades rejected for missing identity
                    // headers; keep accepting.
                    tracing::debug!(error = %e, "accept failed");
                }
            }
        }
    }
}
