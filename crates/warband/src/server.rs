//! `WarbandServer` builder and accept loop.
//!
//! This is the entry point for running a Warband battle server. It ties
//! together all the layers: transport → protocol → session → room →
//! store.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::time::{Duration, Instant};

use warband_protocol::JsonCodec;
use warband_room::RoomRegistry;
use warband_store::{HistoryStore, RoomDirectory, spawn_recorder};
use warband_transport::{Transport, WebSocketTransport};

use crate::WarbandError;
use crate::gateway::handle_connection;

/// File under the data directory holding the room directory.
const DIRECTORY_FILE: &str = "rooms.json";

/// Subdirectory of the data directory holding battle histories.
const HISTORY_DIR: &str = "battle-history";

/// Default idle timeout for connections.
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// registry does its own locking internally.
pub(crate) struct ServerState {
    pub(crate) registry: RoomRegistry,
    pub(crate) codec: JsonCodec,
    pub(crate) started_at: Instant,
    pub(crate) connections: AtomicUsize,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a Warband server.
///
/// # Example
///
/// ```rust,ignore
/// use warband::prelude::*;
///
/// let server = WarbandServer::builder()
///     .bind("0.0.0.0:8080")
///     .data_dir("/var/lib/warband")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct WarbandServerBuilder {
    bind_addr: String,
    data_dir: PathBuf,
    idle_timeout: Duration,
}

impl WarbandServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            data_dir: PathBuf::from("data"),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the directory for the room directory and battle histories.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Sets how long a connection may stay silent before it is dropped.
    ///
    /// Any inbound frame resets the clock, pings included. Defaults to
    /// 60 seconds.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Builds and starts the server.
    ///
    /// Binds the listener, starts the battle-event recorder, and brings
    /// every previously created room back as an empty waiting room.
    pub async fn build(self) -> Result<WarbandServer, WarbandError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let directory =
            RoomDirectory::new(self.data_dir.join(DIRECTORY_FILE));
        let store = HistoryStore::new(self.data_dir.join(HISTORY_DIR));
        let registry = RoomRegistry::new(directory, spawn_recorder(store));

        // A corrupt directory file costs the listing, not the server.
        match registry.rehydrate().await {
            Ok(restored) if restored > 0 => {
                tracing::info!(rooms = restored, "restored rooms from disk");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "room directory unreadable, starting empty");
            }
        }

        let state = Arc::new(ServerState {
            registry,
            codec: JsonCodec,
            started_at: Instant::now(),
            connections: AtomicUsize::new(0),
            idle_timeout: self.idle_timeout,
        });

        Ok(WarbandServer { transport, state })
    }
}

impl Default for WarbandServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Warband battle server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct WarbandServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl WarbandServer {
    /// Creates a new builder.
    pub fn builder() -> WarbandServerBuilder {
        WarbandServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a gateway task for each.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), WarbandError> {
        tracing::info!("Warband server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
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
