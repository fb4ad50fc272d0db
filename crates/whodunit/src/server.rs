//! `WhodunitServer` builder and server loop.
//!
//! This is the entry point for running a Whodunit server. It ties together
//! all the layers: transport → protocol → room registry → ruleset.

use std::sync::Arc;

use tokio::sync::Mutex;
use whodunit_protocol::{Codec, JsonCodec};
use whodunit_room::{BlendIn, Elimination, GameRules, RoomRegistry, Ruleset, WordBank};
use whodunit_transport::{
    Connection, Incoming, Transport, WebSocketConnection, WebSocketTransport,
};

use crate::WhodunitError;
use crate::config::ServerConfig;
use crate::handler::handle_connection;

/// Shared state for every connection playing one ruleset.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// registry sits behind a single coarse lock.
pub(crate) struct ServerState<R: Ruleset, C: Codec> {
    pub(crate) rooms: Mutex<RoomRegistry<R>>,
    pub(crate) codec: C,
}

impl<R: Ruleset, C: Codec> ServerState<R, C> {
    fn new(rules: GameRules, words: Arc<WordBank>, codec: C) -> Self {
        Self {
            rooms: Mutex::new(RoomRegistry::new(rules, words)),
            codec,
        }
    }
}

/// Which ruleset a connection plays, picked by its WebSocket path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameRoute {
    BlendIn,
    Elimination,
}

impl GameRoute {
    /// `/elimination` plays elimination; every other path plays blend-in.
    pub fn from_path(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "/elimination" => Self::Elimination,
            _ => Self::BlendIn,
        }
    }
}

/// Builder for configuring and starting a Whodunit server.
///
/// # Example
///
/// ```rust,ignore
/// use whodunit::prelude::*;
///
/// let mut server = WhodunitServer::builder()
///     .bind("0.0.0.0:8080")
///     .elimination_rules(GameRules { min_players: Some(5), ..GameRules::default() })
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct WhodunitServerBuilder {
    bind_addr: String,
    blend_in: GameRules,
    elimination: GameRules,
    words: Option<WordBank>,
}

impl WhodunitServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            blend_in: GameRules::default(),
            elimination: GameRules::default(),
            words: None,
        }
    }

    /// Applies a loaded [`ServerConfig`], reading its word file if it
    /// names one.
    pub fn config(self, config: &ServerConfig) -> Result<Self, WhodunitError> {
        let words = config.load_words()?;
        Ok(self
            .bind(&config.bind)
            .blend_in_rules(config.blend_in.clone())
            .elimination_rules(config.elimination.clone())
            .words(words))
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    pub fn blend_in_rules(mut self, rules: GameRules) -> Self {
        self.blend_in = rules;
        self
    }

    pub fn elimination_rules(mut self, rules: GameRules) -> Self {
        self.elimination = rules;
        self
    }

    /// Replaces the built-in category corpus.
    pub fn words(mut self, words: WordBank) -> Self {
        self.words = Some(words);
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<WhodunitServer<JsonCodec>, WhodunitError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let words = Arc::new(self.words.unwrap_or_default());

        Ok(WhodunitServer {
            transport,
            blend_in: Arc::new(ServerState::new(
                self.blend_in,
                Arc::clone(&words),
                JsonCodec,
            )),
            elimination: Arc::new(ServerState::new(self.elimination, words, JsonCodec)),
        })
    }
}

impl Default for WhodunitServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A Whodunit server hosting both rulesets on one listener.
///
/// Call [`run()`](Self::run) to start accepting connections and
/// [`shutdown()`](Self::shutdown) to stop every room.
pub struct WhodunitServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    blend_in: Arc<ServerState<BlendIn, C>>,
    elimination: Arc<ServerState<Elimination, C>>,
}

impl WhodunitServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> WhodunitServerBuilder {
        WhodunitServerBuilder::new()
    }
}

impl<C: Codec> WhodunitServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming sockets and spawns a task for each. The task runs
    /// the WebSocket upgrade and then the handler for the ruleset its path
    /// selects, so a peer that stalls mid-upgrade only holds its own task.
    /// Runs until the future is dropped.
    pub async fn run(&mut self) -> Result<(), WhodunitError> {
        tracing::info!("Whodunit server running");

        loop {
            let pending = match self.transport.accept().await {
                Ok(pending) => pending,
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                    continue;
                }
            };

            let blend_in = Arc::clone(&self.blend_in);
            let elimination = Arc::clone(&self.elimination);
            tokio::spawn(async move {
                let peer = pending.peer_addr();
                let conn = match pending.upgrade().await {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::debug!(%peer, error = %e, "WebSocket upgrade failed");
                        return;
                    }
                };
                match GameRoute::from_path(conn.route()) {
                    GameRoute::BlendIn => serve(conn, blend_in).await,
                    GameRoute::Elimination => serve(conn, elimination).await,
                }
            });
        }
    }

    /// Stops every room of both rulesets.
    pub async fn shutdown(&self) {
        self.blend_in.rooms.lock().await.shutdown_all().await;
        self.elimination.rooms.lock().await.shutdown_all().await;
        tracing::info!("Whodunit server shut down");
    }
}

async fn serve<R: Ruleset, C: Codec>(conn: WebSocketConnection, state: Arc<ServerState<R, C>>) {
    if let Err(e) = handle_connection(conn, state).await {
        tracing::debug!(ruleset = R::NAME, error = %e, "connection ended with error");
    }
}
