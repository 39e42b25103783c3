//! `GambitServer` builder and accept loop.
//!
//! This is the entry point for running a Gambit server. It ties the
//! layers together: transport → protocol → session registry.

use std::sync::Arc;

use gambit_protocol::{Codec, JsonCodec};
use gambit_session::{RulesOracle, SessionConfig, SessionRegistry};
use gambit_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::GambitError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// The mutex guards only registry bookkeeping (membership maps, the
/// matchmaking scan); per-session mutation is serialized by the session
/// actors, so move traffic in different sessions never contends here
/// for long.
pub(crate) struct ServerState<O: RulesOracle, C: Codec> {
    pub(crate) registry: Mutex<SessionRegistry<O>>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Gambit server.
///
/// # Example
///
/// ```rust,ignore
/// let server = GambitServerBuilder::new()
///     .bind("0.0.0.0:5500")
///     .build(MyOracle)
///     .await?;
/// server.run().await
/// ```
pub struct GambitServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
}

impl GambitServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:5500".to_string(),
            session_config: SessionConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the per-session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Builds the server around the given rules oracle.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport` — the stack every
    /// browser client speaks.
    pub async fn build<O: RulesOracle>(
        self,
        oracle: O,
    ) -> Result<GambitServer<O, JsonCodec>, GambitError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry: Mutex::new(SessionRegistry::with_config(
                oracle,
                self.session_config,
            )),
            codec: JsonCodec,
        });

        Ok(GambitServer { transport, state })
    }
}

impl Default for GambitServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Gambit server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct GambitServer<O: RulesOracle, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<O, C>>,
}

impl<O, C> GambitServer<O, C>
where
    O: RulesOracle,
    C: Codec,
{
    /// Creates a new builder.
    pub fn builder() -> GambitServerBuilder {
        GambitServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Runs until the process is terminated; a failed accept is logged
    /// and the loop continues.
    pub async fn run(mut self) -> Result<(), GambitError> {
        tracing::info!("Gambit server running");

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
