//! `FourlineServer` builder and server loop.
//!
//! This is the entry point for running a fourline match server. It ties
//! together all the layers: transport → protocol → router → lobby and
//! sessions.

use std::future::Future;
use std::sync::Arc;

use fourline_protocol::JsonCodec;
use fourline_session::{
    InMemoryStore, MatchStore, Outbox, SessionRegistry, StoreSender, spawn_store_writer,
};
use fourline_timer::{Clock, Scheduler, SystemClock};
use fourline_transport::{Connection, Transport, TransportError, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{ConnectionRouter, FourlineError, ServerConfig};

/// The shared state every connection handler and timer works against.
///
/// Built once at startup. Cheap to clone.
#[derive(Clone)]
pub struct ServerContext {
    router: Arc<ConnectionRouter>,
    scheduler: Scheduler,
}

impl ServerContext {
    /// Wires the outbox, registry, and router together.
    pub fn new(config: &ServerConfig, store: StoreSender, clock: Arc<dyn Clock>) -> Self {
        let outbox = Outbox::new();
        let scheduler = Scheduler::new();
        let registry = SessionRegistry::new(
            config.session,
            outbox.clone(),
            store,
            scheduler.clone(),
            Arc::clone(&clock),
        );
        let router = ConnectionRouter::new(
            config.matchmaking,
            registry,
            outbox,
            scheduler.clone(),
            clock,
        );
        Self { router, scheduler }
    }

    pub fn router(&self) -> &Arc<ConnectionRouter> {
        &self.router
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        self.router.registry()
    }

    /// Number of timers armed and not yet finished or cancelled.
    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    /// Runs one connection until it closes. Any transport works, which is
    /// how tests drive the server over in-memory connections.
    pub fn serve<C>(
        &self,
        conn: C,
    ) -> impl Future<Output = Result<(), FourlineError>> + Send + use<C>
    where
        C: Connection<Error = TransportError>,
    {
        handle_connection(conn, Arc::clone(&self.router), JsonCodec)
    }

    /// Cancels every outstanding timer.
    pub async fn shutdown(&self) {
        self.router.shutdown().await;
    }
}

/// Builder for configuring and starting a fourline server.
///
/// # Example
///
/// ```rust,ignore
/// use fourline::prelude::*;
///
/// let server = FourlineServer::builder()
///     .bind("0.0.0.0:8000")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct FourlineServerBuilder {
    config: ServerConfig,
    clock: Arc<dyn Clock>,
}

impl FourlineServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn matchmaking(mut self, matchmaking: fourline_lobby::MatchmakingConfig) -> Self {
        self.config.matchmaking = matchmaking;
        self
    }

    pub fn session(mut self, session: fourline_session::SessionConfig) -> Self {
        self.config.session = session;
        self
    }

    /// Sets the clock used for record timestamps.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Binds the listener and starts the server with an in-memory store.
    pub async fn build(self) -> Result<FourlineServer, FourlineError> {
        self.build_with_store(InMemoryStore::new()).await
    }

    /// Binds the listener and starts the server, persisting through
    /// `store`.
    pub async fn build_with_store<S: MatchStore>(
        self,
        store: S,
    ) -> Result<FourlineServer, FourlineError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;
        // The writer drains and exits once the last sender is dropped.
        let (store_tx, _writer) = spawn_store_writer(store);
        let context = ServerContext::new(&self.config, store_tx, self.clock);
        Ok(FourlineServer { transport, context })
    }
}

impl Default for FourlineServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound fourline server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct FourlineServer {
    transport: WebSocketTransport,
    context: ServerContext,
}

impl FourlineServer {
    /// Creates a new builder.
    pub fn builder() -> FourlineServerBuilder {
        FourlineServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    pub fn context(&self) -> &ServerContext {
        &self.context
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), FourlineError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` resolves, then cancels every
    /// timer. Connections already accepted keep their tasks.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), FourlineError>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "fourline server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let serve = self.context.serve(conn);
                        tokio::spawn(async move {
                            if let Err(e) = serve.await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
                () = &mut shutdown => break,
            }
        }

        self.context.shutdown().await;
        tracing::info!("fourline server stopped");
        Ok(())
    }
}
