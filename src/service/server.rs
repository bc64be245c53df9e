//! Connection acceptor and server lifecycle.
//!
//! Accepts stream connections, assigns each one an identity, registers the
//! session, sends the identity-assignment handshake, and starts the per-
//! connection loops. No single session's failure ever reaches the accept
//! loop or any other session.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

use crate::config::{RelayConfig, ServerConfig};
use crate::error::Result;
use crate::protocol::registry::Registry;
use crate::protocol::router::Router;
use crate::protocol::{hello_body, msg};
use crate::service::session::{self, Session};
use crate::utils::metrics::Metrics;

/// The listening relay server.
pub struct RelayServer {
    listener: TcpListener,
    registry: Arc<Registry>,
    router: Arc<Router>,
    metrics: Arc<Metrics>,
    config: ServerConfig,
}

impl RelayServer {
    /// Bind the listener and assemble the routing state.
    #[instrument(skip(config), fields(address = %config.address))]
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(&config.address).await?;
        info!(address = %config.address, "Listening");

        let metrics = Arc::new(Metrics::new());
        let registry = Arc::new(Registry::new());
        let router = Arc::new(Router::new(registry.clone(), metrics.clone()));

        Ok(Self {
            listener,
            registry,
            router,
            metrics,
            config,
        })
    }

    /// The actual bound address; useful when binding port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    /// Accept connections until the task is dropped.
    pub async fn run(self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => self.accept_connection(stream, peer),
                Err(e) => {
                    error!(error = %e, "Error accepting connection");
                }
            }
        }
    }

    /// Accept connections until the shutdown channel fires, then wait for
    /// active sessions to drain (bounded by the configured timeout).
    pub async fn run_with_shutdown(self, mut shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Shutting down server. Waiting for sessions to close...");

                    let timeout = tokio::time::sleep(Duration::from_secs(self.config.shutdown_timeout_secs));
                    tokio::pin!(timeout);

                    loop {
                        tokio::select! {
                            _ = &mut timeout => {
                                warn!("Shutdown timeout reached, forcing exit");
                                break;
                            }
                            _ = tokio::time::sleep(Duration::from_millis(500)) => {
                                let sessions = self.registry.len();
                                info!(sessions, "Waiting for sessions to close");
                                if sessions == 0 {
                                    info!("All sessions closed, shutting down");
                                    break;
                                }
                            }
                        }
                    }

                    self.metrics.log_metrics();
                    return Ok(());
                }

                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, peer)) => self.accept_connection(stream, peer),
                        Err(e) => {
                            error!(error = %e, "Error accepting connection");
                        }
                    }
                }
            }
        }
    }

    /// Wire up one accepted connection: identity, session, registration,
    /// handshake, loops.
    fn accept_connection(&self, stream: TcpStream, peer: SocketAddr) {
        if self.registry.len() >= self.config.max_connections {
            warn!(%peer, max = self.config.max_connections, "Connection limit reached, refusing");
            drop(stream);
            return;
        }

        if let Err(e) = stream.set_nodelay(true) {
            warn!(%peer, error = %e, "Failed to set TCP_NODELAY");
        }

        let id = self.registry.allocate();
        let (reader, writer) = stream.into_split();

        let (session, outbound_rx) = Session::new(
            id,
            peer,
            self.registry.clone(),
            self.metrics.clone(),
        );
        tokio::spawn(session::write_loop(session.clone(), outbound_rx, writer));

        // Registered before the handshake: the session is routable the moment
        // its identity is on the wire.
        self.registry.register(session.clone());
        self.metrics.connection_established();
        info!(session_id = id, %peer, "Client connected");

        session.send_packet(msg::HELLO, id, hello_body(id));

        tokio::spawn(session::read_loop(
            session,
            reader,
            self.router.clone(),
            self.config.max_frame_size,
        ));
    }
}

/// Bind and run a relay server, shutting down gracefully on CTRL+C.
#[instrument(skip(config), fields(address = %config.server.address))]
pub async fn start_server(config: &RelayConfig) -> Result<()> {
    let server = RelayServer::bind(config.server.clone()).await?;

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received CTRL+C signal, shutting down");
            let _ = shutdown_tx.send(()).await;
        }
    });

    server.run_with_shutdown(shutdown_rx).await
}
