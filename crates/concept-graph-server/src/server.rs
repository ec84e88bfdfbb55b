//! TCP accept loop and per-connection frame handling.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use concept_graph_core::config::ServerConfig;
use concept_graph_graph::KnowledgeEngine;
use tokio::io::{BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::handlers::Handlers;
use crate::protocol::{
    decode_request, encode_response, read_frame, write_frame, ErrorKind, ProtocolError, Response,
};

/// Wire protocol server bound to a socket.
///
/// One tokio task per connection; at most `max_connections` connections are
/// served at once and later ones wait for a permit.
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    handlers: Arc<Handlers>,
    connection_semaphore: Arc<Semaphore>,
    active_connections: Arc<AtomicUsize>,
    next_connection: AtomicU64,
}

impl Server {
    /// Bind to `config.bind_address:config.port`. Port 0 picks a free port.
    pub async fn bind(
        config: ServerConfig,
        engine: Arc<KnowledgeEngine>,
    ) -> Result<Self, ProtocolError> {
        let addr = config.socket_addr();
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            error!("FATAL: Failed to bind TCP listener to {}: {}", addr, e);
            e
        })?;

        info!(
            "Concept graph server listening on {} (max_connections={}, max_frame_bytes={})",
            listener.local_addr()?,
            config.max_connections,
            config.max_frame_bytes
        );

        Ok(Self {
            listener,
            connection_semaphore: Arc::new(Semaphore::new(config.max_connections)),
            config,
            handlers: Arc::new(Handlers::new(engine)),
            active_connections: Arc::new(AtomicUsize::new(0)),
            next_connection: AtomicU64::new(1),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ProtocolError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn handlers(&self) -> &Arc<Handlers> {
        &self.handlers
    }

    /// Accept connections forever.
    pub async fn run(self) -> Result<(), ProtocolError> {
        self.run_until(std::future::pending()).await
    }

    /// Accept connections until `shutdown` completes. Connections already
    /// being served finish on their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ProtocolError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            let (stream, peer_addr) = tokio::select! {
                _ = &mut shutdown => {
                    info!("Server shutting down, no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        // Most accept errors are transient.
                        error!("Failed to accept TCP connection: {}", e);
                        continue;
                    }
                },
            };

            let tag = format!(
                "C{:03}",
                self.next_connection.fetch_add(1, Ordering::Relaxed)
            );
            let handlers = Arc::clone(&self.handlers);
            let semaphore = Arc::clone(&self.connection_semaphore);
            let active_connections = Arc::clone(&self.active_connections);
            let max_frame_bytes = self.config.max_frame_bytes;

            tokio::spawn(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(p) => p,
                    Err(_) => {
                        error!("[{}] Semaphore closed unexpectedly for {}", tag, peer_addr);
                        return;
                    }
                };

                let active = active_connections.fetch_add(1, Ordering::SeqCst) + 1;
                info!("[{}] Client connected: {} (active_connections={})", tag, peer_addr, active);

                if let Err(e) = handle_connection(stream, &tag, handlers, max_frame_bytes).await {
                    warn!("[{}] Connection error: {}", tag, e);
                }

                let active = active_connections.fetch_sub(1, Ordering::SeqCst) - 1;
                info!("[{}] Client disconnected: {} (active_connections={})", tag, peer_addr, active);
            });
        }
    }
}

/// Serve one connection until EOF or an I/O failure.
///
/// Oversized frames and undecodable payloads get a protocol error response
/// and the loop continues with the next frame.
async fn handle_connection(
    stream: TcpStream,
    tag: &str,
    handlers: Arc<Handlers>,
    max_frame_bytes: usize,
) -> Result<(), ProtocolError> {
    let (reader, writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut writer = BufWriter::new(writer);

    loop {
        let response = match read_frame(&mut reader, max_frame_bytes).await {
            Ok(None) => {
                debug!("[{}] Peer closed connection (EOF)", tag);
                return Ok(());
            }
            Ok(Some(payload)) => match decode_request(&payload) {
                Ok(request) => {
                    debug!("[{}] {} ({} bytes)", tag, request.name(), payload.len());
                    Arc::clone(&handlers).handle(request).await
                }
                Err(e) => {
                    warn!("[{}] Undecodable request: {}", tag, e);
                    Response::error(ErrorKind::Protocol, e.to_string())
                }
            },
            Err(e) if e.is_recoverable() => {
                warn!("[{}] Protocol error: {}", tag, e);
                Response::error(ErrorKind::Protocol, e.to_string())
            }
            Err(e) => return Err(e),
        };

        let payload = encode_response(&response)?;
        write_frame(&mut writer, &payload).await?;
    }
}
