//! Lookup server.
//!
//! [`LookupServer`] exposes a [`Coordinator`]'s lookups over TCP. One task
//! accepts connections; each connection gets its own task that answers
//! requests in order until the peer hangs up or the server shuts down.

use std::net::SocketAddr;

use orbit_cluster::{ClusterError, Coordinator};
use orbit_placement::LocationSet;
use orbit_types::Node;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::codec::{read_message, write_message};
use crate::error::NetError;
use crate::message::RingMessage;

/// Handle to a running lookup server.
///
/// Dropping the handle stops the server as well.
pub struct LookupServer {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
}

impl LookupServer {
    /// Bind `addr` and start serving `coordinator`.
    pub async fn bind(
        addr: impl ToSocketAddrs,
        coordinator: Coordinator,
    ) -> Result<Self, NetError> {
        let listener = TcpListener::bind(addr).await?;
        Self::serve(listener, coordinator)
    }

    /// Start serving `coordinator` on an already bound listener.
    pub fn serve(listener: TcpListener, coordinator: Coordinator) -> Result<Self, NetError> {
        let local_addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let accept_task = tokio::spawn(accept_loop(listener, coordinator, shutdown_rx));
        info!(%local_addr, "lookup server listening");

        Ok(Self {
            local_addr,
            shutdown_tx,
            accept_task,
        })
    }

    /// The bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether the accept loop is still running.
    pub fn is_running(&self) -> bool {
        !self.accept_task.is_finished()
    }

    /// Stop accepting, close open connections and wait for the accept loop.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.accept_task.await {
            warn!(error = %e, "accept task failed");
        }
        info!(local_addr = %self.local_addr, "lookup server stopped");
    }
}

async fn accept_loop(
    listener: TcpListener,
    coordinator: Coordinator,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "accepted connection");
                    tokio::spawn(serve_connection(
                        stream,
                        peer,
                        coordinator.clone(),
                        shutdown_rx.clone(),
                    ));
                }
                Err(e) => warn!(error = %e, "accept failed"),
            },
            _ = shutdown_rx.changed() => return,
        }
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    coordinator: Coordinator,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(%peer, error = %e, "failed to set nodelay");
    }

    loop {
        if *shutdown_rx.borrow() {
            break;
        }
        let request = tokio::select! {
            biased;
            _ = shutdown_rx.changed() => break,
            request = read_message(&mut stream) => request,
        };
        let request = match request {
            Ok(request) => request,
            Err(NetError::ConnectionClosed) => break,
            Err(e) => {
                warn!(%peer, error = %e, "failed to read request");
                break;
            }
        };

        let response = handle_request(&coordinator, request).await;
        if let Err(e) = write_message(&mut stream, &response).await {
            debug!(%peer, error = %e, "failed to write response");
            break;
        }
    }
    debug!(%peer, "connection closed");
}

/// Answer one request with `coordinator`.
///
/// Lookup errors are returned to the caller as [`RingMessage::Failure`].
pub async fn handle_request(coordinator: &Coordinator, request: RingMessage) -> RingMessage {
    match request {
        RingMessage::Lookup { n, key } => nodes(coordinator.lookup(n as usize, &key).await),
        RingMessage::LookupHash { n, hash } => {
            nodes(coordinator.lookup_hash(n as usize, &hash).await)
        }
        RingMessage::LookupReplicated { n, key } => {
            locations(coordinator.lookup_replicated(&key, n as usize).await)
        }
        RingMessage::LookupReplicatedHash { n, hash } => {
            locations(coordinator.lookup_replicated_hash(&hash, n as usize).await)
        }
        other => RingMessage::Failure {
            message: format!("unexpected request: {}", other.kind()),
        },
    }
}

fn nodes(result: Result<Vec<Node>, ClusterError>) -> RingMessage {
    match result {
        Ok(nodes) => RingMessage::Nodes(nodes),
        Err(e) => failure(e),
    }
}

fn locations(result: Result<LocationSet, ClusterError>) -> RingMessage {
    match result {
        Ok(set) => RingMessage::Locations(set.into_inner()),
        Err(e) => failure(e),
    }
}

fn failure(e: ClusterError) -> RingMessage {
    debug!(error = %e, "lookup failed");
    RingMessage::Failure {
        message: e.to_string(),
    }
}
