//! Pooled lookup client.
//!
//! [`NetClient`] keeps at most one TCP connection per remote host and
//! provides:
//! - Read-locked fast path for cached connections, dial on miss.
//! - A background reaper that closes connections idle past `max_idle`.
//! - Eviction of connections that fail mid-call.
//! - Shutdown that drains the pool and rejects all later calls.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use orbit_placement::LocationSet;
use orbit_types::{Identifier, Node};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::LookupTransport;
use crate::codec::exchange;
use crate::error::NetError;
use crate::message::RingMessage;

/// Shortest reaper period; shorter configured intervals are raised to it.
pub const MIN_REAP_INTERVAL: Duration = Duration::from_millis(10);

/// Configuration for a [`NetClient`].
#[derive(Debug, Clone)]
pub struct NetClientConfig {
    /// Interval between reaper sweeps. Never shorter than [`MIN_REAP_INTERVAL`].
    pub reap_interval: Duration,
    /// Connections unused for longer than this are closed by the reaper.
    pub max_idle: Duration,
    /// Deadline for a single request/response exchange.
    pub rpc_timeout: Option<Duration>,
    /// Deadline for establishing a connection.
    pub connect_timeout: Duration,
}

impl Default for NetClientConfig {
    fn default() -> Self {
        Self {
            reap_interval: Duration::from_secs(30),
            max_idle: Duration::from_secs(300),
            rpc_timeout: Some(Duration::from_secs(10)),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl NetClientConfig {
    /// Create a config suitable for fast test execution.
    pub fn test_config() -> Self {
        Self {
            reap_interval: Duration::from_millis(50),
            max_idle: Duration::from_millis(100),
            rpc_timeout: Some(Duration::from_secs(2)),
            connect_timeout: Duration::from_secs(1),
        }
    }
}

/// Lifecycle of the connection pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolLifecycle {
    /// Accepting calls.
    Active,
    /// Shutting down: pooled connections are being closed.
    Draining,
    /// Shut down; every call fails with [`NetError::Shutdown`].
    Closed,
}

/// A pooled connection to one host.
struct PooledConn {
    /// Held for the whole request/response exchange.
    state: Mutex<ConnState>,
}

struct ConnState {
    stream: TcpStream,
    last_used: Instant,
}

struct PoolState {
    lifecycle: PoolLifecycle,
    conns: HashMap<String, Arc<PooledConn>>,
}

impl PoolState {
    fn ensure_active(&self) -> Result<(), NetError> {
        match self.lifecycle {
            PoolLifecycle::Active => Ok(()),
            PoolLifecycle::Draining | PoolLifecycle::Closed => Err(NetError::Shutdown),
        }
    }
}

/// State shared with the reaper task.
struct ClientInner {
    config: NetClientConfig,
    pool: RwLock<PoolState>,
}

impl ClientInner {
    /// Close connections idle longer than `max_idle`. Returns the count.
    async fn reap_once(&self) -> usize {
        let mut pool = self.pool.write().await;
        if pool.lifecycle != PoolLifecycle::Active {
            return 0;
        }

        let max_idle = self.config.max_idle;
        let before = pool.conns.len();
        pool.conns.retain(|host, conn| {
            // A locked connection is mid-call and therefore not idle.
            let Ok(state) = conn.state.try_lock() else {
                return true;
            };
            let idle = state.last_used.elapsed();
            if idle > max_idle {
                debug!(%host, ?idle, "reaping idle connection");
                return false;
            }
            true
        });
        before - pool.conns.len()
    }
}

/// Pooled client for remote lookup servers.
///
/// Must be created inside a tokio runtime: construction spawns the reaper.
pub struct NetClient {
    inner: Arc<ClientInner>,
    shutdown_tx: watch::Sender<bool>,
    reaper: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl NetClient {
    /// Create a client and start its reaper.
    pub fn new(mut config: NetClientConfig) -> Self {
        if config.reap_interval < MIN_REAP_INTERVAL {
            warn!(
                requested = ?config.reap_interval,
                min = ?MIN_REAP_INTERVAL,
                "reap interval too short, clamping"
            );
            config.reap_interval = MIN_REAP_INTERVAL;
        }
        let inner = Arc::new(ClientInner {
            config,
            pool: RwLock::new(PoolState {
                lifecycle: PoolLifecycle::Active,
                conns: HashMap::new(),
            }),
        });
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let reaper = tokio::spawn(run_reaper(Arc::clone(&inner), shutdown_rx));

        Self {
            inner,
            shutdown_tx,
            reaper: std::sync::Mutex::new(Some(reaper)),
        }
    }

    /// Return the client configuration.
    pub fn config(&self) -> &NetClientConfig {
        &self.inner.config
    }

    /// Current pool lifecycle.
    pub async fn lifecycle(&self) -> PoolLifecycle {
        self.inner.pool.read().await.lifecycle
    }

    /// Hosts with a pooled connection, sorted.
    pub async fn pooled_hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self.inner.pool.read().await.conns.keys().cloned().collect();
        hosts.sort();
        hosts
    }

    /// Number of pooled connections.
    pub async fn pool_len(&self) -> usize {
        self.inner.pool.read().await.conns.len()
    }

    /// Run one reaper sweep now. Returns the number of connections closed.
    pub async fn reap_idle(&self) -> usize {
        self.inner.reap_once().await
    }

    /// Up to `n` successors of `key`'s digest, as seen by `host`.
    pub async fn lookup(&self, host: &str, n: usize, key: &[u8]) -> Result<Vec<Node>, NetError> {
        let request = RingMessage::Lookup {
            n: wire_count(n)?,
            key: key.to_vec(),
        };
        expect_nodes(self.call(host, &request).await?)
    }

    /// Up to `n` successors of `hash`, as seen by `host`.
    pub async fn lookup_hash(
        &self,
        host: &str,
        n: usize,
        hash: &Identifier,
    ) -> Result<Vec<Node>, NetError> {
        let request = RingMessage::LookupHash {
            n: wire_count(n)?,
            hash: hash.clone(),
        };
        expect_nodes(self.call(host, &request).await?)
    }

    /// `n` replica locations of `key`, resolved by `host`.
    pub async fn lookup_replicated(
        &self,
        host: &str,
        key: &[u8],
        n: usize,
    ) -> Result<LocationSet, NetError> {
        let request = RingMessage::LookupReplicated {
            n: wire_count(n)?,
            key: key.to_vec(),
        };
        expect_locations(self.call(host, &request).await?)
    }

    /// `n` replica locations of `hash`, resolved by `host`.
    pub async fn lookup_replicated_hash(
        &self,
        host: &str,
        hash: &Identifier,
        n: usize,
    ) -> Result<LocationSet, NetError> {
        let request = RingMessage::LookupReplicatedHash {
            n: wire_count(n)?,
            hash: hash.clone(),
        };
        expect_locations(self.call(host, &request).await?)
    }

    /// Close every pooled connection and reject all later calls.
    ///
    /// Waits for in-flight calls on pooled connections to finish. Calling
    /// this more than once is a no-op.
    pub async fn shutdown(&self) {
        let drained = {
            let mut pool = self.inner.pool.write().await;
            if pool.lifecycle != PoolLifecycle::Active {
                return;
            }
            pool.lifecycle = PoolLifecycle::Draining;
            std::mem::take(&mut pool.conns)
        };

        let _ = self.shutdown_tx.send(true);
        let reaper = self.reaper.lock().expect("lock poisoned").take();
        if let Some(handle) = reaper {
            let _ = handle.await;
        }

        let closed = drained.len();
        for (host, conn) in drained {
            let mut state = conn.state.lock().await;
            if let Err(e) = state.stream.shutdown().await {
                debug!(%host, error = %e, "error closing pooled connection");
            }
        }

        self.inner.pool.write().await.lifecycle = PoolLifecycle::Closed;
        info!(closed, "net client shut down");
    }

    /// Send one request to `host` over its pooled connection.
    async fn call(&self, host: &str, request: &RingMessage) -> Result<RingMessage, NetError> {
        let conn = self.get_conn(host).await?;

        let result = {
            let mut state = conn.state.lock().await;
            let result = match self.inner.config.rpc_timeout {
                Some(deadline) => tokio::time::timeout(deadline, exchange(&mut state.stream, request))
                    .await
                    .unwrap_or_else(|_| {
                        Err(NetError::Timeout(format!(
                            "{} to {host} after {deadline:?}",
                            request.kind()
                        )))
                    }),
                None => exchange(&mut state.stream, request).await,
            };
            state.last_used = Instant::now();
            result
        };

        match result {
            Ok(RingMessage::Failure { message }) => Err(NetError::Remote(message)),
            Ok(response) => Ok(response),
            Err(e) => {
                // The stream may be mid-frame; never reuse it.
                warn!(%host, error = %e, "evicting failed connection");
                self.evict(host, &conn).await;
                Err(e)
            }
        }
    }

    /// Return the pooled connection to `host`, dialing if there is none.
    async fn get_conn(&self, host: &str) -> Result<Arc<PooledConn>, NetError> {
        {
            let pool = self.inner.pool.read().await;
            pool.ensure_active()?;
            if let Some(conn) = pool.conns.get(host) {
                return Ok(Arc::clone(conn));
            }
        }

        // Hold the write lock across the dial so concurrent callers for the
        // same host share one connection.
        let mut pool = self.inner.pool.write().await;
        pool.ensure_active()?;
        if let Some(conn) = pool.conns.get(host) {
            return Ok(Arc::clone(conn));
        }

        let stream = dial(host, self.inner.config.connect_timeout).await?;
        let conn = Arc::new(PooledConn {
            state: Mutex::new(ConnState {
                stream,
                last_used: Instant::now(),
            }),
        });
        pool.conns.insert(host.to_string(), Arc::clone(&conn));
        debug!(%host, pooled = pool.conns.len(), "pooled new connection");
        Ok(conn)
    }

    /// Drop `conn` from the pool if it is still the entry for `host`.
    async fn evict(&self, host: &str, conn: &Arc<PooledConn>) {
        let mut pool = self.inner.pool.write().await;
        if let Some(current) = pool.conns.get(host)
            && Arc::ptr_eq(current, conn)
        {
            pool.conns.remove(host);
            debug!(%host, "evicted connection");
        }
    }
}

impl Drop for NetClient {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

#[async_trait::async_trait]
impl LookupTransport for NetClient {
    async fn lookup(&self, host: &str, n: usize, key: &[u8]) -> Result<Vec<Node>, NetError> {
        NetClient::lookup(self, host, n, key).await
    }

    async fn lookup_hash(
        &self,
        host: &str,
        n: usize,
        hash: &Identifier,
    ) -> Result<Vec<Node>, NetError> {
        NetClient::lookup_hash(self, host, n, hash).await
    }

    async fn lookup_replicated(
        &self,
        host: &str,
        key: &[u8],
        n: usize,
    ) -> Result<LocationSet, NetError> {
        NetClient::lookup_replicated(self, host, key, n).await
    }

    async fn lookup_replicated_hash(
        &self,
        host: &str,
        hash: &Identifier,
        n: usize,
    ) -> Result<LocationSet, NetError> {
        NetClient::lookup_replicated_hash(self, host, hash, n).await
    }
}

/// Reap idle connections every `reap_interval` until shutdown.
async fn run_reaper(inner: Arc<ClientInner>, mut shutdown_rx: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(inner.config.reap_interval);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let reaped = inner.reap_once().await;
                if reaped > 0 {
                    debug!(reaped, "reaper closed idle connections");
                }
            }
            _ = shutdown_rx.changed() => {
                debug!("reaper stopping");
                return;
            }
        }
    }
}

async fn dial(host: &str, connect_timeout: Duration) -> Result<TcpStream, NetError> {
    debug!(%host, "dialing");
    let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(host))
        .await
        .map_err(|_| NetError::Timeout(format!("connect to {host} after {connect_timeout:?}")))?
        .map_err(|e| NetError::Connect(format!("{host}: {e}")))?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Counts travel as `u32`; larger ones are refused rather than truncated.
fn wire_count(n: usize) -> Result<u32, NetError> {
    u32::try_from(n)
        .map_err(|_| NetError::InvalidRequest(format!("count {n} does not fit in u32")))
}

fn expect_nodes(response: RingMessage) -> Result<Vec<Node>, NetError> {
    match response {
        RingMessage::Nodes(nodes) => Ok(nodes),
        other => Err(NetError::UnexpectedResponse(format!(
            "expected Nodes, got {}",
            other.kind()
        ))),
    }
}

fn expect_locations(response: RingMessage) -> Result<LocationSet, NetError> {
    match response {
        RingMessage::Locations(locations) => Ok(LocationSet::new(locations)),
        other => Err(NetError::UnexpectedResponse(format!(
            "expected Locations, got {}",
            other.kind()
        ))),
    }
}
