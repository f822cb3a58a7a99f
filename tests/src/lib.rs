//! Shared test harness for Orbit integration tests.
//!
//! Provides [`TestCluster`]: N lookup servers on loopback, each answering
//! from its own [`LocalRing`] over the same static membership.

use std::sync::Arc;

use orbit_cluster::{Coordinator, LocalRing, RingConfig};
use orbit_net::{LookupServer, NetClient, NetClientConfig, RemoteRing};
use tokio::net::TcpListener;
use tracing::info;

/// Vnodes placed per host in test clusters.
pub const VNODES_PER_HOST: u16 = 3;

// =========================================================================
// TestCluster
// =========================================================================

/// A running N-node cluster on loopback.
///
/// Every ring's successor list covers all vnodes, so any replica count up
/// to the number of hosts always places.
pub struct TestCluster {
    addrs: Vec<String>,
    rings: Vec<Arc<LocalRing>>,
    servers: Vec<Option<LookupServer>>,
}

impl TestCluster {
    /// Start an `n`-node cluster.
    pub async fn new(n: usize) -> Self {
        assert!(n > 0, "cluster needs at least one node");

        // Bind first so every ring can name every address.
        let mut listeners = Vec::with_capacity(n);
        for _ in 0..n {
            listeners.push(TcpListener::bind("127.0.0.1:0").await.unwrap());
        }
        let addrs: Vec<String> = listeners
            .iter()
            .map(|l| l.local_addr().unwrap().to_string())
            .collect();

        let mut rings = Vec::with_capacity(n);
        let mut servers = Vec::with_capacity(n);
        for (listener, addr) in listeners.into_iter().zip(&addrs) {
            let config = RingConfig {
                num_successors: n * VNODES_PER_HOST as usize,
                vnodes_per_host: VNODES_PER_HOST,
                ..RingConfig::test_config(addr.as_str())
            };
            let ring = LocalRing::with_hosts(config, &addrs[..]);
            let server = LookupServer::serve(listener, Coordinator::new(ring.clone())).unwrap();
            rings.push(ring);
            servers.push(Some(server));
        }

        info!(nodes = n, "test cluster started");
        Self {
            addrs,
            rings,
            servers,
        }
    }

    /// Number of nodes, live or not.
    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    /// Whether the cluster has no nodes.
    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    /// Address of node `i`.
    pub fn addr(&self, i: usize) -> &str {
        &self.addrs[i]
    }

    /// Addresses of all nodes.
    pub fn addrs(&self) -> &[String] {
        &self.addrs
    }

    /// Node `i`'s ring.
    pub fn ring(&self, i: usize) -> &Arc<LocalRing> {
        &self.rings[i]
    }

    /// A coordinator answering from node `i`'s ring in-process.
    pub fn local_coordinator(&self, i: usize) -> Coordinator {
        Coordinator::new(self.rings[i].clone())
    }

    /// A coordinator whose successor lookups go to node `i` over `client`.
    pub fn remote_coordinator(&self, client: &Arc<NetClient>, i: usize) -> Coordinator {
        let config = self.rings[i].config();
        let ring = RemoteRing::new(
            client.clone(),
            self.addrs[i].as_str(),
            config.num_successors,
            config.hash_func,
        );
        Coordinator::new(Arc::new(ring))
    }

    /// Whether node `i`'s server is still running.
    pub fn is_live(&self, i: usize) -> bool {
        self.servers[i].as_ref().is_some_and(LookupServer::is_running)
    }

    /// Stop node `i`'s server. Its address stays on every ring.
    pub async fn kill_node(&mut self, i: usize) {
        if let Some(server) = self.servers[i].take() {
            server.shutdown().await;
            info!(addr = %self.addrs[i], "killed node");
        }
    }

    /// Remove node `i`'s address from every ring.
    pub async fn forget_node(&self, i: usize) {
        for ring in &self.rings {
            ring.remove_host(&self.addrs[i]).await;
        }
    }

    /// Stop every server.
    pub async fn shutdown(mut self) {
        for i in 0..self.servers.len() {
            self.kill_node(i).await;
        }
    }
}

/// A pooled client with short test timeouts.
pub fn test_client() -> Arc<NetClient> {
    Arc::new(NetClient::new(NetClientConfig::test_config()))
}

/// Deterministic test key number `i`.
pub fn test_key(i: usize) -> Vec<u8> {
    format!("key-{i:04}").into_bytes()
}
