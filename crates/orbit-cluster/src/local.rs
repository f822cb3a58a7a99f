//! In-process ring state.
//!
//! [`LocalRing`] is the shared, read-mostly ring that a node answers
//! successor lookups from. Membership changes take the write lock; lookups
//! only ever read.

use std::sync::Arc;

use orbit_placement::Ring;
use orbit_types::{HashFunc, Identifier, Node};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::RingConfig;
use crate::lookup::{RingError, RingLookup};

/// A ring held in local memory.
pub struct LocalRing {
    config: RingConfig,
    ring: RwLock<Ring>,
}

impl LocalRing {
    /// Create an empty ring.
    pub fn new(config: RingConfig) -> Arc<Self> {
        let ring = Ring::new(config.vnodes_per_host, config.hash_func);
        Self::from_ring(config, ring)
    }

    /// Wrap an already populated ring.
    ///
    /// The ring's digest function wins over the config's.
    pub fn from_ring(mut config: RingConfig, ring: Ring) -> Arc<Self> {
        config.hash_func = ring.hash_func();
        Arc::new(Self {
            config,
            ring: RwLock::new(ring),
        })
    }

    /// Create a ring populated with `hosts`, each at the configured weight.
    pub fn with_hosts<S: AsRef<str>>(config: RingConfig, hosts: &[S]) -> Arc<Self> {
        let mut ring = Ring::new(config.vnodes_per_host, config.hash_func);
        for host in hosts {
            ring.add_host(host.as_ref());
        }
        Self::from_ring(config, ring)
    }

    /// Return the ring configuration.
    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    /// Add a host (or re-place it at the default weight).
    pub async fn add_host(&self, host: &str) {
        self.ring.write().await.add_host(host);
        info!(%host, "host joined ring");
    }

    /// Pin a single vnode at an explicit position.
    pub async fn add_node(&self, node: Node) {
        self.ring.write().await.add_node(node);
    }

    /// Remove a host and all of its vnodes.
    pub async fn remove_host(&self, host: &str) {
        self.ring.write().await.remove_host(host);
        info!(%host, "host left ring");
    }

    /// Return all hosts on the ring.
    pub async fn hosts(&self) -> Vec<String> {
        let mut hosts = self.ring.read().await.hosts();
        hosts.sort();
        hosts
    }

    /// Return the number of hosts on the ring.
    pub async fn host_count(&self) -> usize {
        self.ring.read().await.host_count()
    }

    /// Return a snapshot of the current ring.
    pub async fn snapshot(&self) -> Ring {
        self.ring.read().await.clone()
    }
}

#[async_trait::async_trait]
impl RingLookup for LocalRing {
    async fn lookup_hash(&self, n: usize, id: &Identifier) -> Result<Vec<Node>, RingError> {
        let ring = self.ring.read().await;
        if ring.is_empty() {
            return Err(RingError::Empty);
        }
        let nodes = ring.successors(id, n);
        debug!(id = %id.short(), n, found = nodes.len(), "local successor lookup");
        Ok(nodes)
    }

    fn num_successors(&self) -> usize {
        self.config.num_successors
    }

    fn hash_func(&self) -> HashFunc {
        self.config.hash_func
    }

    fn hostname(&self) -> &str {
        &self.config.hostname
    }

    fn max_replicas(&self) -> usize {
        self.config.max_replicas
    }
}
