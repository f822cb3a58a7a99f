//! Replicated lookups.
//!
//! A key's `n` replicas live at the successors of `n` evenly spaced ring
//! vertexes. The coordinator resolves every vertex, then assembles the
//! results in rank order, letting a rank fall through to a later successor
//! when its first choice is a host an earlier rank already took.

use std::collections::BTreeMap;
use std::sync::Arc;

use orbit_placement::{Location, LocationSet, compute_vertexes};
use orbit_types::{HashFunc, Identifier, Node};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::ClusterError;
use crate::lookup::RingLookup;

/// Candidate locations for one vertex, in successor order.
type VertexCandidates = (u32, Vec<Location>);

/// Replicated-lookup coordinator bound to one ring.
#[derive(Clone)]
pub struct Coordinator {
    ring: Arc<dyn RingLookup>,
}

impl Coordinator {
    /// Create a coordinator over `ring`.
    pub fn new(ring: Arc<dyn RingLookup>) -> Self {
        Self { ring }
    }

    /// Return the underlying ring.
    pub fn ring(&self) -> &Arc<dyn RingLookup> {
        &self.ring
    }

    /// Host address of the node whose ring answers lookups.
    pub fn hostname(&self) -> &str {
        self.ring.hostname()
    }

    /// Successor-list length of the ring.
    pub fn num_successors(&self) -> usize {
        self.ring.num_successors()
    }

    /// Digest function of the ring.
    pub fn hash_func(&self) -> HashFunc {
        self.ring.hash_func()
    }

    /// Largest replica count accepted by replicated lookups.
    pub fn max_replicas(&self) -> usize {
        self.ring.max_replicas()
    }

    /// Reject replica counts before any vertex is computed.
    fn check_replica_count(&self, n: usize) -> Result<(), ClusterError> {
        if n == 0 {
            return Err(ClusterError::InvalidReplicaCount);
        }
        let max = self.max_replicas();
        if n > max {
            return Err(ClusterError::TooManyReplicas { requested: n, max });
        }
        Ok(())
    }

    /// Up to `n` successors of `key`'s digest.
    pub async fn lookup(&self, n: usize, key: &[u8]) -> Result<Vec<Node>, ClusterError> {
        let hash = self.hash_func().digest(key);
        self.lookup_hash(n, &hash).await
    }

    /// Up to `n` successors of `hash`.
    pub async fn lookup_hash(&self, n: usize, hash: &Identifier) -> Result<Vec<Node>, ClusterError> {
        Ok(self.ring.lookup_hash(n, hash).await?)
    }

    /// Replica locations for `key`, digested with the ring's hash function.
    pub async fn lookup_replicated(
        &self,
        key: &[u8],
        n: usize,
    ) -> Result<LocationSet, ClusterError> {
        let hash = self.hash_func().digest(key);
        self.lookup_replicated_hash(&hash, n).await
    }

    /// Replica locations for `hash`, resolving all vertexes concurrently.
    ///
    /// Returns exactly `n` locations in rank order, each on a distinct host.
    /// If any vertex lookup fails the whole call fails and nothing partial
    /// is returned. If hosts run out the error carries the placed prefix.
    pub async fn lookup_replicated_hash(
        &self,
        hash: &Identifier,
        n: usize,
    ) -> Result<LocationSet, ClusterError> {
        self.check_replica_count(n)?;

        let num_successors = self.num_successors();
        let (tx, mut rx) = mpsc::channel(n);

        for (rank, vertex) in compute_vertexes(hash, n).into_iter().enumerate() {
            let ring = Arc::clone(&self.ring);
            let tx = tx.clone();
            tokio::spawn(async move {
                let result = resolve_vertex(ring.as_ref(), rank as u32, vertex, num_successors).await;
                // The receiver outlives every sender.
                let _ = tx.send(result).await;
            });
        }
        drop(tx);

        // Single consumer: the table is never shared between tasks.
        let mut table = BTreeMap::new();
        let mut failure = None;
        while let Some(result) = rx.recv().await {
            match result {
                Ok((rank, candidates)) => {
                    table.insert(rank, candidates);
                }
                Err(e) => {
                    warn!(hash = %hash.short(), error = %e, "replica vertex lookup failed");
                    if failure.is_none() {
                        failure = Some(e);
                    }
                }
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }
        assemble(hash, table, n)
    }

    /// Replica locations for `hash`, resolving one vertex at a time.
    ///
    /// Same result as [`lookup_replicated_hash`](Self::lookup_replicated_hash)
    /// for a stable ring; stops at the first failing vertex.
    pub async fn lookup_replicated_hash_serial(
        &self,
        hash: &Identifier,
        n: usize,
    ) -> Result<LocationSet, ClusterError> {
        self.check_replica_count(n)?;

        let num_successors = self.num_successors();
        let mut table = BTreeMap::new();
        for (rank, vertex) in compute_vertexes(hash, n).into_iter().enumerate() {
            let (rank, candidates) =
                resolve_vertex(self.ring.as_ref(), rank as u32, vertex, num_successors).await?;
            table.insert(rank, candidates);
        }
        assemble(hash, table, n)
    }
}

/// Look up the successors of one vertex and tag them with `rank`.
async fn resolve_vertex(
    ring: &dyn RingLookup,
    rank: u32,
    vertex: Identifier,
    num_successors: usize,
) -> Result<VertexCandidates, ClusterError> {
    let result = ring.lookup_hash(num_successors, &vertex).await;
    let nodes = match result {
        Ok(nodes) => nodes,
        Err(source) => return Err(ClusterError::VertexLookup { vertex, source }),
    };

    let candidates = nodes
        .into_iter()
        .enumerate()
        .map(|(index, node)| Location::new(vertex.clone(), rank, index as u32, node))
        .collect();
    Ok((rank, candidates))
}

/// Walk ranks in order, taking each rank's first candidate whose host is
/// not yet placed.
fn assemble(
    hash: &Identifier,
    mut table: BTreeMap<u32, Vec<Location>>,
    n: usize,
) -> Result<LocationSet, ClusterError> {
    let mut set = LocationSet::default();

    for rank in 0..n as u32 {
        let Some(candidates) = table.remove(&rank) else {
            continue;
        };
        match candidates
            .into_iter()
            .find(|loc| !set.contains_host(loc.host()))
        {
            Some(loc) => set.push(loc),
            None => debug!(rank, "no unplaced host among vertex successors"),
        }
    }

    if set.len() < n {
        debug!(hash = %hash.short(), requested = n, found = set.len(), "not enough hosts");
        return Err(ClusterError::NotEnoughHosts {
            requested: n,
            found: set.len(),
            partial: set,
        });
    }
    Ok(set)
}
