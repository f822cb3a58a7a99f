//! The ring protocol boundary.

use orbit_types::{HashFunc, Identifier, Node};

use crate::config::DEFAULT_MAX_REPLICAS;

/// Errors reported by a ring's successor lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RingError {
    /// The ring holds no nodes.
    #[error("ring has no nodes")]
    Empty,

    /// The ring could not answer (network failure, remote error, ...).
    #[error("ring lookup unavailable: {0}")]
    Unavailable(String),
}

/// Successor-lookup primitive exposed by a consistent hashing ring.
///
/// Orbit never manages membership itself; everything it does is built on
/// these operations.
#[async_trait::async_trait]
pub trait RingLookup: Send + Sync {
    /// Return up to `n` ring nodes in successor order starting at `id`.
    async fn lookup_hash(&self, n: usize, id: &Identifier) -> Result<Vec<Node>, RingError>;

    /// Length of the successor list maintained by the ring.
    fn num_successors(&self) -> usize;

    /// Digest function mapping keys onto the ring.
    fn hash_func(&self) -> HashFunc;

    /// Host address of the node whose ring answers the lookups.
    fn hostname(&self) -> &str;

    /// Largest replica count a replicated lookup may ask for.
    fn max_replicas(&self) -> usize {
        DEFAULT_MAX_REPLICAS
    }
}
