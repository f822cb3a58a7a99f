//! A ring served by a remote node.

use std::sync::Arc;

use orbit_cluster::{RingError, RingLookup};
use orbit_types::{HashFunc, Identifier, Node};

use crate::LookupTransport;

/// [`RingLookup`] backed by another node's lookup server.
///
/// Lets a process that is not a ring member run a
/// [`Coordinator`](orbit_cluster::Coordinator) against the ring: every
/// successor lookup becomes a `LookupHash` call to `host`.
pub struct RemoteRing {
    transport: Arc<dyn LookupTransport>,
    host: String,
    num_successors: usize,
    hash_func: HashFunc,
}

impl RemoteRing {
    /// Use the ring of the node at `host`.
    ///
    /// `num_successors` and `hash_func` must match the remote ring's settings.
    pub fn new(
        transport: Arc<dyn LookupTransport>,
        host: impl Into<String>,
        num_successors: usize,
        hash_func: HashFunc,
    ) -> Self {
        Self {
            transport,
            host: host.into(),
            num_successors,
            hash_func,
        }
    }
}

#[async_trait::async_trait]
impl RingLookup for RemoteRing {
    async fn lookup_hash(&self, n: usize, id: &Identifier) -> Result<Vec<Node>, RingError> {
        Ok(self.transport.lookup_hash(&self.host, n, id).await?)
    }

    fn num_successors(&self) -> usize {
        self.num_successors
    }

    fn hash_func(&self) -> HashFunc {
        self.hash_func
    }

    /// The remote node's address.
    fn hostname(&self) -> &str {
        &self.host
    }
}
