//! Ring traversals ("scours").
//!
//! A scour visits ring hosts and invokes a callback once per distinct host.
//! A callback error stops the traversal immediately and is handed back in
//! [`ScourError::Aborted`]. Callbacks are synchronous; anything they need to
//! do asynchronously should be queued by the caller.

use std::collections::HashSet;

use orbit_placement::LocationSet;
use orbit_types::{Identifier, Node};
use tracing::{debug, warn};

use crate::coordinator::Coordinator;
use crate::error::{ClusterError, ScourError};

/// Distinct hosts seen by a traversal.
#[derive(Default)]
struct Visited(HashSet<String>);

impl Visited {
    /// Run `cb` for `node` unless its host was already visited.
    fn visit<F, E>(&mut self, node: &Node, cb: &mut F) -> Result<(), ScourError<E>>
    where
        F: FnMut(&Node) -> Result<(), E>,
    {
        if !self.0.insert(node.host.clone()) {
            return Ok(());
        }
        cb(node).map_err(|error| ScourError::Aborted {
            visited: self.0.len(),
            error,
        })
    }

    fn count(&self) -> usize {
        self.0.len()
    }
}

impl Coordinator {
    /// Visit each distinct host in the successor list of `id`.
    ///
    /// Returns the number of hosts visited.
    pub async fn scour_replica<F, E>(&self, id: &Identifier, mut cb: F) -> Result<usize, ScourError<E>>
    where
        F: FnMut(&Node) -> Result<(), E>,
    {
        let nodes = self
            .ring()
            .lookup_hash(self.num_successors(), id)
            .await
            .map_err(|e| ScourError::Lookup {
                visited: 0,
                error: e.into(),
            })?;

        let mut visited = Visited::default();
        for node in &nodes {
            visited.visit(node, &mut cb)?;
        }
        Ok(visited.count())
    }

    /// Visit the primaries of `locs`, then the successors of each location.
    ///
    /// Every location's host is visited first, in rank order. The second
    /// pass looks up each location's successors and visits the hosts not
    /// seen yet, skipping the first successor. A failed lookup does not stop
    /// the traversal; once every location has been processed the last lookup
    /// error is returned in [`ScourError::Lookup`].
    pub async fn scour<F, E>(&self, locs: &LocationSet, mut cb: F) -> Result<usize, ScourError<E>>
    where
        F: FnMut(&Node) -> Result<(), E>,
    {
        let mut visited = Visited::default();
        for loc in locs {
            visited.visit(&loc.node, &mut cb)?;
        }

        let mut last_error: Option<ClusterError> = None;
        for loc in locs {
            let nodes = match self.ring().lookup_hash(self.num_successors(), &loc.id).await {
                Ok(nodes) => nodes,
                Err(e) => {
                    warn!(id = %loc.id.short(), error = %e, "scour successor lookup failed");
                    last_error = Some(e.into());
                    continue;
                }
            };
            for node in nodes.iter().skip(1) {
                visited.visit(node, &mut cb)?;
            }
        }

        match last_error {
            Some(error) => Err(ScourError::Lookup {
                visited: visited.count(),
                error,
            }),
            None => Ok(visited.count()),
        }
    }

    /// Visit every host whose node identifier lies in the sector from
    /// `start` (inclusive) clockwise to `end` (exclusive).
    ///
    /// When `start > end` the sector wraps past the top of the ring. The walk
    /// hops through successor lists and stops at the first node outside the
    /// sector, at a node it has already seen, or when the ring returns no
    /// nodes.
    pub async fn scour_sector<F, E>(
        &self,
        start: &Identifier,
        end: &Identifier,
        mut cb: F,
    ) -> Result<usize, ScourError<E>>
    where
        F: FnMut(&Node) -> Result<(), E>,
    {
        if start == end {
            return Err(ScourError::SectorDegenerate);
        }

        let wraps = start > end;
        let inside = |id: &Identifier| {
            if wraps {
                id >= start || id < end
            } else {
                id >= start && id < end
            }
        };

        let mut visited = Visited::default();
        let mut seen_ids = HashSet::new();
        let mut cursor = start.clone();

        loop {
            let nodes = self
                .ring()
                .lookup_hash(self.num_successors(), &cursor)
                .await
                .map_err(|e| ScourError::Lookup {
                    visited: visited.count(),
                    error: e.into(),
                })?;
            let Some(last) = nodes.last() else {
                return Ok(visited.count());
            };
            let next = last.id.wrapping_next();

            for node in &nodes {
                if !inside(&node.id) || !seen_ids.insert(node.id.clone()) {
                    debug!(
                        start = %start.short(),
                        end = %end.short(),
                        visited = visited.count(),
                        "sector scour complete"
                    );
                    return Ok(visited.count());
                }
                visited.visit(node, &mut cb)?;
            }
            cursor = next;
        }
    }

    /// Resolve `n` replicas of `key`, then [`scour`](Self::scour) them.
    pub async fn scour_replicated_key<F, E>(
        &self,
        key: &[u8],
        n: usize,
        cb: F,
    ) -> Result<usize, ScourError<E>>
    where
        F: FnMut(&Node) -> Result<(), E>,
    {
        let locs = self
            .lookup_replicated(key, n)
            .await
            .map_err(|error| ScourError::Lookup { visited: 0, error })?;
        self.scour(&locs, cb).await
    }
}
