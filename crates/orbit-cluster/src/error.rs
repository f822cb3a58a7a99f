//! Error types for the cluster crate.

use orbit_placement::{LocationSet, PlacementError};
use orbit_types::Identifier;

use crate::lookup::RingError;

/// Errors produced by replicated lookups.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// A replicated lookup was asked for zero replicas.
    #[error("replica count must be at least 1")]
    InvalidReplicaCount,

    /// A replicated lookup asked for more replicas than the ring serves.
    #[error("replica count {requested} exceeds the maximum of {max}")]
    TooManyReplicas {
        /// Requested replica count.
        requested: usize,
        /// The ring's limit.
        max: usize,
    },

    /// The successor lookup for one replica vertex failed.
    ///
    /// Replicated lookups are all-or-nothing: results for the other
    /// vertexes are discarded.
    #[error("lookup failed for vertex {vertex}: {source}")]
    VertexLookup {
        /// The vertex whose lookup failed.
        vertex: Identifier,
        /// The ring's error.
        source: RingError,
    },

    /// Fewer distinct hosts than requested replicas were found.
    #[error("not enough hosts found: {found} of {requested}")]
    NotEnoughHosts {
        /// Requested replica count.
        requested: usize,
        /// Distinct hosts placed before running out of candidates.
        found: usize,
        /// The rank-ordered prefix that could be placed.
        partial: LocationSet,
    },

    /// A plain (non-replicated) ring lookup failed.
    #[error("ring lookup failed: {0}")]
    Ring(#[from] RingError),

    /// A location query failed.
    #[error("placement error: {0}")]
    Placement(#[from] PlacementError),
}

impl ClusterError {
    /// Whether this error means a replicated lookup could not place every
    /// replica (a vertex lookup failed or hosts ran out).
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            ClusterError::VertexLookup { .. } | ClusterError::NotEnoughHosts { .. }
        )
    }

    /// The partially placed locations of a [`ClusterError::NotEnoughHosts`].
    pub fn partial(&self) -> Option<&LocationSet> {
        match self {
            ClusterError::NotEnoughHosts { partial, .. } => Some(partial),
            _ => None,
        }
    }
}

/// Errors produced by scour traversals.
///
/// Every failure after traversal started carries the number of distinct
/// hosts visited so far. A callback's error is returned as-is in
/// [`ScourError::Aborted`].
#[derive(Debug, thiserror::Error)]
pub enum ScourError<E> {
    /// The sector's start and end are the same identifier.
    #[error("nothing to scour: sector start equals end")]
    SectorDegenerate,

    /// The callback returned an error and the traversal stopped.
    #[error("scour aborted by callback after {visited} hosts: {error}")]
    Aborted {
        /// Hosts visited, including the one whose callback failed.
        visited: usize,
        /// The callback's error.
        error: E,
    },

    /// A successor lookup failed.
    #[error("scour lookup failed after {visited} hosts: {error}")]
    Lookup {
        /// Hosts visited before the traversal returned.
        visited: usize,
        /// The last lookup error observed.
        #[source]
        error: ClusterError,
    },
}

impl<E> ScourError<E> {
    /// Distinct hosts visited before the traversal returned.
    pub fn visited(&self) -> usize {
        match self {
            ScourError::SectorDegenerate => 0,
            ScourError::Aborted { visited, .. } | ScourError::Lookup { visited, .. } => *visited,
        }
    }

    /// The callback's error, if the traversal was aborted by it.
    pub fn into_callback_error(self) -> Option<E> {
        match self {
            ScourError::Aborted { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Errors produced by peer stores.
#[derive(Debug, thiserror::Error)]
pub enum PeerStoreError {
    /// Reading or writing the backing file failed.
    #[error("peer store io error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file holds invalid JSON.
    #[error("peer store serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
