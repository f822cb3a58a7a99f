//! Error types for placement queries.

use orbit_types::Identifier;

/// Errors produced by queries against a [`LocationSet`](crate::LocationSet).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    /// No location in the set has the given ring identifier.
    #[error("location not in set: {0}")]
    IdNotFound(Identifier),

    /// No location in the set is served by the given host.
    #[error("host not in set: {0}")]
    HostNotFound(String),
}
