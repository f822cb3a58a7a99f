//! Ring configuration.

use orbit_types::HashFunc;

/// Largest replica count a ring serves unless configured otherwise.
pub const DEFAULT_MAX_REPLICAS: usize = 64;

/// Configuration for a [`LocalRing`](crate::LocalRing).
#[derive(Debug, Clone)]
pub struct RingConfig {
    /// Host address of the local node.
    pub hostname: String,
    /// Length of the successor list answered by lookups.
    pub num_successors: usize,
    /// Vnodes placed for each host added by name.
    pub vnodes_per_host: u16,
    /// Digest mapping keys and vnodes onto the ring.
    pub hash_func: HashFunc,
    /// Replicated lookups asking for more replicas are rejected up front.
    pub max_replicas: usize,
}

impl RingConfig {
    /// Create a default config for production use.
    pub fn default_config(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            num_successors: 8,
            vnodes_per_host: 5,
            hash_func: HashFunc::Sha256,
            max_replicas: DEFAULT_MAX_REPLICAS,
        }
    }

    /// Create a small config suitable for fast test execution.
    pub fn test_config(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            num_successors: 4,
            vnodes_per_host: 3,
            hash_func: HashFunc::Sha256,
            max_replicas: DEFAULT_MAX_REPLICAS,
        }
    }
}
