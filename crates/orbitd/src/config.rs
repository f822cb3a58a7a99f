//! TOML configuration for the Orbit daemon.

use std::path::{Path, PathBuf};
use std::time::Duration;

use orbit_cluster::RingConfig;
use orbit_net::NetClientConfig;
use orbit_types::HashFunc;
use serde::Deserialize;

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Node addresses.
    pub node: NodeSection,
    /// Ring tuning and static membership.
    pub ring: RingSection,
    /// Outbound lookup client tuning.
    pub client: ClientSection,
    /// Peer store.
    pub peers: PeersSection,
    /// Logging configuration.
    pub log: LogSection,
}

/// `[node]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    /// Address the lookup server binds.
    pub listen_addr: String,
    /// Address other nodes use to reach this one. Defaults to `listen_addr`.
    pub hostname: Option<String>,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:4900".to_string(),
            hostname: None,
        }
    }
}

/// `[ring]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RingSection {
    /// Digest function: `"sha256"` or `"blake3"`.
    pub hash: HashFunc,
    /// Successor-list length.
    pub num_successors: usize,
    /// Vnodes per member host.
    pub vnodes_per_host: u16,
    /// Largest replica count served.
    pub max_replicas: usize,
    /// Other ring members (`host:port`).
    pub members: Vec<String>,
}

impl Default for RingSection {
    fn default() -> Self {
        let defaults = RingConfig::default_config("");
        Self {
            hash: defaults.hash_func,
            num_successors: defaults.num_successors,
            vnodes_per_host: defaults.vnodes_per_host,
            max_replicas: defaults.max_replicas,
            members: Vec::new(),
        }
    }
}

/// `[client]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    /// Seconds between idle-connection sweeps.
    pub reap_interval_secs: u64,
    /// Seconds a pooled connection may stay unused.
    pub max_idle_secs: u64,
    /// Per-call deadline in milliseconds. `0` disables the deadline.
    pub rpc_timeout_ms: u64,
}

impl Default for ClientSection {
    fn default() -> Self {
        let defaults = NetClientConfig::default();
        Self {
            reap_interval_secs: defaults.reap_interval.as_secs(),
            max_idle_secs: defaults.max_idle.as_secs(),
            rpc_timeout_ms: defaults
                .rpc_timeout
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
        }
    }
}

/// `[peers]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PeersSection {
    /// JSON file remembering known peers. In-memory only when unset.
    pub file: Option<PathBuf>,
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level filter (e.g. `"info"`, `"debug"`, `"warn"`).
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CliConfig {
    /// Load config from a TOML file, or use defaults if no path given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)?;
                let config: CliConfig = toml::from_str(&content)?;
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a TOML string (used in tests).
    #[cfg(test)]
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Address other nodes reach this one at.
    pub fn hostname(&self) -> &str {
        self.node
            .hostname
            .as_deref()
            .unwrap_or(&self.node.listen_addr)
    }

    /// Ring configuration for the local node.
    pub fn ring_config(&self) -> RingConfig {
        RingConfig {
            hostname: self.hostname().to_string(),
            num_successors: self.ring.num_successors,
            vnodes_per_host: self.ring.vnodes_per_host,
            hash_func: self.ring.hash,
            max_replicas: self.ring.max_replicas,
        }
    }

    /// Outbound client configuration.
    ///
    /// Fails when the reap interval is zero.
    pub fn client_config(&self) -> anyhow::Result<NetClientConfig> {
        if self.client.reap_interval_secs == 0 {
            anyhow::bail!("[client] reap_interval_secs must be at least 1");
        }
        Ok(NetClientConfig {
            reap_interval: Duration::from_secs(self.client.reap_interval_secs),
            max_idle: Duration::from_secs(self.client.max_idle_secs),
            rpc_timeout: (self.client.rpc_timeout_ms > 0)
                .then(|| Duration::from_millis(self.client.rpc_timeout_ms)),
            ..NetClientConfig::default()
        })
    }
}
