//! In-process consistent hashing ring.

use std::collections::{BTreeMap, HashMap};

use orbit_types::{HashFunc, Identifier, Node};
use tracing::debug;

/// Metadata about a host on the ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    /// Ring positions of this host's vnodes.
    pub positions: Vec<Identifier>,
}

impl HostInfo {
    /// Number of vnodes this host owns.
    pub fn weight(&self) -> usize {
        self.positions.len()
    }
}

/// Consistent hashing ring of virtual nodes.
///
/// Each host is mapped to multiple vnodes, positioned at
/// `hash(host ++ vnode_index)`. A successor query walks clockwise from an
/// identifier and returns vnodes in ring order, so consecutive successors
/// may belong to the same host.
#[derive(Debug, Clone)]
pub struct Ring {
    /// Vnode positions: ring identifier -> vnode.
    vnodes: BTreeMap<Identifier, Node>,
    /// Per-host metadata.
    hosts: HashMap<String, HostInfo>,
    /// Default vnode count for [`add_host`](Self::add_host).
    vnodes_per_host: u16,
    /// Digest used for vnode positions.
    hash: HashFunc,
}

impl Ring {
    /// Create a new empty ring.
    pub fn new(vnodes_per_host: u16, hash: HashFunc) -> Self {
        Self {
            vnodes: BTreeMap::new(),
            hosts: HashMap::new(),
            vnodes_per_host,
            hash,
        }
    }

    /// Digest function used for positions on this ring.
    pub fn hash_func(&self) -> HashFunc {
        self.hash
    }

    /// Add a host with the default number of vnodes.
    pub fn add_host(&mut self, host: &str) {
        self.add_host_with_weight(host, self.vnodes_per_host);
    }

    /// Add a host with an explicit vnode count.
    ///
    /// Re-adding a host replaces its previous vnodes.
    pub fn add_host_with_weight(&mut self, host: &str, weight: u16) {
        self.remove_host(host);

        let positions: Vec<Identifier> = (0..weight)
            .map(|i| vnode_position(self.hash, host, i))
            .collect();
        for pos in &positions {
            self.vnodes.insert(pos.clone(), Node::new(pos.clone(), host));
        }

        self.hosts.insert(host.to_string(), HostInfo { positions });
        debug!(%host, weight, "added host to ring");
    }

    /// Place a single vnode at an explicit position.
    ///
    /// Used to pin exact layouts; the vnode is attributed to `node.host`.
    pub fn add_node(&mut self, node: Node) {
        if let Some(previous) = self.vnodes.insert(node.id.clone(), node.clone())
            && let Some(info) = self.hosts.get_mut(&previous.host)
        {
            info.positions.retain(|p| p != &previous.id);
        }
        self.hosts
            .entry(node.host.clone())
            .or_insert_with(|| HostInfo {
                positions: Vec::new(),
            })
            .positions
            .push(node.id.clone());
        debug!(%node, "pinned vnode on ring");
    }

    /// Remove a host and all of its vnodes.
    pub fn remove_host(&mut self, host: &str) {
        if let Some(info) = self.hosts.remove(host) {
            for pos in &info.positions {
                self.vnodes.remove(pos);
            }
            debug!(%host, "removed host from ring");
        }
    }

    /// Return up to `n` vnodes clockwise from `id`.
    ///
    /// The first vnode is the one at or after `id`; the walk wraps past the
    /// top of the ring. Never returns more vnodes than the ring holds.
    pub fn successors(&self, id: &Identifier, n: usize) -> Vec<Node> {
        let after = self.vnodes.range(id.clone()..);
        let before = self.vnodes.range(..id.clone());

        after
            .chain(before)
            .take(n)
            .map(|(_, node)| node.clone())
            .collect()
    }

    /// Return the number of hosts on the ring.
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Return the total number of vnodes on the ring.
    pub fn vnode_count(&self) -> usize {
        self.vnodes.len()
    }

    /// Return info about a specific host, if present.
    pub fn host_info(&self, host: &str) -> Option<&HostInfo> {
        self.hosts.get(host)
    }

    /// Return all hosts on the ring.
    pub fn hosts(&self) -> Vec<String> {
        self.hosts.keys().cloned().collect()
    }

    /// Whether the ring holds no vnodes.
    pub fn is_empty(&self) -> bool {
        self.vnodes.is_empty()
    }
}

/// A vnode's position on the ring: `hash(host ++ vnode_index)`.
fn vnode_position(hash: HashFunc, host: &str, vnode_index: u16) -> Identifier {
    let mut input = Vec::with_capacity(host.len() + 2);
    input.extend_from_slice(host.as_bytes());
    input.extend_from_slice(&vnode_index.to_be_bytes());
    hash.digest(&input)
}
