//! Peer address stores.
//!
//! A peer store remembers the addresses of ring members seen so far so a
//! restarting node has somewhere to rejoin from. [`InMemPeerStore`] keeps the
//! list in memory; [`JsonPeerStore`] wraps one and persists every change to a
//! JSON file.

use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::PeerStoreError;

/// A known peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Peer {
    /// Peer address (`host:port`).
    pub address: String,
    /// Last time the peer was added or refreshed, in unix nanoseconds.
    pub last_seen: u64,
}

impl Peer {
    fn seen_now(address: &str) -> Self {
        Self {
            address: address.to_string(),
            last_seen: now_nanos(),
        }
    }
}

/// Storage for known peer addresses.
pub trait PeerStore: Send + Sync {
    /// Addresses of all known peers, in insertion order.
    fn peers(&self) -> Vec<String>;

    /// Add a peer.
    ///
    /// Returns `true` if the peer was new. Re-adding a known peer refreshes
    /// its `last_seen` and returns `false`.
    fn add_peer(&self, address: &str) -> Result<bool, PeerStoreError>;

    /// Remove a peer. Removing an unknown peer is a no-op.
    fn remove_peer(&self, address: &str) -> Result<(), PeerStoreError>;
}

/// In-memory peer store.
#[derive(Debug, Default)]
pub struct InMemPeerStore {
    peers: RwLock<Vec<Peer>>,
}

impl InMemPeerStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `peers`.
    pub fn from_peers(peers: Vec<Peer>) -> Self {
        Self {
            peers: RwLock::new(peers),
        }
    }

    /// Copy of all peer records.
    pub fn snapshot(&self) -> Vec<Peer> {
        self.peers.read().expect("lock poisoned").clone()
    }

    /// Insert or refresh a peer; `true` if it was new.
    fn upsert(&self, address: &str) -> bool {
        let mut peers = self.peers.write().expect("lock poisoned");
        if let Some(peer) = peers.iter_mut().find(|p| p.address == address) {
            peer.last_seen = now_nanos();
            return false;
        }
        peers.push(Peer::seen_now(address));
        true
    }

    /// Remove a peer; `true` if it was present.
    fn remove(&self, address: &str) -> bool {
        let mut peers = self.peers.write().expect("lock poisoned");
        let before = peers.len();
        peers.retain(|p| p.address != address);
        peers.len() != before
    }
}

impl PeerStore for InMemPeerStore {
    fn peers(&self) -> Vec<String> {
        self.peers
            .read()
            .expect("lock poisoned")
            .iter()
            .map(|p| p.address.clone())
            .collect()
    }

    fn add_peer(&self, address: &str) -> Result<bool, PeerStoreError> {
        Ok(self.upsert(address))
    }

    fn remove_peer(&self, address: &str) -> Result<(), PeerStoreError> {
        self.remove(address);
        Ok(())
    }
}

/// Peer store persisted to a JSON file.
///
/// Reads go to the in-memory cache. Every mutation that changes the peer
/// list is committed to disk before returning.
#[derive(Debug)]
pub struct JsonPeerStore {
    path: PathBuf,
    cache: InMemPeerStore,
}

impl JsonPeerStore {
    /// Open the store at `path`, loading existing peers if the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PeerStoreError> {
        let path = path.as_ref().to_path_buf();
        let peers = match std::fs::read(&path) {
            Ok(data) => serde_json::from_slice(&data)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        info!(path = %path.display(), count = peers.len(), "opened peer store");

        Ok(Self {
            path,
            cache: InMemPeerStore::from_peers(peers),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of all peer records.
    pub fn snapshot(&self) -> Vec<Peer> {
        self.cache.snapshot()
    }

    /// Write the cached peer list to disk.
    pub fn commit(&self) -> Result<(), PeerStoreError> {
        let peers = self.cache.snapshot();
        let data = serde_json::to_vec_pretty(&peers)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        // Write-then-rename so readers never see a partial file.
        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, &data)?;
        std::fs::rename(&tmp_path, &self.path)?;

        debug!(path = %self.path.display(), count = peers.len(), "committed peer store");
        Ok(())
    }
}

impl PeerStore for JsonPeerStore {
    fn peers(&self) -> Vec<String> {
        self.cache.peers()
    }

    fn add_peer(&self, address: &str) -> Result<bool, PeerStoreError> {
        if !self.cache.upsert(address) {
            return Ok(false);
        }
        self.commit()?;
        Ok(true)
    }

    fn remove_peer(&self, address: &str) -> Result<(), PeerStoreError> {
        if self.cache.remove(address) {
            self.commit()?;
        }
        Ok(())
    }
}

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
