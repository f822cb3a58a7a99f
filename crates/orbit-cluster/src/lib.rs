//! Replicated lookups and ring traversal on top of a successor-lookup ring.
//!
//! This crate provides:
//!
//! - [`RingLookup`]: the boundary to the ring protocol (successor lookups,
//!   successor-list length, digest function and local hostname).
//! - [`Coordinator`]: replicated lookups (one concurrent successor search
//!   per ring vertex, host-unique reassembly by rank) and scour traversals.
//! - [`LocalRing`]: an in-process ring implementing [`RingLookup`].
//! - [`peers`]: peer address stores used to bootstrap ring membership.

mod config;
mod coordinator;
mod error;
mod local;
mod lookup;
pub mod peers;
mod scour;


pub use config::{DEFAULT_MAX_REPLICAS, RingConfig};
pub use coordinator::Coordinator;
pub use error::{ClusterError, PeerStoreError, ScourError};
pub use local::LocalRing;
pub use lookup::{RingError, RingLookup};
pub use peers::{InMemPeerStore, JsonPeerStore, Peer, PeerStore};
