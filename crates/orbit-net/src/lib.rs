//! Network protocol over TCP.
//!
//! This crate implements Orbit's network layer:
//!
//! - [`RingMessage`]: the wire protocol (postcard-serialized, length-prefixed).
//! - [`NetClient`]: pooled connections to lookup servers with idle reaping.
//! - [`LookupServer`]: serves a [`Coordinator`](orbit_cluster::Coordinator)'s
//!   lookups to remote callers.
//! - [`RemoteRing`]: a [`RingLookup`](orbit_cluster::RingLookup) answered by
//!   a remote node.

mod client;
pub mod codec;
mod error;
mod message;
mod remote;
mod server;

pub use client::{MIN_REAP_INTERVAL, NetClient, NetClientConfig, PoolLifecycle};
pub use error::NetError;
pub use message::RingMessage;
pub use remote::RemoteRing;
pub use server::{LookupServer, handle_request};

use orbit_placement::LocationSet;
use orbit_types::{Identifier, Node};

/// Trait abstracting the lookup calls made to remote nodes.
///
/// This allows substituting a mock transport in tests.
#[async_trait::async_trait]
pub trait LookupTransport: Send + Sync {
    /// Up to `n` successors of `key`'s digest, as seen by `host`.
    async fn lookup(&self, host: &str, n: usize, key: &[u8]) -> Result<Vec<Node>, NetError>;

    /// Up to `n` successors of `hash`, as seen by `host`.
    async fn lookup_hash(
        &self,
        host: &str,
        n: usize,
        hash: &Identifier,
    ) -> Result<Vec<Node>, NetError>;

    /// `n` replica locations of `key`, resolved by `host`.
    async fn lookup_replicated(
        &self,
        host: &str,
        key: &[u8],
        n: usize,
    ) -> Result<LocationSet, NetError>;

    /// `n` replica locations of `hash`, resolved by `host`.
    async fn lookup_replicated_hash(
        &self,
        host: &str,
        hash: &Identifier,
        n: usize,
    ) -> Result<LocationSet, NetError>;
}
