//! Protocol messages for the Orbit lookup service.
//!
//! All messages are serialized with postcard and framed by
//! [`codec`](crate::codec).

use orbit_placement::Location;
use orbit_types::{Identifier, Node};
use serde::{Deserialize, Serialize};

/// Messages exchanged between a lookup client and a lookup server.
///
/// Requests and responses alternate on a connection: the client writes one
/// request and reads exactly one response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RingMessage {
    /// Up to `n` successors of `key`'s digest.
    Lookup {
        /// Successor count.
        n: u32,
        /// Raw key, digested by the server.
        key: Vec<u8>,
    },

    /// Up to `n` successors of `hash`.
    LookupHash {
        /// Successor count.
        n: u32,
        /// Ring identifier.
        hash: Identifier,
    },

    /// `n` replica locations of `key`.
    LookupReplicated {
        /// Replica count.
        n: u32,
        /// Raw key, digested by the server.
        key: Vec<u8>,
    },

    /// `n` replica locations of `hash`.
    LookupReplicatedHash {
        /// Replica count.
        n: u32,
        /// Ring identifier.
        hash: Identifier,
    },

    /// Response to [`Lookup`](Self::Lookup) and
    /// [`LookupHash`](Self::LookupHash).
    Nodes(Vec<Node>),

    /// Response to the replicated lookups, in rank order.
    Locations(Vec<Location>),

    /// The server could not answer the request.
    Failure {
        /// Human-readable reason.
        message: String,
    },
}

impl RingMessage {
    /// Short name of the message variant, for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            RingMessage::Lookup { .. } => "Lookup",
            RingMessage::LookupHash { .. } => "LookupHash",
            RingMessage::LookupReplicated { .. } => "LookupReplicated",
            RingMessage::LookupReplicatedHash { .. } => "LookupReplicatedHash",
            RingMessage::Nodes(_) => "Nodes",
            RingMessage::Locations(_) => "Locations",
            RingMessage::Failure { .. } => "Failure",
        }
    }
}
