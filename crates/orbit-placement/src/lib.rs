//! Replica placement on a consistent hashing ring.
//!
//! This crate holds the pure placement pieces of Orbit:
//!
//! - [`vertex`]: N equidistant ring positions ("vertexes") derived from a
//!   seed identifier. Replica `i` of a key starts its successor search at
//!   vertex `i`.
//! - [`Location`] / [`LocationSet`]: a resolved replica placement and the
//!   rank-ordered set of them returned by replicated lookups.
//! - [`Ring`]: an in-process virtual-node ring answering successor queries.
//!   Real deployments put a ring protocol behind the lookup boundary; this
//!   one backs local nodes and tests.

mod error;
mod location;
mod ring;
pub mod vertex;

pub use error::PlacementError;
pub use location::{Location, LocationSet};
pub use ring::{HostInfo, Ring};
pub use vertex::{compute_vertex_hashes, compute_vertexes};
