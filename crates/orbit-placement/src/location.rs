//! Replica locations.

use std::fmt;
use std::ops::Deref;

use orbit_types::{Identifier, Node};
use serde::{Deserialize, Serialize};

use crate::error::PlacementError;

/// A single resolved replica placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// The ring vertex whose successor search produced this location.
    pub id: Identifier,
    /// Replica rank, `0` being the primary.
    pub priority: u32,
    /// Position of `node` in the successor list returned for `id`.
    pub index: u32,
    /// The node holding this replica.
    pub node: Node,
}

impl Location {
    /// Create a location.
    pub fn new(id: Identifier, priority: u32, index: u32, node: Node) -> Self {
        Self {
            id,
            priority,
            index,
            node,
        }
    }

    /// Host serving this location.
    pub fn host(&self) -> &str {
        &self.node.host
    }
}

/// Rank-ordered replica locations for a key.
///
/// Position `i` holds the location with priority `i`, and every location is
/// served by a different host. Both the successor-by-identifier
/// ([`end_range`](Self::end_range)) and successor-by-host
/// ([`get_next`](Self::get_next)) relations wrap from the last location back
/// to the first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationSet(Vec<Location>);

impl LocationSet {
    /// Wrap locations that are already in rank order.
    pub fn new(locations: Vec<Location>) -> Self {
        Self(locations)
    }

    /// The primary (priority 0) location.
    pub fn primary(&self) -> Option<&Location> {
        self.0.first()
    }

    /// The arc between the first two locations: `(locs[0].id, locs[1].id)`.
    ///
    /// Returns `None` for sets with fewer than two locations.
    pub fn natural_range(&self) -> Option<(&Identifier, &Identifier)> {
        match self.0.as_slice() {
            [first, second, ..] => Some((&first.id, &second.id)),
            _ => None,
        }
    }

    /// The identifier of the location following `id`, wrapping to the first.
    pub fn end_range(&self, id: &Identifier) -> Result<&Identifier, PlacementError> {
        let pos = self
            .0
            .iter()
            .position(|loc| &loc.id == id)
            .ok_or_else(|| PlacementError::IdNotFound(id.clone()))?;
        Ok(&self.0[(pos + 1) % self.0.len()].id)
    }

    /// The location served by `host`.
    pub fn get_by_host(&self, host: &str) -> Result<&Location, PlacementError> {
        self.0
            .iter()
            .find(|loc| loc.host() == host)
            .ok_or_else(|| PlacementError::HostNotFound(host.to_string()))
    }

    /// The location following the one served by `host`, wrapping to the first.
    pub fn get_next(&self, host: &str) -> Result<&Location, PlacementError> {
        let pos = self
            .0
            .iter()
            .position(|loc| loc.host() == host)
            .ok_or_else(|| PlacementError::HostNotFound(host.to_string()))?;
        Ok(&self.0[(pos + 1) % self.0.len()])
    }

    /// Whether any location is served by `host`.
    pub fn contains_host(&self, host: &str) -> bool {
        self.0.iter().any(|loc| loc.host() == host)
    }

    /// Hosts in rank order.
    pub fn hosts(&self) -> Vec<&str> {
        self.0.iter().map(Location::host).collect()
    }

    /// Append a location as the next rank.
    pub fn push(&mut self, location: Location) {
        self.0.push(location);
    }

    /// Unwrap into the underlying vector.
    pub fn into_inner(self) -> Vec<Location> {
        self.0
    }
}

impl Deref for LocationSet {
    type Target = [Location];

    fn deref(&self) -> &[Location] {
        &self.0
    }
}

impl From<Vec<Location>> for LocationSet {
    fn from(locations: Vec<Location>) -> Self {
        Self(locations)
    }
}

impl FromIterator<Location> for LocationSet {
    fn from_iter<I: IntoIterator<Item = Location>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for LocationSet {
    type Item = Location;
    type IntoIter = std::vec::IntoIter<Location>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a LocationSet {
    type Item = &'a Location;
    type IntoIter = std::slice::Iter<'a, Location>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for LocationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[ ")?;
        for loc in &self.0 {
            write!(f, "{} ", loc.host())?;
        }
        f.write_str("]")
    }
}
