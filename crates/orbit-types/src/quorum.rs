//! Fault-tolerance arithmetic.
//!
//! Relates a tolerated number of faulty nodes `f` to the replica, vote and
//! commit counts needed for Byzantine-style agreement. These are helpers for
//! callers choosing a replica count; nothing in Orbit enforces a consensus
//! protocol.

/// Replicas required to tolerate `faulty` faulty nodes: `3f + 1`.
pub fn replicas_with_fault(faulty: usize) -> usize {
    3 * faulty + 1
}

/// Votes required to propose while tolerating `faulty` nodes: `2f + 1`.
pub fn votes_with_fault(faulty: usize) -> usize {
    2 * faulty + 1
}

/// Commits required while tolerating `faulty` nodes: `f + 1`.
pub fn commits_with_fault(faulty: usize) -> usize {
    faulty + 1
}
