//! Ring vertex math.
//!
//! The ring is the integer space `[0, 2^(8 * width))`. Splitting it into
//! `count` arcs of width `floor(2^(8 * width) / count)` and stepping from a
//! seed gives one start position per replica. The remainder of the division
//! is discarded, so the arc that closes the circle may be slightly longer
//! than the others.

use num_bigint::BigUint;
use orbit_types::{HashFunc, Identifier};

/// Compute `count` equidistant positions starting at `seed`, as integers.
///
/// Element 0 is the seed itself; element `i` is
/// `(seed + i * arc_width) mod 2^(8 * width)`.
pub fn ring_vertexes(seed: &Identifier, count: usize) -> Vec<BigUint> {
    if count == 0 {
        return Vec::new();
    }

    let circumference = BigUint::from(1u8) << (seed.width() * 8);
    let arc_width = &circumference / BigUint::from(count);
    let offset = BigUint::from_bytes_be(seed.as_bytes());

    (0..count)
        .map(|i| (&offset + &arc_width * BigUint::from(i)) % &circumference)
        .collect()
}

/// Compute `count` equidistant ring identifiers starting at `seed`.
///
/// Every identifier has the same width as `seed`; values with leading zero
/// bytes are left-padded so byte comparisons stay integer comparisons.
pub fn compute_vertexes(seed: &Identifier, count: usize) -> Vec<Identifier> {
    let width = seed.width();
    ring_vertexes(seed, count)
        .iter()
        .map(|v| pad_to_width(v, width))
        .collect()
}

/// Digest `key` with `hash` and compute `count` vertexes from the digest.
pub fn compute_vertex_hashes(key: &[u8], count: usize, hash: HashFunc) -> Vec<Identifier> {
    compute_vertexes(&hash.digest(key), count)
}

fn pad_to_width(value: &BigUint, width: usize) -> Identifier {
    let raw = value.to_bytes_be();
    let mut out = vec![0u8; width];
    // `to_bytes_be` yields `[0]` for zero, which may exceed a zero width.
    let take = raw.len().min(width);
    out[width - take..].copy_from_slice(&raw[raw.len() - take..]);
    Identifier::from(out)
}
