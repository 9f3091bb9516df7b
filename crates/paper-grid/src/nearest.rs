use std::collections::BTreeSet;

use paper_types::models::Coordinate;

use crate::bounds::all_coordinates;

pub const DEFAULT_SUGGESTION_LIMIT: usize = 3;

/// Up to `limit` free slots closest to `target`, nearest first.
///
/// Brute force over the whole board; at 120 cells nothing smarter pays off.
/// The target itself is never suggested. Equal distances are ordered
/// row-major so identical inputs always give identical output.
pub fn nearest_free(
    target: Coordinate,
    occupied: &BTreeSet<Coordinate>,
    limit: usize,
) -> Vec<Coordinate> {
    let mut candidates: Vec<(u32, Coordinate)> = all_coordinates()
        .filter(|c| *c != target && !occupied.contains(c))
        .map(|c| (distance_sq(target, c), c))
        .collect();

    // Coordinate orders row-major, which is the tie-break.
    candidates.sort_unstable();
    candidates.truncate(limit);
    candidates.into_iter().map(|(_, c)| c).collect()
}

/// Squared Euclidean distance. Same ordering as Euclidean, no floats.
fn distance_sq(a: Coordinate, b: Coordinate) -> u32 {
    let dx = u32::from(a.x.abs_diff(b.x));
    let dy = u32::from(a.y.abs_diff(b.y));
    dx * dx + dy * dy
}
