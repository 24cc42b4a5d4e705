//! Cross-track deduplication via a spatial hash grid
//!
//! When multiple tracks cover the same ground (repeated runs of one route),
//! rendering and fogging each copy is wasted work. The first track to claim
//! a grid cell owns it; later tracks passing through an owned cell borrow
//! the owner's point and are split into fragments at each ownership change,
//! so a single output track never silently jumps between its own geometry
//! and borrowed geometry.

use std::collections::HashMap;

use crate::geometry::METERS_PER_DEGREE;
use crate::track::{Track, TrackPoint};

/// Grid cell address in the equirectangular meters approximation.
///
/// The approximation only gates the dedup decision, never final geometry,
/// so the distortion away from the equator is acceptable.
fn cell_key(point: &TrackPoint, cell_size_meters: f64) -> (i64, i64) {
    let lat_meters = point.lat * METERS_PER_DEGREE;
    let lon_meters = point.lon * METERS_PER_DEGREE * point.lat.to_radians().cos();

    (
        (lat_meters / cell_size_meters).floor() as i64,
        (lon_meters / cell_size_meters).floor() as i64,
    )
}

#[derive(Clone, Copy)]
struct CellClaim {
    owner: usize,
    point: TrackPoint,
}

/// Collapse near-duplicate points across tracks sharing the same ground.
///
/// Tracks are processed in input order and the first-seen track wins
/// ownership of a contested cell; later tracks are the ones fragmented or
/// suppressed. This ordering dependency is a deliberate, testable property.
/// A track re-entering a cell it already owns is a no-op, never a merge.
///
/// Fragments of 2 points or fewer are dropped.
pub fn deduplicate_by_cells(tracks: &[Track], cell_size_meters: f64) -> Vec<Track> {
    let mut cells: HashMap<(i64, i64), CellClaim> = HashMap::new();
    let mut deduplicated = Vec::new();

    for (ordinal, track) in tracks.iter().enumerate() {
        let mut filtered: Vec<TrackPoint> = Vec::new();
        // Claimed point of the previous iteration's cell, while inside a
        // duplicate run
        let mut prev_duplicate: Option<TrackPoint> = None;

        for point in &track.points {
            let key = cell_key(point, cell_size_meters);
            let claim = cells.get(&key).copied();
            let is_duplicate = claim.is_some_and(|c| c.owner != ordinal);

            if prev_duplicate.is_some() && !is_duplicate {
                // Leaving a duplicate run: close the fragment and seed the
                // next one with the bridging borrowed point
                if filtered.len() > 2 {
                    deduplicated.push(track.fragment(filtered));
                }
                filtered = prev_duplicate.take().into_iter().collect();
            }

            if !is_duplicate {
                cells.insert(
                    key,
                    CellClaim {
                        owner: ordinal,
                        point: *point,
                    },
                );
                filtered.push(*point);
            } else if prev_duplicate.is_none() {
                // Entering a duplicate run: borrow the owner's point so the
                // fragment ends on shared geometry
                if let Some(c) = claim {
                    filtered.push(c.point);
                }
            }

            prev_duplicate = if is_duplicate {
                claim.map(|c| c.point)
            } else {
                None
            };
        }

        if filtered.len() > 2 {
            deduplicated.push(track.fragment(filtered));
        }
    }

    deduplicated
}
