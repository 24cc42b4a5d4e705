//! Polyline simplification: Douglas-Peucker and distance-based decimation

use crate::geometry::{perpendicular_distance, pixel_distance};
use crate::track::{Track, TrackPoint};

/// Default on-screen density threshold in pixels.
pub const DEFAULT_MIN_PIXEL_DISTANCE: f64 = 10.0;

/// Douglas-Peucker tolerance in degrees at the pivot zoom level.
pub const TOLERANCE_BASE_DEGREES: f64 = 0.0001;
const TOLERANCE_PIVOT_ZOOM: f64 = 12.0;
const TOLERANCE_FLOOR_DEGREES: f64 = 0.00005;

/// Douglas-Peucker polyline reduction.
///
/// Returns a subsequence of `points` that always contains the first and last
/// element; every discarded point deviates from its replacing chord by at
/// most `tolerance` (in coordinate-degree units). Pure and deterministic.
///
/// Implemented with an explicit work stack: near-collinear tracks degrade
/// recursion to depth O(n), which would overflow the call stack on large
/// inputs.
pub fn douglas_peucker(points: &[TrackPoint], tolerance: f64) -> Vec<TrackPoint> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    let mut stack = vec![(0usize, points.len() - 1)];
    while let Some((first, last)) = stack.pop() {
        if last - first < 2 {
            continue;
        }

        let mut max_distance = 0.0;
        let mut max_index = first;
        for i in first + 1..last {
            let distance = perpendicular_distance(&points[i], &points[first], &points[last]);
            if distance > max_distance {
                max_distance = distance;
                max_index = i;
            }
        }

        if max_distance > tolerance {
            keep[max_index] = true;
            stack.push((first, max_index));
            stack.push((max_index, last));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, kept)| kept.then_some(*p))
        .collect()
}

/// Decimate a point sequence so that consecutive kept points are at least
/// `min_pixel_distance` apart on screen at the given zoom.
///
/// The first and last point are always kept. This bounds on-screen point
/// density independent of geographic density, which varies wildly with GPS
/// sampling rates.
pub fn distance_filtered_points(
    points: &[TrackPoint],
    zoom: f64,
    min_pixel_distance: f64,
) -> Vec<TrackPoint> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let mut optimized = vec![points[0]];
    let mut last_included = points[0];

    for current in &points[1..points.len() - 1] {
        if pixel_distance(&last_included, current, zoom) >= min_pixel_distance {
            optimized.push(*current);
            last_included = *current;
        }
    }

    optimized.push(points[points.len() - 1]);
    optimized
}

/// Apply [`distance_filtered_points`] to every track, excluding tracks that
/// end up degenerate (fewer than 2 points).
pub fn distance_filtered_tracks(
    tracks: &[Track],
    zoom: f64,
    min_pixel_distance: f64,
) -> Vec<Track> {
    tracks
        .iter()
        .map(|track| {
            track.fragment(distance_filtered_points(
                &track.points,
                zoom,
                min_pixel_distance,
            ))
        })
        .filter(|track| !track.is_degenerate())
        .collect()
}

/// Douglas-Peucker tolerance for a zoom level: looser when zoomed out,
/// tighter when zoomed in, floored so detail never fully vanishes.
///
/// Monotonically non-increasing in zoom, so zooming in never increases
/// simplification aggressiveness.
pub fn tolerance_for_zoom(zoom: f64) -> f64 {
    let steps = TOLERANCE_PIVOT_ZOOM - zoom.floor();
    (TOLERANCE_BASE_DEGREES * 2f64.powf(steps)).max(TOLERANCE_FLOOR_DEGREES)
}
