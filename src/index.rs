//! Tile index: per-zoom point buckets and visibility queries
//!
//! Precomputes, for every point of every track, the tile it falls into at
//! every indexed zoom level. Building is the dominant cost and happens once
//! per track-set change; the per-frame visibility query is then a cheap
//! union over the tiles currently on screen, O(tiles in view) instead of
//! O(all points).

use std::collections::{HashMap, HashSet};

use dashmap::DashMap;
use rayon::prelude::*;
use smallvec::SmallVec;

use crate::tiles::{TileKey, Viewport, tile_at, tiles_in_bounds};
use crate::track::Track;

/// Zoom range covered by the index. Queries outside it return empty results
/// rather than erroring.
pub const MIN_INDEXED_ZOOM: u8 = 1;
pub const MAX_INDEXED_ZOOM: u8 = 18;

/// A `(track index, point index)` pair, valid against the track array the
/// index was built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointRef {
    pub track: u32,
    pub point: u32,
}

/// Per-frame visibility result: track index to set of visible point indices.
pub type VisiblePoints = HashMap<usize, HashSet<usize>>;

/// Spatial index over a fixed track array.
///
/// Read-only after construction; when the track set changes the whole index
/// is rebuilt and swapped, never patched incrementally.
pub struct TileIndex {
    buckets: HashMap<TileKey, SmallVec<[PointRef; 4]>>,
    active_tiles: Vec<TileKey>,
    buffer_tiles: u32,
}

impl TileIndex {
    /// Build the index with the default one-tile pan buffer.
    pub fn build(tracks: &[Track]) -> Self {
        Self::build_with_buffer(tracks, 1)
    }

    /// Build the index, parallelized over tracks.
    pub fn build_with_buffer(tracks: &[Track], buffer_tiles: u32) -> Self {
        let buckets: DashMap<TileKey, SmallVec<[PointRef; 4]>> = DashMap::new();

        tracks.par_iter().enumerate().for_each(|(track_idx, track)| {
            for (point_idx, point) in track.points.iter().enumerate() {
                let point_ref = PointRef {
                    track: track_idx as u32,
                    point: point_idx as u32,
                };
                for zoom in MIN_INDEXED_ZOOM..=MAX_INDEXED_ZOOM {
                    let tile = tile_at(point.lat, point.lon, zoom);
                    buckets.entry(tile).or_default().push(point_ref);
                }
            }
        });

        tracing::debug!(
            tiles = buckets.len(),
            tracks = tracks.len(),
            "tile index built"
        );

        Self {
            buckets: buckets.into_iter().collect(),
            active_tiles: Vec::new(),
            buffer_tiles,
        }
    }

    /// Record the tile set covering the viewport as the active tiles.
    /// Side effect only; pair with [`TileIndex::visible_points`].
    pub fn update_visible_tiles(&mut self, viewport: &Viewport) {
        self.active_tiles = tiles_in_bounds(viewport, self.buffer_tiles);
    }

    /// Union the point buckets of the active tiles whose zoom matches
    /// `floor(clamp(zoom, 1, 18))`. Empty when no active tiles match.
    pub fn visible_points(&self, zoom: f64) -> VisiblePoints {
        let target_zoom = zoom.clamp(MIN_INDEXED_ZOOM as f64, MAX_INDEXED_ZOOM as f64).floor() as u8;
        let mut visible: VisiblePoints = HashMap::new();

        for tile in &self.active_tiles {
            if tile.z != target_zoom {
                continue;
            }
            if let Some(bucket) = self.buckets.get(tile) {
                for point_ref in bucket {
                    visible
                        .entry(point_ref.track as usize)
                        .or_default()
                        .insert(point_ref.point as usize);
                }
            }
        }

        visible
    }

    /// Number of currently active (on-screen, buffered) tiles.
    pub fn active_tile_count(&self) -> usize {
        self.active_tiles.len()
    }

    /// Number of non-empty tile buckets across all zoom levels.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::TrackPoint;

    fn create_test_track(name: &str, count: usize, base_lat: f64, base_lon: f64) -> Track {
        Track::new(
            name,
            (0..count)
                .map(|i| TrackPoint::new(base_lat + i as f64 * 0.001, base_lon + i as f64 * 0.001))
                .collect(),
        )
    }

    fn london_viewport(zoom: f64) -> Viewport {
        Viewport {
            north: 51.6,
            south: 51.4,
            east: 0.1,
            west: -0.3,
            zoom,
        }
    }

    #[test]
    fn test_build_indexes_all_zooms() {
        let track = create_test_track("a.gpx", 10, 51.5, -0.1);
        let index = TileIndex::build(&[track]);
        // At least one bucket per indexed zoom level
        assert!(index.bucket_count() >= (MAX_INDEXED_ZOOM - MIN_INDEXED_ZOOM + 1) as usize);
    }

    #[test]
    fn test_no_active_tiles_yields_empty() {
        let track = create_test_track("a.gpx", 10, 51.5, -0.1);
        let index = TileIndex::build(&[track]);
        assert!(index.visible_points(13.0).is_empty());
    }

    #[test]
    fn test_visible_points_in_viewport() {
        let track = create_test_track("a.gpx", 10, 51.5, -0.1);
        let mut index = TileIndex::build(&[track]);

        index.update_visible_tiles(&london_viewport(13.0));
        let visible = index.visible_points(13.0);

        assert_eq!(visible.len(), 1);
        assert_eq!(visible[&0].len(), 10);
    }

    #[test]
    fn test_far_viewport_sees_nothing() {
        let track = create_test_track("a.gpx", 10, 51.5, -0.1);
        let mut index = TileIndex::build(&[track]);

        index.update_visible_tiles(&Viewport {
            north: 36.0,
            south: 35.0,
            east: 136.0,
            west: 135.0,
            zoom: 13.0,
        });
        assert!(index.visible_points(13.0).is_empty());
    }

    #[test]
    fn test_visibility_consistency() {
        // Every returned (track, point) pair must sit in a tile that
        // tiles_in_bounds reported for the same viewport
        let tracks = vec![
            create_test_track("a.gpx", 50, 51.5, -0.1),
            create_test_track("b.gpx", 50, 51.45, -0.2),
        ];
        let mut index = TileIndex::build(&tracks);

        let viewport = london_viewport(12.7);
        index.update_visible_tiles(&viewport);
        let covered: HashSet<TileKey> = tiles_in_bounds(&viewport, 1).into_iter().collect();

        let visible = index.visible_points(viewport.zoom);
        assert!(!visible.is_empty());
        for (track_idx, point_indices) in &visible {
            for point_idx in point_indices {
                let point = tracks[*track_idx].points[*point_idx];
                let tile = tile_at(point.lat, point.lon, viewport.zoom.floor() as u8);
                assert!(covered.contains(&tile));
            }
        }
    }

    #[test]
    fn test_zoom_outside_indexed_range() {
        let track = create_test_track("a.gpx", 10, 51.5, -0.1);
        let mut index = TileIndex::build(&[track]);

        // Active tiles at zoom 25 were never indexed; clamped query finds
        // no matching active tile and returns empty, not an error
        index.update_visible_tiles(&london_viewport(25.0));
        assert!(index.visible_points(25.0).is_empty());

        // Zoom below 1 clamps up to 1
        index.update_visible_tiles(&london_viewport(1.2));
        let visible = index.visible_points(0.3);
        assert_eq!(visible.len(), 1);
    }

    #[test]
    fn test_multiple_tracks_bucketed_separately() {
        let tracks = vec![
            create_test_track("a.gpx", 5, 51.5, -0.1),
            create_test_track("b.gpx", 7, 51.5, -0.1),
        ];
        let mut index = TileIndex::build(&tracks);
        index.update_visible_tiles(&london_viewport(13.0));

        let visible = index.visible_points(13.0);
        assert_eq!(visible[&0].len(), 5);
        assert_eq!(visible[&1].len(), 7);
    }
}
