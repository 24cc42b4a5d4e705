//! Render pipeline: composes dedup, visibility lookup and simplification
//!
//! The pipeline separates the expensive, rare work (deduplicating the track
//! set and building the tile index) from the cheap per-frame work (visibility
//! lookup plus bounded-size simplification of the on-screen slices). The
//! per-frame results are memoized in an explicit LRU cache keyed by the
//! track-set version, so invalidation is a counter bump instead of
//! reference-identity tricks.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use crate::dedup::deduplicate_by_cells;
use crate::index::{MAX_INDEXED_ZOOM, MIN_INDEXED_ZOOM, TileIndex, VisiblePoints};
use crate::simplify::{
    DEFAULT_MIN_PIXEL_DISTANCE, distance_filtered_points, douglas_peucker, tolerance_for_zoom,
};
use crate::tiles::Viewport;
use crate::track::{Track, TrackPoint};

/// Tuning knobs for the pipeline. All values are product configuration,
/// not contract.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Minimum on-screen spacing between rendered points.
    pub min_pixel_distance: f64,
    /// First dedup pass cell size in meters.
    pub coarse_cell_meters: f64,
    /// Second dedup pass cell size in meters.
    pub fine_cell_meters: f64,
    /// Extra tile ring kept around the viewport.
    pub buffer_tiles: u32,
    /// Context points added before/after the visible index range so lines
    /// do not end abruptly at tile boundaries.
    pub context_points: usize,
    /// Entries in the per-frame simplification cache.
    pub cache_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_pixel_distance: DEFAULT_MIN_PIXEL_DISTANCE,
            coarse_cell_meters: 250.0,
            fine_cell_meters: 50.0,
            buffer_tiles: 1,
            context_points: 5,
            cache_capacity: 128,
        }
    }
}

/// One renderable polyline for the current frame.
#[derive(Clone, Debug)]
pub struct RenderTrack {
    /// Index into [`RenderPipeline::tracks`], matching the keys of
    /// [`FrameOutput::visible`].
    pub track_index: usize,
    pub points: Arc<Vec<TrackPoint>>,
    /// Stable display hue in degrees, derived from the source filename.
    pub hue: f64,
}

/// Everything the renderer and fog layer need for one settled viewport.
///
/// Stamped with the frame counter: when frames are computed out of band,
/// apply a result only while [`RenderPipeline::is_current`] holds, so a
/// slow older frame can never overwrite a newer one.
#[derive(Clone, Debug)]
pub struct FrameOutput {
    pub frame: u64,
    pub viewport: Viewport,
    pub visible: VisiblePoints,
    pub tracks: Vec<RenderTrack>,
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct RenderKey {
    version: u64,
    track: u32,
    zoom: u8,
    start: u32,
    end: u32,
}

/// Orchestrator owning the deduplicated track set, the tile index and the
/// per-frame caches.
pub struct RenderPipeline {
    config: PipelineConfig,
    tracks: Vec<Track>,
    index: TileIndex,
    version: u64,
    frame: u64,
    cache: LruCache<RenderKey, Arc<Vec<TrackPoint>>>,
}

impl RenderPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let capacity = NonZeroUsize::new(config.cache_capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            index: TileIndex::build_with_buffer(&[], config.buffer_tiles),
            tracks: Vec::new(),
            version: 0,
            frame: 0,
            cache: LruCache::new(capacity),
            config,
        }
    }

    /// Replace the track set: runs the coarse-to-fine dedup passes, rebuilds
    /// the tile index wholesale and invalidates all cached frame work.
    ///
    /// This is the only operation with a lifetime longer than one frame;
    /// everything else is derived per viewport event.
    pub fn set_tracks(&mut self, tracks: Vec<Track>) {
        let input_points: usize = tracks.iter().map(|t| t.points.len()).sum();

        let coarse = deduplicate_by_cells(&tracks, self.config.coarse_cell_meters);
        let base = deduplicate_by_cells(&coarse, self.config.fine_cell_meters);

        let base_points: usize = base.iter().map(|t| t.points.len()).sum();
        tracing::debug!(
            tracks_in = tracks.len(),
            tracks_out = base.len(),
            points_in = input_points,
            points_out = base_points,
            "track set replaced"
        );

        self.index = TileIndex::build_with_buffer(&base, self.config.buffer_tiles);
        self.tracks = base;
        self.version += 1;
        self.cache.clear();
    }

    /// The deduplicated base tracks the current index refers to. Point
    /// indices in [`FrameOutput::visible`] are valid against this array.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Bumped on every [`RenderPipeline::set_tracks`].
    pub fn version(&self) -> u64 {
        self.version
    }

    /// True while `frame` is the most recently prepared frame.
    pub fn is_current(&self, frame: u64) -> bool {
        frame == self.frame
    }

    /// Compute the render set for a settled viewport: visibility lookup,
    /// then per-track decimation and Douglas-Peucker on the visible slice.
    pub fn prepare_frame(&mut self, viewport: &Viewport) -> FrameOutput {
        self.frame += 1;

        self.index.update_visible_tiles(viewport);
        let visible = self.index.visible_points(viewport.zoom);

        let zoom_int = viewport
            .zoom
            .clamp(MIN_INDEXED_ZOOM as f64, MAX_INDEXED_ZOOM as f64)
            .floor() as u8;
        let tolerance = tolerance_for_zoom(viewport.zoom);

        let mut render_tracks = Vec::with_capacity(visible.len());
        for track_index in 0..self.tracks.len() {
            let Some(point_indices) = visible.get(&track_index) else {
                continue;
            };
            let track = &self.tracks[track_index];
            let (Some(&min), Some(&max)) =
                (point_indices.iter().min(), point_indices.iter().max())
            else {
                continue;
            };

            let start = min.saturating_sub(self.config.context_points);
            let end = (max + self.config.context_points).min(track.points.len() - 1);

            let key = RenderKey {
                version: self.version,
                track: track_index as u32,
                zoom: zoom_int,
                start: start as u32,
                end: end as u32,
            };
            let points = if let Some(cached) = self.cache.get(&key) {
                cached.clone()
            } else {
                let slice = &track.points[start..=end];
                // Decimate at the quantized zoom stored in the key, so the
                // cached value is a pure function of the key and the output
                // never depends on which fractional zoom settled first
                let decimated = distance_filtered_points(
                    slice,
                    zoom_int as f64,
                    self.config.min_pixel_distance,
                );
                let simplified = Arc::new(douglas_peucker(&decimated, tolerance));
                self.cache.put(key, simplified.clone());
                simplified
            };

            if points.len() < 2 {
                continue;
            }
            render_tracks.push(RenderTrack {
                track_index,
                hue: filename_hue(&track.filename),
                points,
            });
        }

        FrameOutput {
            frame: self.frame,
            viewport: *viewport,
            visible,
            tracks: render_tracks,
        }
    }
}

/// Golden-angle hue from a filename hash, so tracks get stable, spread-out
/// colors without any registry.
fn filename_hue(filename: &str) -> f64 {
    let mut hasher = DefaultHasher::new();
    filename.hash(&mut hasher);
    ((hasher.finish() % 360) as f64 * 137.508) % 360.0
}
