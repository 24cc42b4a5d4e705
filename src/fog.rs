//! Fog-of-war mask geometry
//!
//! Rebuilt from scratch on every viewport settle event: area within the
//! discovery radius of any visible track point is punched out of a dark
//! overlay, everything else stays fogged. The union of per-point discs
//! along a polyline is approximated with a stroked path (round caps and
//! joins, stroke width = 2 x radius) plus circles on a zoom-dependent
//! subsample of the points, instead of exact disc-union geometry.

use crate::geometry::meters_per_pixel;
use crate::index::VisiblePoints;
use crate::tiles::Viewport;
use crate::track::Track;

/// Lat/lng to layer-pixel projection, supplied by the map widget. The fog
/// layer never projects on its own so that its geometry always lines up
/// with the widget's tile layer.
pub trait Projection {
    fn project(&self, lat: f64, lon: f64) -> (f64, f64);
}

/// World-pixel Web Mercator projection at a fixed zoom (256px tiles).
/// Stands in for the map widget in tests and headless runs.
pub struct WebMercatorProjection {
    pub zoom: f64,
}

impl Projection for WebMercatorProjection {
    fn project(&self, lat: f64, lon: f64) -> (f64, f64) {
        let scale = 256.0 * 2f64.powf(self.zoom);
        let x = (lon + 180.0) / 360.0 * scale;
        let y = (1.0 - lat.to_radians().tan().asinh() / std::f64::consts::PI) / 2.0 * scale;
        (x, y)
    }
}

/// Axis-aligned rectangle in layer pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A stroked polyline hole in the mask; rendered with round caps and joins.
#[derive(Clone, Debug)]
pub struct MaskPath {
    pub points: Vec<(f64, f64)>,
    pub stroke_width: f64,
}

/// A circular hole in the mask.
#[derive(Clone, Copy, Debug)]
pub struct MaskCircle {
    pub cx: f64,
    pub cy: f64,
    pub radius: f64,
}

/// Presentation variant; identical mask-construction contract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FogStyle {
    /// Flat dark rectangle clipped by the mask.
    #[default]
    Classic,
    /// Color-inverted copy of the base map tiles clipped by the same mask.
    Inverted,
}

#[derive(Clone, Debug)]
pub struct FogConfig {
    /// Real-world radius considered "revealed" around a visible point.
    pub discovery_radius_meters: f64,
    /// Radius floor so the reveal never disappears at low zoom.
    pub min_radius_pixels: f64,
    /// How far the overlay extends past the viewport, so panning does not
    /// flash unfogged edges before the next rebuild.
    pub viewport_buffer_pixels: f64,
    /// Index padding around the visible range for line continuity.
    pub context_points: usize,
    pub overlay_opacity: f64,
    pub style: FogStyle,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            discovery_radius_meters: 250.0,
            min_radius_pixels: 2.0,
            viewport_buffer_pixels: 2000.0,
            context_points: 3,
            overlay_opacity: 0.8,
            style: FogStyle::Classic,
        }
    }
}

/// Complete fog geometry for one frame: a backdrop rectangle with path and
/// circle holes, and the overlay rectangle it masks.
#[derive(Clone, Debug)]
pub struct FogFrame {
    pub mask_bounds: PixelRect,
    pub paths: Vec<MaskPath>,
    pub circles: Vec<MaskCircle>,
    pub overlay: PixelRect,
    pub overlay_opacity: f64,
    pub style: FogStyle,
}

/// Build the mask for the current frame.
///
/// `visible` must come from the same track array as `tracks` (normally the
/// pipeline's base tracks), so nothing the renderer skipped can leak into
/// the revealed area. Tracks with no visible points emit no geometry.
pub fn build_fog_frame(
    tracks: &[Track],
    visible: &VisiblePoints,
    viewport: &Viewport,
    projection: &impl Projection,
    config: &FogConfig,
) -> FogFrame {
    let (left, top) = projection.project(viewport.north, viewport.west);
    let (right, bottom) = projection.project(viewport.south, viewport.east);

    let buffer = config.viewport_buffer_pixels;
    let bounds = PixelRect {
        x: left - buffer,
        y: top - buffer,
        width: (right - left) + 2.0 * buffer,
        height: (bottom - top) + 2.0 * buffer,
    };

    // Fewer circles when zoomed out; the stroked path carries the shape
    let circle_step = ((12.0 - viewport.zoom).floor() as i64).max(1) as usize;

    let mut paths = Vec::new();
    let mut circles = Vec::new();

    for (track_index, track) in tracks.iter().enumerate() {
        let Some(point_indices) = visible.get(&track_index) else {
            continue;
        };
        if point_indices.is_empty() || track.points.is_empty() {
            continue;
        }
        let (Some(&min), Some(&max)) = (point_indices.iter().min(), point_indices.iter().max())
        else {
            continue;
        };

        let start = min.saturating_sub(config.context_points);
        let end = (max + config.context_points).min(track.points.len() - 1);
        if end - start < 1 {
            continue;
        }

        let anchor = &track.points[start];
        let radius = (config.discovery_radius_meters / meters_per_pixel(anchor.lat, viewport.zoom))
            .max(config.min_radius_pixels);

        let projected: Vec<(f64, f64)> = track.points[start..=end]
            .iter()
            .map(|p| projection.project(p.lat, p.lon))
            .collect();

        for (i, &(cx, cy)) in projected.iter().enumerate() {
            if i % circle_step == 0 {
                circles.push(MaskCircle { cx, cy, radius });
            }
        }
        paths.push(MaskPath {
            points: projected,
            stroke_width: radius * 2.0,
        });
    }

    FogFrame {
        mask_bounds: bounds,
        paths,
        circles,
        overlay: bounds,
        overlay_opacity: config.overlay_opacity,
        style: config.style,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::TrackPoint;
    use std::collections::{HashMap, HashSet};

    fn create_test_track(count: usize) -> Track {
        Track::new(
            "a.gpx",
            (0..count)
                .map(|i| TrackPoint::new(51.5 + i as f64 * 0.001, -0.1))
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

    fn visible_range(track_index: usize, range: std::ops::Range<usize>) -> VisiblePoints {
        let mut map = HashMap::new();
        map.insert(track_index, range.collect::<HashSet<usize>>());
        map
    }

    #[test]
    fn test_mercator_projection_center() {
        let projection = WebMercatorProjection { zoom: 0.0 };
        let (x, y) = projection.project(0.0, 0.0);
        assert!((x - 128.0).abs() < 1e-9);
        assert!((y - 128.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_visible_map_emits_no_geometry() {
        let tracks = vec![create_test_track(50)];
        let viewport = london_viewport(13.0);
        let projection = WebMercatorProjection { zoom: 13.0 };

        let frame = build_fog_frame(
            &tracks,
            &HashMap::new(),
            &viewport,
            &projection,
            &FogConfig::default(),
        );
        assert!(frame.paths.is_empty());
        assert!(frame.circles.is_empty());
        // The fog itself still covers the buffered viewport
        assert!(frame.overlay.width > 0.0);
    }

    #[test]
    fn test_overlay_buffered_beyond_viewport() {
        let viewport = london_viewport(13.0);
        let projection = WebMercatorProjection { zoom: 13.0 };
        let config = FogConfig::default();

        let frame = build_fog_frame(&[], &HashMap::new(), &viewport, &projection, &config);

        let (left, top) = projection.project(viewport.north, viewport.west);
        let (right, _) = projection.project(viewport.south, viewport.east);
        assert_eq!(frame.overlay.x, left - config.viewport_buffer_pixels);
        assert_eq!(frame.overlay.y, top - config.viewport_buffer_pixels);
        assert_eq!(
            frame.overlay.width,
            (right - left) + 2.0 * config.viewport_buffer_pixels
        );
        assert_eq!(frame.overlay, frame.mask_bounds);
    }

    #[test]
    fn test_visible_range_padded_for_continuity() {
        let tracks = vec![create_test_track(100)];
        let viewport = london_viewport(13.0);
        let projection = WebMercatorProjection { zoom: 13.0 };

        let frame = build_fog_frame(
            &tracks,
            &visible_range(0, 10..21),
            &viewport,
            &projection,
            &FogConfig::default(),
        );

        // Indices 10..=20 padded by 3 on each side: 7..=23 is 17 points
        assert_eq!(frame.paths.len(), 1);
        assert_eq!(frame.paths[0].points.len(), 17);
    }

    #[test]
    fn test_padding_clamped_at_track_ends() {
        let tracks = vec![create_test_track(10)];
        let viewport = london_viewport(13.0);
        let projection = WebMercatorProjection { zoom: 13.0 };

        let frame = build_fog_frame(
            &tracks,
            &visible_range(0, 0..10),
            &viewport,
            &projection,
            &FogConfig::default(),
        );
        assert_eq!(frame.paths[0].points.len(), 10);
    }

    #[test]
    fn test_radius_floor_at_low_zoom() {
        let tracks = vec![create_test_track(50)];
        let viewport = london_viewport(3.0);
        let projection = WebMercatorProjection { zoom: 3.0 };

        let frame = build_fog_frame(
            &tracks,
            &visible_range(0, 0..50),
            &viewport,
            &projection,
            &FogConfig::default(),
        );
        assert_eq!(frame.paths[0].stroke_width, 4.0);
        assert_eq!(frame.circles[0].radius, 2.0);
    }

    #[test]
    fn test_radius_scales_with_configured_distance() {
        let tracks = vec![create_test_track(50)];
        let viewport = london_viewport(15.0);
        let projection = WebMercatorProjection { zoom: 15.0 };

        let near = FogConfig {
            discovery_radius_meters: 100.0,
            ..FogConfig::default()
        };
        let far = FogConfig {
            discovery_radius_meters: 250.0,
            ..FogConfig::default()
        };

        let visible = visible_range(0, 0..50);
        let near_frame = build_fog_frame(&tracks, &visible, &viewport, &projection, &near);
        let far_frame = build_fog_frame(&tracks, &visible, &viewport, &projection, &far);
        let ratio = far_frame.circles[0].radius / near_frame.circles[0].radius;
        assert!((ratio - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_circle_subsampling_depends_on_zoom() {
        let tracks = vec![create_test_track(100)];
        let visible = visible_range(0, 0..100);

        // Zoom 8: every 4th point; zoom 12 and above: every point
        let far_frame = build_fog_frame(
            &tracks,
            &visible,
            &london_viewport(8.0),
            &WebMercatorProjection { zoom: 8.0 },
            &FogConfig::default(),
        );
        let near_frame = build_fog_frame(
            &tracks,
            &visible,
            &london_viewport(15.0),
            &WebMercatorProjection { zoom: 15.0 },
            &FogConfig::default(),
        );

        assert_eq!(far_frame.circles.len(), 100usize.div_ceil(4));
        assert_eq!(near_frame.circles.len(), 100);
    }

    #[test]
    fn test_track_without_visible_points_skipped() {
        let tracks = vec![create_test_track(50), create_test_track(50)];
        let viewport = london_viewport(13.0);
        let projection = WebMercatorProjection { zoom: 13.0 };

        let frame = build_fog_frame(
            &tracks,
            &visible_range(1, 5..25),
            &viewport,
            &projection,
            &FogConfig::default(),
        );
        assert_eq!(frame.paths.len(), 1);
    }

    #[test]
    fn test_inverted_style_passthrough() {
        let config = FogConfig {
            style: FogStyle::Inverted,
            ..FogConfig::default()
        };
        let frame = build_fog_frame(
            &[],
            &HashMap::new(),
            &london_viewport(13.0),
            &WebMercatorProjection { zoom: 13.0 },
            &config,
        );
        assert_eq!(frame.style, FogStyle::Inverted);
    }
}
