//! Geometry primitives: distances, projections and pixel conversions

use crate::track::TrackPoint;

/// Earth radius in meters (spherical approximation).
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Meters per degree of latitude (equirectangular approximation).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Web Mercator meters-per-pixel at the equator for zoom 0, 256px tiles.
const MERCATOR_RESOLUTION_Z0: f64 = 156_543.033_92;

/// Great-circle distance between two points in meters.
pub fn haversine_distance(p1: &TrackPoint, p2: &TrackPoint) -> f64 {
    let d_lat = (p2.lat - p1.lat).to_radians();
    let d_lon = (p2.lon - p1.lon).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + p1.lat.to_radians().cos() * p2.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Ground resolution of one screen pixel at the given latitude and zoom.
pub fn meters_per_pixel(lat: f64, zoom: f64) -> f64 {
    MERCATOR_RESOLUTION_Z0 * lat.to_radians().cos() / 2f64.powf(zoom)
}

/// On-screen distance between two points in pixels at the given zoom.
///
/// Uses the first point's latitude for the pixel resolution, matching how
/// the map widget scales its layer at the viewport center.
pub fn pixel_distance(p1: &TrackPoint, p2: &TrackPoint, zoom: f64) -> f64 {
    let resolution = meters_per_pixel(p1.lat, zoom);
    if resolution == 0.0 {
        return 0.0;
    }
    haversine_distance(p1, p2) / resolution
}

/// Perpendicular distance from `point` to the chord `line_start..line_end`,
/// in coordinate-degree units.
///
/// A zero-length chord yields 0 rather than NaN.
pub fn perpendicular_distance(
    point: &TrackPoint,
    line_start: &TrackPoint,
    line_end: &TrackPoint,
) -> f64 {
    let (px, py) = (point.lat, point.lon);
    let (x1, y1) = (line_start.lat, line_start.lon);
    let (x2, y2) = (line_end.lat, line_end.lon);

    // |((y2-y1)*px - (x2-x1)*py + x2*y1 - y2*x1)| / sqrt((y2-y1)^2 + (x2-x1)^2)
    let numerator = ((y2 - y1) * px - (x2 - x1) * py + x2 * y1 - y2 * x1).abs();
    let denominator = ((y2 - y1).powi(2) + (x2 - x1).powi(2)).sqrt();

    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Convert a distance in meters to degrees at the given latitude.
pub fn meters_to_degrees(meters: f64, lat: f64) -> f64 {
    let meters_per_degree = METERS_PER_DEGREE * lat.to_radians().cos().max(0.1);
    meters / meters_per_degree
}
