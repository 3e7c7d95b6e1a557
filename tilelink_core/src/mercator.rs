//! Web Mercator tile math.
//!
//! All functions here are pure and total: they never panic and never fail. Range checks are
//! left to the caller ([`TileCoord::is_valid`], [`tiles_overlap_bbox`]), so results outside the
//! pyramid are returned as they are computed.

use crate::{GeoBBox, MAX_MERCATOR_LAT, MAX_ZOOM, TileCoord, TileRange};
use std::f64::consts::PI;

/// Fractional tile position of a point at `zoom`.
///
/// `x = (lon + 180) / 360 · 2^zoom` and `y = (1 - asinh(tan(lat)) / π) / 2 · 2^zoom`.
/// The inputs are not clamped; non-finite inputs propagate as NaN.
#[must_use]
pub fn lon_lat_to_tile_fraction(lon: f64, lat: f64, zoom: u8) -> [f64; 2] {
	let n = 2f64.powi(i32::from(zoom));
	let x = (lon + 180.0) / 360.0 * n;
	let y = (1.0 - lat.to_radians().tan().asinh() / PI) / 2.0 * n;
	[x, y]
}

/// The tile containing `(lon, lat)` at `zoom`.
///
/// Returns `None` when the projection is undefined: NaN or infinite input, or `|lat| >= 90`.
/// `tan` of ±90° is finite in floating point, so the poles are rejected explicitly instead of
/// producing a huge `y`. A `Some` result may still lie outside the pyramid, e.g. for
/// `lon = 180`; check it with [`TileCoord::is_valid`] before use.
///
/// ```
/// use tilelink_core::mercator::lon_lat_to_tile;
///
/// let tile = lon_lat_to_tile(13.4, 52.5, 10).unwrap();
/// assert_eq!((tile.x, tile.y), (550, 335));
/// assert!(lon_lat_to_tile(f64::NAN, 52.5, 10).is_none());
/// assert!(lon_lat_to_tile(0.0, 90.0, 3).is_none());
/// ```
#[must_use]
pub fn lon_lat_to_tile(lon: f64, lat: f64, zoom: u8) -> Option<TileCoord> {
	if lat.is_nan() || lat.abs() >= 90.0 {
		return None;
	}
	let [x, y] = lon_lat_to_tile_fraction(lon, lat, zoom);
	if !x.is_finite() || !y.is_finite() {
		return None;
	}
	Some(TileCoord::new_unchecked(zoom, x.floor() as i64, y.floor() as i64))
}

fn tile_x_to_lon(x: f64, n: f64) -> f64 {
	x / n * 360.0 - 180.0
}

fn tile_y_to_lat(y: f64, n: f64) -> f64 {
	(PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees()
}

/// Bounds of tile `(x, y)` at `zoom` as `[west, south, east, north]`.
///
/// The north-west corner comes from `(x, y)`, the south-east corner from `(x + 1, y + 1)`.
#[must_use]
pub fn tile_to_lon_lat_bounds(x: i64, y: i64, zoom: u8) -> [f64; 4] {
	let n = 2f64.powi(i32::from(zoom));
	let (x, y) = (x as f64, y as f64);
	[
		tile_x_to_lon(x, n),
		tile_y_to_lat(y + 1.0, n),
		tile_x_to_lon(x + 1.0, n),
		tile_y_to_lat(y, n),
	]
}

/// The inclusive range of tiles covering `bbox` at `zoom`.
///
/// The south-west corner yields `min.x`/`max.y`, the north-east corner `max.x`/`min.y`.
/// Latitudes are limited to the Mercator span and indices clamped into the pyramid, so the
/// range is never inverted. Zoom levels beyond [`MAX_ZOOM`] are treated as `MAX_ZOOM`.
///
/// ```
/// use tilelink_core::{GeoBBox, mercator::bbox_to_tile_range};
///
/// let bbox = GeoBBox::new(-180.0, -90.0, 180.0, 90.0).unwrap();
/// let range = bbox_to_tile_range(&bbox, 2);
/// assert_eq!(range.count(), 16);
/// ```
#[must_use]
pub fn bbox_to_tile_range(bbox: &GeoBBox, zoom: u8) -> TileRange {
	let zoom = zoom.min(MAX_ZOOM);
	let max_index = TileCoord::tiles_per_axis(zoom) - 1;
	let south = bbox.y_min.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
	let north = bbox.y_max.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);

	let [x_west, y_south] = lon_lat_to_tile_fraction(bbox.x_min, south, zoom);
	let [x_east, y_north] = lon_lat_to_tile_fraction(bbox.x_max, north, zoom);
	let index = |v: f64| (v.floor() as i64).clamp(0, max_index);

	TileRange {
		min: TileCoord::new_unchecked(zoom, index(x_west), index(y_north)),
		max: TileCoord::new_unchecked(zoom, index(x_east), index(y_south)),
	}
}

/// Whether a tile's bounds intersect a footprint. Shared edges do not count as overlap.
#[must_use]
pub fn tiles_overlap_bbox(tile_bounds: &[f64; 4], bbox: &GeoBBox) -> bool {
	let [west, south, east, north] = *tile_bounds;
	west < bbox.x_max && bbox.x_min < east && south < bbox.y_max && bbox.y_min < north
}
