//! Tile coordinates in a Web Mercator (XYZ) pyramid.
//!
//! Indices are signed so that best-effort projection results outside the pyramid (for example
//! longitude `180` or latitudes beyond the Mercator limit) can be represented and detected
//! with [`TileCoord::is_valid`] instead of silently wrapping.
//!
//! ```
//! use tilelink_core::TileCoord;
//!
//! let coord = TileCoord::new(3, 4, 2).unwrap();
//! assert!(coord.is_valid());
//! assert!(!TileCoord::new_unchecked(3, 8, 2).is_valid());
//! ```

use crate::{GeoBBox, mercator};
use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display};

/// Deepest zoom level the pipeline works with.
pub const MAX_ZOOM: u8 = 30;

/// A tile in the XYZ scheme: `x` grows eastward, `y` grows southward.
#[derive(Eq, PartialEq, Clone, Copy, Hash, Serialize, Deserialize)]
pub struct TileCoord {
	#[serde(rename = "z")]
	pub level: u8,
	pub x: i64,
	pub y: i64,
}

impl TileCoord {
	/// Creates a validated coordinate.
	pub fn new(level: u8, x: i64, y: i64) -> Result<TileCoord> {
		let coord = TileCoord { level, x, y };
		ensure!(level <= MAX_ZOOM, "level ({level}) must be <= {MAX_ZOOM}");
		ensure!(coord.is_valid(), "tile {coord} is outside the pyramid");
		Ok(coord)
	}

	/// Creates a coordinate without checking the `0 <= x, y < 2^level` invariant.
	#[must_use]
	pub fn new_unchecked(level: u8, x: i64, y: i64) -> TileCoord {
		TileCoord { level, x, y }
	}

	/// Number of tiles along one axis at `level`.
	#[must_use]
	pub fn tiles_per_axis(level: u8) -> i64 {
		1i64 << level.min(MAX_ZOOM)
	}

	/// Whether `0 <= x, y < 2^level` holds.
	#[must_use]
	pub fn is_valid(&self) -> bool {
		if self.level > MAX_ZOOM {
			return false;
		}
		let size = TileCoord::tiles_per_axis(self.level);
		(0..size).contains(&self.x) && (0..size).contains(&self.y)
	}

	/// Geographic bounds of this tile as `[west, south, east, north]`.
	#[must_use]
	pub fn bounds_array(&self) -> [f64; 4] {
		mercator::tile_to_lon_lat_bounds(self.x, self.y, self.level)
	}

	/// Geographic bounds of this tile. Fails only for coordinates outside the pyramid.
	pub fn to_geo_bbox(&self) -> Result<GeoBBox> {
		ensure!(self.is_valid(), "tile {self} is outside the pyramid");
		GeoBBox::try_from(self.bounds_array())
	}
}

impl Debug for TileCoord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TileCoord({}, [{}, {}])", self.level, self.x, self.y)
	}
}

impl Display for TileCoord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}/{}", self.level, self.x, self.y)
	}
}
