use crate::TileCoord;
use serde::Serialize;
use std::fmt::{self, Debug};

/// An inclusive rectangle of tiles at one zoom level.
///
/// `min` is the north-west corner tile and `max` the south-east one, so
/// `min.x <= max.x` and `min.y <= max.y`.
#[derive(Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileRange {
	pub min: TileCoord,
	pub max: TileCoord,
}

impl TileRange {
	#[must_use]
	pub fn level(&self) -> u8 {
		self.min.level
	}

	#[must_use]
	pub fn width(&self) -> u64 {
		(self.max.x - self.min.x + 1).max(0) as u64
	}

	#[must_use]
	pub fn height(&self) -> u64 {
		(self.max.y - self.min.y + 1).max(0) as u64
	}

	/// Number of tiles in the range.
	#[must_use]
	pub fn count(&self) -> u64 {
		self.width().saturating_mul(self.height())
	}

	#[must_use]
	pub fn contains(&self, coord: &TileCoord) -> bool {
		coord.level == self.level()
			&& (self.min.x..=self.max.x).contains(&coord.x)
			&& (self.min.y..=self.max.y).contains(&coord.y)
	}

	/// Iterates the tiles row by row, north to south.
	pub fn iter_coords(&self) -> impl Iterator<Item = TileCoord> + use<> {
		let level = self.level();
		let (x0, x1) = (self.min.x, self.max.x);
		(self.min.y..=self.max.y).flat_map(move |y| (x0..=x1).map(move |x| TileCoord::new_unchecked(level, x, y)))
	}
}

impl Debug for TileRange {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"TileRange({}: [{},{},{},{}])",
			self.level(),
			self.min.x,
			self.min.y,
			self.max.x,
			self.max.y
		)
	}
}
