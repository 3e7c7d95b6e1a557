use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display};
use tilelink_derive::context;

/// Largest latitude representable in Web Mercator.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;
pub const MAX_MERCATOR_LNG: f64 = 180.0;

/// A geographic bounding box in WGS84 degrees, `[west, south, east, north]`.
///
/// Construction through [`GeoBBox::new`] (or the `TryFrom` impls) guarantees
/// `west < east`, `south < north` and that every value lies within
/// `[-180, 180] × [-90, 90]`. NaN values are rejected.
///
/// # Examples
/// ```
/// use tilelink_core::GeoBBox;
///
/// let bbox = GeoBBox::new(-10.0, -5.0, 10.0, 5.0).unwrap();
/// assert_eq!(bbox.as_array(), [-10.0, -5.0, 10.0, 5.0]);
/// assert!(GeoBBox::new(10.0, -5.0, -10.0, 5.0).is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 4]")]
pub struct GeoBBox {
	/// West
	pub x_min: f64,
	/// South
	pub y_min: f64,
	/// East
	pub x_max: f64,
	/// North
	pub y_max: f64,
}

impl GeoBBox {
	/// Creates a new `GeoBBox` from `west, south, east, north`.
	pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Result<GeoBBox> {
		GeoBBox {
			x_min,
			y_min,
			x_max,
			y_max,
		}
		.checked()
	}

	/// The whole world as far as Web Mercator reaches.
	#[must_use]
	pub fn mercator_world() -> GeoBBox {
		GeoBBox {
			x_min: -MAX_MERCATOR_LNG,
			y_min: -MAX_MERCATOR_LAT,
			x_max: MAX_MERCATOR_LNG,
			y_max: MAX_MERCATOR_LAT,
		}
	}

	/// Attempts to build an optional `GeoBBox` from an optional `Vec<f64>`.
	pub fn from_option_vec(input: Option<Vec<f64>>) -> Result<Option<GeoBBox>> {
		match input {
			Some(vec) => Ok(Some(GeoBBox::try_from(vec)?)),
			None => Ok(None),
		}
	}

	/// Clamps the latitudes in place to the span Web Mercator can project.
	pub fn limit_to_mercator(&mut self) {
		self.y_min = self.y_min.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
		self.y_max = self.y_max.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
	}

	#[must_use]
	pub fn as_array(&self) -> [f64; 4] {
		[self.x_min, self.y_min, self.x_max, self.y_max]
	}

	#[must_use]
	pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
		(self.x_min, self.y_min, self.x_max, self.y_max)
	}

	/// Returns the bounding box as `x_min,y_min,x_max,y_max`.
	///
	/// ```
	/// use tilelink_core::GeoBBox;
	///
	/// let bbox = GeoBBox::new(-10.0, -5.0, 10.0, 5.5).unwrap();
	/// assert_eq!(bbox.as_string_list(), "-10,-5,10,5.5");
	/// ```
	#[must_use]
	pub fn as_string_list(&self) -> String {
		format!("{},{},{},{}", self.x_min, self.y_min, self.x_max, self.y_max)
	}

	/// Parses `west,south,east,north`, the inverse of [`as_string_list`](Self::as_string_list).
	#[context("Failed to parse bounding box '{text}'")]
	pub fn from_string_list(text: &str) -> Result<GeoBBox> {
		let values = text
			.split(',')
			.map(|v| v.trim().parse::<f64>())
			.collect::<Result<Vec<f64>, _>>()?;
		GeoBBox::try_from(values)
	}

	/// Expands the bounding box in place so that it also covers `other`.
	pub fn extend(&mut self, other: &GeoBBox) {
		self.x_min = self.x_min.min(other.x_min);
		self.y_min = self.y_min.min(other.y_min);
		self.x_max = self.x_max.max(other.x_max);
		self.y_max = self.y_max.max(other.y_max);
	}

	#[must_use]
	pub fn extended(mut self, other: &GeoBBox) -> GeoBBox {
		self.extend(other);
		self
	}

	/// Axis-aligned overlap test. Boxes that only share an edge do not overlap.
	#[must_use]
	pub fn overlaps(&self, other: &GeoBBox) -> bool {
		self.x_min < other.x_max && other.x_min < self.x_max && self.y_min < other.y_max && other.y_min < self.y_max
	}

	/// Whether the point lies inside or on the border of the box.
	#[must_use]
	pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
		lon >= self.x_min && lon <= self.x_max && lat >= self.y_min && lat <= self.y_max
	}

	fn checked(self) -> Result<Self> {
		ensure!(self.x_min >= -180., "x_min ({}) must be >= -180", self.x_min);
		ensure!(self.y_min >= -90., "y_min ({}) must be >= -90", self.y_min);
		ensure!(self.x_max <= 180., "x_max ({}) must be <= 180", self.x_max);
		ensure!(self.y_max <= 90., "y_max ({}) must be <= 90", self.y_max);
		ensure!(
			self.x_min < self.x_max,
			"x_min ({}) must be < x_max ({})",
			self.x_min,
			self.x_max
		);
		ensure!(
			self.y_min < self.y_max,
			"y_min ({}) must be < y_max ({})",
			self.y_min,
			self.y_max
		);
		Ok(self)
	}
}

impl Debug for GeoBBox {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"GeoBBox({}, {}, {}, {})",
			self.x_min, self.y_min, self.x_max, self.y_max
		)
	}
}

impl Display for GeoBBox {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{}]", self.as_string_list())
	}
}

impl TryFrom<Vec<f64>> for GeoBBox {
	type Error = anyhow::Error;

	#[context("Failed to convert {input:?} to GeoBBox")]
	fn try_from(input: Vec<f64>) -> Result<Self> {
		ensure!(
			input.len() == 4,
			"GeoBBox must have 4 elements (west, south, east, north), got {}",
			input.len()
		);
		GeoBBox::new(input[0], input[1], input[2], input[3])
	}
}

impl TryFrom<[f64; 4]> for GeoBBox {
	type Error = anyhow::Error;

	fn try_from(input: [f64; 4]) -> Result<Self> {
		GeoBBox::new(input[0], input[1], input[2], input[3])
	}
}

impl From<GeoBBox> for [f64; 4] {
	fn from(bbox: GeoBBox) -> Self {
		bbox.as_array()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[test]
	fn creation() {
		let bbox = GeoBBox::new(-10.0, -5.0, 10.0, 5.0).unwrap();
		assert_eq!(bbox.as_tuple(), (-10.0, -5.0, 10.0, 5.0));
	}

	#[rstest]
	#[case(-190.0, -5.0, 10.0, 5.0)]
	#[case(-10.0, -5.0, 190.0, 5.0)]
	#[case(-10.0, -95.0, 10.0, 5.0)]
	#[case(-10.0, -5.0, 10.0, 95.0)]
	#[case(10.0, -5.0, -10.0, 5.0)]
	#[case(-10.0, 6.0, 10.0, 5.0)]
	#[case(10.0, -5.0, 10.0, 5.0)]
	#[case(-10.0, 5.0, 10.0, 5.0)]
	#[case(f64::NAN, -5.0, 10.0, 5.0)]
	fn invalid_boxes_are_rejected(#[case] w: f64, #[case] s: f64, #[case] e: f64, #[case] n: f64) {
		assert!(GeoBBox::new(w, s, e, n).is_err());
	}

	#[test]
	fn try_from_vec() -> Result<()> {
		let bbox = GeoBBox::try_from(vec![-10.0, -5.0, 10.0, 5.0])?;
		assert_eq!(bbox.as_array(), [-10.0, -5.0, 10.0, 5.0]);

		let err = GeoBBox::try_from(vec![-10.0, -5.0, 10.0]).unwrap_err();
		assert!(format!("{err:#}").contains("must have 4 elements"));
		Ok(())
	}

	#[test]
	fn from_option_vec() -> Result<()> {
		assert!(GeoBBox::from_option_vec(Some(vec![1.0, 2.0, 3.0, 4.0]))?.is_some());
		assert!(GeoBBox::from_option_vec(None)?.is_none());
		Ok(())
	}

	#[test]
	fn string_list_round_trip() -> Result<()> {
		let bbox = GeoBBox::from_string_list("13.08, 52.33, 13.76, 52.67")?;
		assert_eq!(bbox.as_string_list(), "13.08,52.33,13.76,52.67");
		assert!(GeoBBox::from_string_list("1,2,three,4").is_err());
		Ok(())
	}

	#[test]
	fn extend() {
		let bbox1 = GeoBBox::new(-10.0, -5.0, 10.0, 5.0).unwrap();
		let bbox2 = GeoBBox::new(-12.0, -3.0, 8.0, 6.0).unwrap();
		assert_eq!(bbox1.extended(&bbox2).as_tuple(), (-12.0, -5.0, 10.0, 6.0));
	}

	#[rstest]
	#[case([0.0, 0.0, 10.0, 10.0], [5.0, 5.0, 15.0, 15.0], true)]
	#[case([0.0, 0.0, 10.0, 10.0], [2.0, 2.0, 3.0, 3.0], true)]
	#[case([0.0, 0.0, 10.0, 10.0], [10.0, 0.0, 20.0, 10.0], false)]
	#[case([0.0, 0.0, 10.0, 10.0], [0.0, 10.0, 10.0, 20.0], false)]
	#[case([0.0, 0.0, 10.0, 10.0], [-20.0, -20.0, -10.0, -10.0], false)]
	fn overlaps(#[case] a: [f64; 4], #[case] b: [f64; 4], #[case] expected: bool) {
		let a = GeoBBox::try_from(a).unwrap();
		let b = GeoBBox::try_from(b).unwrap();
		assert_eq!(a.overlaps(&b), expected);
		assert_eq!(b.overlaps(&a), expected);
	}

	#[test]
	fn limit_to_mercator() {
		let mut bbox = GeoBBox::new(-180.0, -90.0, 180.0, 90.0).unwrap();
		bbox.limit_to_mercator();
		assert_eq!(bbox, GeoBBox::mercator_world());
	}

	#[test]
	fn serde_as_array() -> Result<()> {
		let bbox: GeoBBox = serde_json::from_str("[-10, -5, 10, 5.5]")?;
		assert_eq!(bbox.as_array(), [-10.0, -5.0, 10.0, 5.5]);
		assert_eq!(serde_json::to_string(&bbox)?, "[-10.0,-5.0,10.0,5.5]");
		assert!(serde_json::from_str::<GeoBBox>("[10, -5, -10, 5]").is_err());
		Ok(())
	}

	#[test]
	fn debug_and_display() {
		let bbox = GeoBBox::new(-10.0, -5.0, 10.0, 5.0).unwrap();
		assert_eq!(format!("{bbox:?}"), "GeoBBox(-10, -5, 10, 5)");
		assert_eq!(bbox.to_string(), "[-10,-5,10,5]");
	}
}
