//! The subset of TileJSON the pipeline needs.
//!
//! Parsing is strict: a body that is not a JSON object with a `tiles` array of strings is
//! rejected as [`TileJsonError::InvalidShape`], while a well-formed document whose `tiles` array is
//! empty is reported separately as [`TileJsonError::EmptyTiles`], since some providers answer with
//! metadata only.
//!
//! ```
//! use tilelink_core::tilejson::TileJsonDocument;
//!
//! let doc = TileJsonDocument::parse(r#"{"tilejson":"2.2.0","tiles":["https://t.example/{z}/{x}/{y}.png"],"maxzoom":18}"#).unwrap();
//! assert_eq!(doc.first_template(), "https://t.example/{z}/{x}/{y}.png");
//! assert_eq!(doc.max_zoom, Some(18));
//! ```

use crate::{GeoBBox, MAX_ZOOM, template};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// TileJSON version assumed when a document does not state one.
pub const DEFAULT_TILEJSON_VERSION: &str = "3.0.0";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TileJsonError {
	#[error("bad TileJSON response shape: {0}")]
	InvalidShape(String),
	#[error("TileJSON 'tiles' array is empty")]
	EmptyTiles,
	#[error("tile template '{0}' must contain exactly one {{z}}, {{x}} and {{y}}")]
	InvalidTemplate(String),
}

#[derive(Deserialize)]
struct RawTileJson {
	tilejson: Option<String>,
	tiles: Vec<String>,
	bounds: Option<Vec<f64>>,
	minzoom: Option<u8>,
	maxzoom: Option<u8>,
	name: Option<String>,
	description: Option<String>,
	attribution: Option<String>,
}

/// A validated TileJSON document.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TileJsonDocument {
	pub tilejson: String,
	/// Never empty; every entry passed [`template::has_placeholders`]. Private so that
	/// [`TileJsonDocument::parse`] stays the only constructor.
	tiles: Vec<String>,
	pub bounds: Option<GeoBBox>,
	pub min_zoom: Option<u8>,
	pub max_zoom: Option<u8>,
	pub name: Option<String>,
	pub description: Option<String>,
	pub attribution: Option<String>,
}

impl TileJsonDocument {
	/// Parses and validates a TileJSON body.
	///
	/// Bounds that are not a valid `[west, south, east, north]` box (for example boxes crossing
	/// the antimeridian) are dropped with a warning; the tiles stay usable without them.
	pub fn parse(body: &str) -> Result<TileJsonDocument, TileJsonError> {
		let raw: RawTileJson = serde_json::from_str(body).map_err(|e| TileJsonError::InvalidShape(e.to_string()))?;

		if raw.tiles.is_empty() {
			return Err(TileJsonError::EmptyTiles);
		}
		if let Some(bad) = raw.tiles.iter().find(|t| !template::has_placeholders(t)) {
			return Err(TileJsonError::InvalidTemplate(bad.clone()));
		}
		if let Some(zoom) = [raw.minzoom, raw.maxzoom].into_iter().flatten().find(|z| *z > MAX_ZOOM) {
			return Err(TileJsonError::InvalidShape(format!(
				"zoom level {zoom} is deeper than the supported maximum of {MAX_ZOOM}"
			)));
		}
		if let (Some(min), Some(max)) = (raw.minzoom, raw.maxzoom) {
			if min > max {
				return Err(TileJsonError::InvalidShape(format!(
					"minzoom ({min}) is greater than maxzoom ({max})"
				)));
			}
		}

		let bounds = match GeoBBox::from_option_vec(raw.bounds) {
			Ok(bounds) => bounds,
			Err(err) => {
				log::warn!("ignoring TileJSON bounds: {err:#}");
				None
			}
		};

		Ok(TileJsonDocument {
			tilejson: raw.tilejson.unwrap_or_else(|| DEFAULT_TILEJSON_VERSION.to_string()),
			tiles: raw.tiles,
			bounds,
			min_zoom: raw.minzoom,
			max_zoom: raw.maxzoom,
			name: raw.name,
			description: raw.description,
			attribution: raw.attribution,
		})
	}

	/// All tile templates, in document order. Never empty.
	#[must_use]
	pub fn tiles(&self) -> &[String] {
		&self.tiles
	}

	/// The template the pipeline renders from.
	#[must_use]
	pub fn first_template(&self) -> &str {
		&self.tiles[0]
	}
}
