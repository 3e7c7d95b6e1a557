//! XYZ tile URL templates.
//!
//! A template contains exactly one `{z}`, one `{x}` and one `{y}`. Signing services only
//! sign concrete URLs, so [`SampleTileUrl`] turns a template into a concrete `0/0/0` URL and
//! puts the placeholders back into whatever the signer returns.

use crate::{
	GeoBBox, TileCoord,
	mercator::{bbox_to_tile_range, tiles_overlap_bbox},
};
use anyhow::{Result, ensure};
use regex::Regex;
use std::sync::LazyLock;

pub const PLACEHOLDERS: [&str; 3] = ["{z}", "{x}", "{y}"];

static RE_LITERAL_TRIPLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/0/0/0\b").unwrap());
static RE_ENCODED_TRIPLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)%2F0%2F0%2F0\b").unwrap());

/// How often `{z}`, `{x}` and `{y}` occur in `template`.
#[must_use]
pub fn placeholder_counts(template: &str) -> [usize; 3] {
	PLACEHOLDERS.map(|p| template.matches(p).count())
}

/// Whether `template` contains every placeholder exactly once.
#[must_use]
pub fn has_placeholders(template: &str) -> bool {
	placeholder_counts(template) == [1, 1, 1]
}

/// Substitutes a tile coordinate into a template.
///
/// ```
/// use tilelink_core::{TileCoord, template::build_tile_url};
///
/// let coord = TileCoord::new(3, 5, 7).unwrap();
/// assert_eq!(build_tile_url("https://example.com/{z}/{x}/{y}.png", &coord), "https://example.com/3/5/7.png");
/// ```
#[must_use]
pub fn build_tile_url(template: &str, coord: &TileCoord) -> String {
	template
		.replace("{z}", &coord.level.to_string())
		.replace("{x}", &coord.x.to_string())
		.replace("{y}", &coord.y.to_string())
}

/// The first value of query parameter `key`, decoded.
///
/// ```
/// use tilelink_core::template::query_value;
///
/// let url = "https://t.example/item/tilejson.json?collection=sentinel-2-l2a&item=abc";
/// assert_eq!(query_value(url, "collection").as_deref(), Some("sentinel-2-l2a"));
/// assert_eq!(query_value(url, "assets"), None);
/// ```
#[must_use]
pub fn query_value(url: &str, key: &str) -> Option<String> {
	let query = url.split('#').next()?.split_once('?')?.1;
	url::form_urlencoded::parse(query.as_bytes())
		.find(|(k, _)| k == key)
		.map(|(_, v)| v.into_owned())
}

/// Concrete tile URLs covering `bbox` at `zoom`, in row-major order.
///
/// Tiles of the covering range that only touch the box are left out. Fails when more than
/// `max_count` tiles would be produced.
///
/// ```
/// use tilelink_core::{GeoBBox, template::covering_tile_urls};
///
/// let bbox = GeoBBox::new(-10.0, -10.0, 10.0, 10.0).unwrap();
/// let tiles = covering_tile_urls("https://t.example/{z}/{x}/{y}.png", &bbox, 1, 16).unwrap();
/// assert_eq!(tiles.len(), 4);
/// assert_eq!(tiles[0].1, "https://t.example/1/0/0.png");
/// ```
pub fn covering_tile_urls(template: &str, bbox: &GeoBBox, zoom: u8, max_count: u64) -> Result<Vec<(TileCoord, String)>> {
	ensure!(has_placeholders(template), "'{template}' is not a {{z}}/{{x}}/{{y}} template");
	let range = bbox_to_tile_range(bbox, zoom);
	ensure!(
		range.count() <= max_count,
		"{range:?} covers {} tiles, more than the limit of {max_count}",
		range.count()
	);
	Ok(range
		.iter_coords()
		.filter(|coord| tiles_overlap_bbox(&coord.bounds_array(), bbox))
		.map(|coord| (coord, build_tile_url(template, &coord)))
		.collect())
}

/// A concrete `0/0/0` URL standing in for a template while it is being signed.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleTileUrl {
	url: String,
	order: [&'static str; 3],
}

impl SampleTileUrl {
	/// Prepares `template` for signing.
	///
	/// Returns `None` unless the placeholders form one `/{a}/{b}/{c}` path run (in any order)
	/// that can be found again unambiguously after signing.
	#[must_use]
	pub fn from_template(template: &str) -> Option<SampleTileUrl> {
		if !has_placeholders(template) {
			return None;
		}

		let [z, x, y] = PLACEHOLDERS;
		let orders = [[z, x, y], [z, y, x], [x, y, z], [x, z, y], [y, x, z], [y, z, x]];
		let (order, start) = orders.iter().find_map(|order| {
			let run = format!("/{}", order.join("/"));
			template.find(&run).map(|start| (*order, start))
		})?;

		let run = format!("/{}", order.join("/"));
		let url = format!("{}/0/0/0{}", &template[..start], &template[start + run.len()..]);

		let first = RE_LITERAL_TRIPLE.find(&url)?;
		if first.start() != start || RE_LITERAL_TRIPLE.find_iter(&url).count() != 1 || RE_ENCODED_TRIPLE.is_match(&url) {
			return None;
		}

		Some(SampleTileUrl { url, order })
	}

	/// The concrete URL to send to the signer.
	#[must_use]
	pub fn url(&self) -> &str {
		&self.url
	}

	/// Puts the placeholders back into a signed sample URL.
	///
	/// The literal `/0/0/0` form is tried first, then the URL-encoded `%2F0%2F0%2F0` form
	/// (either case). Returns `None` if neither survived signing.
	///
	/// ```
	/// use tilelink_core::template::SampleTileUrl;
	///
	/// let sample = SampleTileUrl::from_template("https://t.example/{z}/{x}/{y}.png").unwrap();
	/// assert_eq!(sample.url(), "https://t.example/0/0/0.png");
	/// assert_eq!(
	///     sample.restore("https://t.example/0/0/0.png?sig=abc").unwrap(),
	///     "https://t.example/{z}/{x}/{y}.png?sig=abc"
	/// );
	/// ```
	#[must_use]
	pub fn restore(&self, signed: &str) -> Option<String> {
		let [a, b, c] = self.order;
		let restored = if let Some(m) = RE_LITERAL_TRIPLE.find(signed) {
			format!("{}/{a}/{b}/{c}{}", &signed[..m.start()], &signed[m.end()..])
		} else if let Some(m) = RE_ENCODED_TRIPLE.find(signed) {
			let sep = &m.as_str()[..3];
			format!("{}{sep}{a}{sep}{b}{sep}{c}{}", &signed[..m.start()], &signed[m.end()..])
		} else {
			return None;
		};

		has_placeholders(&restored).then_some(restored)
	}
}
