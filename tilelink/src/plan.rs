//! Turns a STAC-like result set into the tiles a map should draw.
//!
//! A result set is classified once:
//!
//! - [`PlanKind::Multi`] when it lists per-item tile sources; every item is resolved on its own
//!   and failures only drop that item,
//! - [`PlanKind::Single`] when it carries one TileJSON or tile URL and a bounding box,
//! - [`PlanKind::Empty`] otherwise.

use crate::{
	config::Config,
	resolver::{ResolveOptions, TileJsonResolver},
};
use anyhow::Result;
use futures::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};
use tilelink_core::{
	GeoBBox, MAX_ZOOM, TileCoord,
	assets::{correct_url_assets, with_requested_assets},
	quality::{TileUrlQualityReport, analyze},
	template::{covering_tile_urls, has_placeholders},
};
use tilelink_derive::context;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct StacItem {
	pub id: String,
	#[serde(default)]
	pub bbox: Option<GeoBBox>,
	#[serde(default)]
	pub datetime: Option<String>,
	/// Overrides the result set's collection for this item.
	#[serde(default)]
	pub collection: Option<String>,
}

/// The tile source of one item in a mosaic.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ItemTiles {
	pub item_id: String,
	pub tilejson_url: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ResultSet {
	#[serde(default)]
	pub collection: Option<String>,
	#[serde(default)]
	pub items: Vec<StacItem>,
	#[serde(default)]
	pub bbox: Option<GeoBBox>,
	#[serde(default)]
	pub tilejson_url: Option<String>,
	/// A pre-resolved `{z}/{x}/{y}` template, used when there is no TileJSON or it fails.
	#[serde(default)]
	pub tile_url: Option<String>,
	/// Requested assets, added to TileJSON URLs that do not name their own.
	#[serde(default)]
	pub assets: Vec<String>,
	#[serde(default)]
	pub item_tiles: Vec<ItemTiles>,
}

impl ResultSet {
	#[context("parsing result set")]
	pub fn from_json(text: &str) -> Result<ResultSet> {
		Ok(serde_json::from_str(text)?)
	}

	#[context("reading result set '{}'", path.display())]
	pub fn from_path(path: &Path) -> Result<ResultSet> {
		Ok(serde_json::from_reader(BufReader::new(File::open(path)?))?)
	}

	/// The result set's own bbox, or the bbox of its only item.
	pub fn resolve_bbox(&self) -> Option<GeoBBox> {
		self.bbox.or_else(|| match self.items.as_slice() {
			[item] => item.bbox,
			_ => None,
		})
	}

	fn item(&self, id: &str) -> Option<&StacItem> {
		self.items.iter().find(|item| item.id == id)
	}

	fn collection_of(&self, item: Option<&StacItem>) -> Option<String> {
		item.and_then(|i| i.collection.clone()).or_else(|| self.collection.clone())
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanKind {
	Empty,
	Single,
	Multi,
}

/// What the map engine needs to draw one item.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderTileDescriptor {
	pub item_id: String,
	pub collection: String,
	pub tile_url_template: String,
	pub bounds: GeoBBox,
	pub is_multi_tile: bool,
	pub min_zoom: Option<u8>,
	pub max_zoom: Option<u8>,
}

impl RenderTileDescriptor {
	/// Concrete tile URLs covering the descriptor's bounds.
	///
	/// `zoom` is limited to the descriptor's zoom range, and never deeper than [`MAX_ZOOM`].
	pub fn covering_tiles(&self, zoom: u8, max_count: u64) -> Result<Vec<(TileCoord, String)>> {
		let max = self.max_zoom.unwrap_or(MAX_ZOOM).min(MAX_ZOOM);
		let min = self.min_zoom.unwrap_or(0).min(max);
		let zoom = zoom.clamp(min, max);
		covering_tile_urls(&self.tile_url_template, &self.bounds, zoom, max_count)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlannedTile {
	pub descriptor: RenderTileDescriptor,
	pub quality: TileUrlQualityReport,
}

impl PlannedTile {
	fn new(descriptor: RenderTileDescriptor) -> PlannedTile {
		let quality = analyze(&descriptor.tile_url_template);
		quality.log(&descriptor.item_id);
		PlannedTile { descriptor, quality }
	}
}

/// An item that could not be placed on the map.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ItemFailure {
	pub item_id: String,
	pub error: String,
}

impl ItemFailure {
	fn new(item_id: &str, error: impl ToString) -> ItemFailure {
		let failure = ItemFailure {
			item_id: item_id.to_string(),
			error: error.to_string(),
		};
		log::warn!("item '{}' omitted: {}", failure.item_id, failure.error);
		failure
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MultiBuild {
	pub tiles: Vec<PlannedTile>,
	pub failures: Vec<ItemFailure>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderPlan {
	pub kind: PlanKind,
	pub tiles: Vec<PlannedTile>,
	pub failures: Vec<ItemFailure>,
	pub warnings: Vec<String>,
}

#[derive(Default)]
struct SingleBuild {
	tile: Option<PlannedTile>,
	failures: Vec<ItemFailure>,
	warnings: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct RenderPlanBuilder {
	resolver: TileJsonResolver,
	max_concurrent_requests: usize,
}

impl RenderPlanBuilder {
	pub fn new(resolver: TileJsonResolver, max_concurrent_requests: usize) -> RenderPlanBuilder {
		RenderPlanBuilder {
			resolver,
			max_concurrent_requests: max_concurrent_requests.max(1),
		}
	}

	pub fn from_config(config: &Config) -> Result<RenderPlanBuilder> {
		Ok(RenderPlanBuilder::new(
			TileJsonResolver::from_config(config)?,
			config.http.max_concurrent_requests,
		))
	}

	pub fn classify(result_set: &ResultSet) -> PlanKind {
		if !result_set.item_tiles.is_empty() {
			PlanKind::Multi
		} else if (result_set.tilejson_url.is_some() || result_set.tile_url.is_some())
			&& result_set.resolve_bbox().is_some()
		{
			PlanKind::Single
		} else {
			PlanKind::Empty
		}
	}

	pub async fn build(&self, result_set: &ResultSet, cancel: &CancellationToken) -> RenderPlan {
		let kind = Self::classify(result_set);
		log::debug!("result set classified as {kind:?}");

		match kind {
			PlanKind::Multi => {
				let multi = self.build_multi(result_set, cancel).await;
				let warnings = multi
					.failures
					.iter()
					.map(|f| format!("item '{}' omitted: {}", f.item_id, f.error))
					.collect();
				RenderPlan {
					kind,
					tiles: multi.tiles,
					failures: multi.failures,
					warnings,
				}
			}
			PlanKind::Single => {
				let single = self.single(result_set, cancel).await;
				RenderPlan {
					kind,
					tiles: single.tile.into_iter().collect(),
					failures: single.failures,
					warnings: single.warnings,
				}
			}
			PlanKind::Empty => {
				let mut warnings = Vec::new();
				if result_set.tilejson_url.is_some() || result_set.tile_url.is_some() {
					warnings.push(missing_bbox_warning());
					log::warn!("{}", missing_bbox_warning());
				}
				RenderPlan {
					kind,
					tiles: Vec::new(),
					failures: Vec::new(),
					warnings,
				}
			}
		}
	}

	/// Builds the tile of a single-image result set. Returns `None` when there is no bounding
	/// box or no usable template; the reasons are logged.
	pub async fn build_single(&self, result_set: &ResultSet, cancel: &CancellationToken) -> Option<PlannedTile> {
		self.single(result_set, cancel).await.tile
	}

	async fn single(&self, result_set: &ResultSet, cancel: &CancellationToken) -> SingleBuild {
		let mut build = SingleBuild::default();

		let Some(bounds) = result_set.resolve_bbox() else {
			log::warn!("{}", missing_bbox_warning());
			build.warnings.push(missing_bbox_warning());
			return build;
		};

		let first_item = result_set.items.first();
		let collection = result_set.collection_of(first_item);
		let item_id = first_item
			.map(|i| i.id.clone())
			.or_else(|| collection.clone())
			.unwrap_or_else(|| "result".to_string());

		let descriptor = |tile_url_template: String, min_zoom: Option<u8>, max_zoom: Option<u8>| {
			PlannedTile::new(RenderTileDescriptor {
				item_id: item_id.clone(),
				collection: collection.clone().unwrap_or_default(),
				tile_url_template,
				bounds,
				is_multi_tile: false,
				min_zoom,
				max_zoom,
			})
		};

		if let Some(tilejson_url) = &result_set.tilejson_url {
			let url = with_requested_assets(tilejson_url, &result_set.assets);
			let options = ResolveOptions::for_collection(collection.as_deref(), cancel);
			match self.resolver.resolve(&url, &options).await {
				Ok(resolved) => {
					build.tile = Some(descriptor(
						resolved.tile_template,
						resolved.document.min_zoom,
						resolved.document.max_zoom,
					));
					return build;
				}
				Err(err) => build.failures.push(ItemFailure::new(&item_id, &err)),
			}
		}

		if let Some(tile_url) = &result_set.tile_url {
			if !has_placeholders(tile_url) {
				build
					.failures
					.push(ItemFailure::new(&item_id, format!("'{tile_url}' is not a {{z}}/{{x}}/{{y}} template")));
				return build;
			}
			if result_set.tilejson_url.is_some() {
				build.warnings.push(format!(
					"TileJSON for '{item_id}' could not be resolved, falling back to the raw tile URL"
				));
			}
			let template = match collection.as_deref() {
				Some(c) => correct_url_assets(c, tile_url),
				None => tile_url.clone(),
			};
			let authenticator = self.resolver.authenticator();
			let template = if authenticator.should_authenticate(collection.as_deref(), Some(&template)) {
				authenticator.sign_template(&template, cancel).await.signed_url
			} else {
				template
			};
			build.tile = Some(descriptor(template, None, None));
		}

		build
	}

	/// Resolves every item of a mosaic concurrently. The tiles keep the input order; failed
	/// items are left out and listed in `failures`.
	pub async fn build_multi(&self, result_set: &ResultSet, cancel: &CancellationToken) -> MultiBuild {
		let jobs = result_set
			.item_tiles
			.iter()
			.map(|entry| self.resolve_item(result_set, entry, cancel));

		let results: Vec<Result<PlannedTile, ItemFailure>> =
			stream::iter(jobs).buffered(self.max_concurrent_requests).collect().await;

		let mut build = MultiBuild::default();
		for result in results {
			match result {
				Ok(tile) => build.tiles.push(tile),
				Err(failure) => build.failures.push(failure),
			}
		}
		log::debug!(
			"mosaic resolved: {} tiles, {} failures",
			build.tiles.len(),
			build.failures.len()
		);
		build
	}

	async fn resolve_item(
		&self,
		result_set: &ResultSet,
		entry: &ItemTiles,
		cancel: &CancellationToken,
	) -> Result<PlannedTile, ItemFailure> {
		let item = result_set.item(&entry.item_id);
		let collection = result_set.collection_of(item);
		let url = with_requested_assets(&entry.tilejson_url, &result_set.assets);
		let options = ResolveOptions::for_collection(collection.as_deref(), cancel);

		let resolved = self
			.resolver
			.resolve(&url, &options)
			.await
			.map_err(|err| ItemFailure::new(&entry.item_id, err))?;

		let Some(bounds) = item.and_then(|i| i.bbox).or(resolved.document.bounds) else {
			return Err(ItemFailure::new(&entry.item_id, "no bounding box"));
		};

		Ok(PlannedTile::new(RenderTileDescriptor {
			item_id: entry.item_id.clone(),
			collection: collection.unwrap_or_default(),
			tile_url_template: resolved.tile_template,
			bounds,
			is_multi_tile: true,
			min_zoom: resolved.document.min_zoom,
			max_zoom: resolved.document.max_zoom,
		}))
	}
}

fn missing_bbox_warning() -> String {
	"result set has no bounding box; imagery without bounds cannot be placed on the map".to_string()
}
