//! Render plans built against a local mock provider.

mod test_utilities;

use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};
use test_utilities::*;
use tilelink::{
	config::Config,
	plan::{PlanKind, RenderPlanBuilder, ResultSet},
};
use tilelink_core::quality::EstimatedQuality;
use tokio_util::sync::CancellationToken;

fn builder(config: &Config) -> RenderPlanBuilder {
	RenderPlanBuilder::from_config(config).unwrap()
}

fn mosaic(mock: &MockServer, ids: &[&str]) -> ResultSet {
	let items: Vec<String> = ids
		.iter()
		.map(|id| format!(r#"{{"id":"{id}","bbox":[5.0,45.0,6.0,46.0]}}"#))
		.collect();
	let tiles: Vec<String> = ids
		.iter()
		.map(|id| {
			format!(
				r#"{{"item_id":"{id}","tilejson_url":"{}"}}"#,
				mock.url(&format!("/items/{id}/tilejson.json"))
			)
		})
		.collect();
	ResultSet::from_json(&format!(
		r#"{{"collection":"sentinel-2-l2a","items":[{}],"item_tiles":[{}]}}"#,
		items.join(","),
		tiles.join(",")
	))
	.unwrap()
}

fn item_ids(tiles: &[tilelink::plan::PlannedTile]) -> Vec<&str> {
	tiles.iter().map(|t| t.descriptor.item_id.as_str()).collect()
}

#[tokio::test]
async fn multi_tile_partial_success() {
	let mock = MockServer::start().await;
	let result_set = mosaic(&mock, &["1", "2", "3"]);

	let built = builder(&mock.config())
		.build_multi(&result_set, &CancellationToken::new())
		.await;

	assert_eq!(item_ids(&built.tiles), vec!["1", "3"]);
	assert_eq!(built.failures.len(), 1);
	assert_eq!(built.failures[0].item_id, "2");
	assert!(built.failures[0].error.starts_with("HTTP 404"), "{}", built.failures[0].error);

	let tile = &built.tiles[0].descriptor;
	assert!(tile.is_multi_tile);
	assert_eq!(tile.collection, "sentinel-2-l2a");
	assert_eq!(tile.tile_url_template, "https://provider.example/1/{z}/{x}/{y}.png?sig=TEST");
	assert_eq!(tile.bounds.as_array(), [5.0, 45.0, 6.0, 46.0]);
	assert_eq!((tile.min_zoom, tile.max_zoom), (Some(2), Some(16)));
	assert!(built.tiles[0].quality.has_auth_token);
}

#[tokio::test]
async fn output_keeps_input_order() {
	let mock = MockServer::start().await;
	let result_set = mosaic(&mock, &["late", "1", "3"]);

	let built = builder(&mock.config())
		.build_multi(&result_set, &CancellationToken::new())
		.await;
	assert_eq!(item_ids(&built.tiles), vec!["late", "1", "3"]);
}

#[tokio::test]
async fn timeout_does_not_cancel_siblings() {
	let mock = MockServer::start().await;
	let mut config = mock.config();
	config.http.timeout_ms = 300;
	let result_set = mosaic(&mock, &["1", "slow", "3"]);

	let plan = builder(&config).build(&result_set, &CancellationToken::new()).await;
	assert_eq!(plan.kind, PlanKind::Multi);
	assert_eq!(item_ids(&plan.tiles), vec!["1", "3"]);
	assert_eq!(plan.failures[0].item_id, "slow");
	assert!(plan.failures[0].error.contains("timed out"), "{}", plan.failures[0].error);
	assert_eq!(plan.warnings.len(), 1);
}

#[tokio::test]
async fn cancellation_aborts_the_batch() {
	let mock = MockServer::start().await;
	let result_set = mosaic(&mock, &["slow", "slow"]);
	let cancel = CancellationToken::new();

	let trigger = cancel.clone();
	tokio::spawn(async move {
		tokio::time::sleep(Duration::from_millis(150)).await;
		trigger.cancel();
	});

	let start = Instant::now();
	let built = builder(&mock.config()).build_multi(&result_set, &cancel).await;
	assert!(built.tiles.is_empty());
	assert_eq!(built.failures.len(), 2);
	assert!(built.failures.iter().all(|f| f.error.contains("cancelled")));
	assert!(start.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn single_tile_from_tilejson() {
	let mock = MockServer::start().await;
	let result_set = ResultSet::from_json(&format!(
		r#"{{"collection":"sentinel-2-l2a","items":[{{"id":"S2A_1","bbox":[5.0,45.0,6.0,46.0]}}],"tilejson_url":"{}","tile_url":"https://provider.example/raw/{{z}}/{{x}}/{{y}}.png"}}"#,
		mock.url("/open/tilejson.json")
	))
	.unwrap();

	let plan = builder(&mock.config()).build(&result_set, &CancellationToken::new()).await;
	assert_eq!(plan.kind, PlanKind::Single);
	assert_eq!(plan.tiles.len(), 1);
	assert!(plan.failures.is_empty());

	let tile = &plan.tiles[0];
	assert_eq!(tile.descriptor.item_id, "S2A_1");
	assert!(!tile.descriptor.is_multi_tile);
	assert_eq!(
		tile.descriptor.tile_url_template,
		"https://provider.example/tiles/{z}/{x}/{y}.png?collection=sentinel-2-l2a&sig=TEST"
	);
	assert_eq!(tile.descriptor.max_zoom, Some(16));
	assert_eq!(tile.quality.estimated_quality, EstimatedQuality::Standard);
	assert!(tile.quality.has_auth_token);
}

#[tokio::test]
async fn single_tile_falls_back_to_raw_url() {
	let mock = MockServer::start().await;
	let result_set = ResultSet::from_json(&format!(
		r#"{{"collection":"naip","bbox":[5.0,45.0,6.0,46.0],"tilejson_url":"{}","tile_url":"https://provider.example/raw/{{z}}/{{x}}/{{y}}.png?assets=red&assets=green&assets=blue"}}"#,
		mock.url("/items/2/tilejson.json")
	))
	.unwrap();

	let plan = builder(&mock.config()).build(&result_set, &CancellationToken::new()).await;
	assert_eq!(plan.kind, PlanKind::Single);
	assert_eq!(
		plan.tiles[0].descriptor.tile_url_template,
		"https://provider.example/raw/{z}/{x}/{y}.png?assets=image&sig=TEST"
	);
	assert_eq!(plan.tiles[0].descriptor.item_id, "naip");
	assert_eq!(plan.tiles[0].descriptor.min_zoom, None);
	assert_eq!(plan.failures.len(), 1);
	assert!(plan.warnings[0].contains("falling back to the raw tile URL"));
}

#[tokio::test]
async fn requested_assets_are_sent_corrected() {
	let mock = MockServer::start().await;
	let result_set = ResultSet::from_json(&format!(
		r#"{{"collection":"sentinel-2-l2a","bbox":[5.0,45.0,6.0,46.0],"assets":["red","green","blue"],"tilejson_url":"{}"}}"#,
		mock.url("/assets/tilejson.json")
	))
	.unwrap();

	let tile = builder(&mock.config())
		.build_single(&result_set, &CancellationToken::new())
		.await
		.unwrap();
	assert_eq!(
		tile.descriptor.tile_url_template,
		"https://provider.example/{z}/{x}/{y}.png?assets=visual&nodata=0&sig=TEST"
	);
}

#[tokio::test]
async fn missing_bbox_is_a_warning() {
	let mock = MockServer::start().await;
	let result_set = ResultSet::from_json(&format!(
		r#"{{"collection":"sentinel-2-l2a","tilejson_url":"{}"}}"#,
		mock.url("/open/tilejson.json")
	))
	.unwrap();
	let builder = builder(&mock.config());
	let cancel = CancellationToken::new();

	assert_eq!(builder.build_single(&result_set, &cancel).await, None);

	let plan = builder.build(&result_set, &cancel).await;
	assert_eq!(plan.kind, PlanKind::Empty);
	assert!(plan.tiles.is_empty());
	assert_eq!(plan.warnings.len(), 1);
	assert!(plan.warnings[0].contains("no bounding box"));
	assert_eq!(mock.tilejson_calls(), 0);
}

#[tokio::test]
async fn empty_result_set() {
	let mock = MockServer::start().await;
	let plan = builder(&mock.config())
		.build(&ResultSet::default(), &CancellationToken::new())
		.await;
	assert_eq!(plan.kind, PlanKind::Empty);
	assert!(plan.tiles.is_empty() && plan.warnings.is_empty() && plan.failures.is_empty());
}
