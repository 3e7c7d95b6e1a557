//! A local stand-in for the signing service and the TileJSON endpoints.
//!
//! Signing endpoints (selected through `signing.base_url`):
//! - `{base}/api/sas/v1/sign` appends `sig=TEST` to the URL,
//! - `{base}/broken/sign` answers HTTP 500,
//! - `{base}/incomplete/sign` answers 200 without `signed_url`,
//! - `{base}/proxy/sign` wraps the URL, encoded, into a proxy URL.
//!
//! TileJSON endpoints:
//! - `/item/tilejson.json` requires `sig=TEST`,
//! - `/open/tilejson.json` needs no signature,
//! - `/items/{id}/tilejson.json` answers 404 for id `2` and sleeps for ids `slow` and `late`,
//! - `/slow/tilejson.json`, `/empty/tilejson.json`, `/bad/tilejson.json`,
//! - `/assets/tilejson.json` rejects requests still asking for `red`.
#![allow(dead_code)]

use axum::{
	Json, Router,
	extract::{Path, RawQuery, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
use tilelink::{config::Config, resolver::TileJsonResolver};
use tokio::{net::TcpListener, time::sleep};

pub const SCENARIO_TEMPLATE: &str = "https://provider.example/tiles/{z}/{x}/{y}.png?collection=sentinel-2-l2a";

#[derive(Clone, Default)]
struct MockState {
	sign_calls: Arc<AtomicUsize>,
	tilejson_calls: Arc<AtomicUsize>,
}

pub struct MockServer {
	pub base: String,
	state: MockState,
}

impl MockServer {
	pub async fn start() -> MockServer {
		let state = MockState::default();
		let router = Router::new()
			.route("/api/sas/v1/sign", post(sign_append))
			.route("/broken/sign", post(sign_broken))
			.route("/incomplete/sign", post(sign_incomplete))
			.route("/proxy/sign", post(sign_proxy))
			.route("/item/tilejson.json", get(item_tilejson))
			.route("/open/tilejson.json", get(open_tilejson))
			.route("/items/{id}/tilejson.json", get(items_tilejson))
			.route("/slow/tilejson.json", get(slow_tilejson))
			.route("/empty/tilejson.json", get(empty_tilejson))
			.route("/bad/tilejson.json", get(bad_tilejson))
			.route("/assets/tilejson.json", get(assets_tilejson))
			.with_state(state.clone());

		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, router).await.unwrap();
		});

		MockServer {
			base: format!("http://{addr}"),
			state,
		}
	}

	pub fn url(&self, path: &str) -> String {
		format!("{}{path}", self.base)
	}

	/// A config pointing at the appending signer, without retries.
	pub fn config(&self) -> Config {
		self.config_with_signer("/api/sas/v1")
	}

	pub fn config_with_signer(&self, signer: &str) -> Config {
		let mut config = Config::default();
		config.signing.base_url = self.url(signer);
		config.http.max_retries = 0;
		config
	}

	pub fn resolver(&self, config: &Config) -> TileJsonResolver {
		TileJsonResolver::from_config(config).unwrap()
	}

	pub fn sign_calls(&self) -> usize {
		self.state.sign_calls.load(Ordering::SeqCst)
	}

	pub fn tilejson_calls(&self) -> usize {
		self.state.tilejson_calls.load(Ordering::SeqCst)
	}
}

#[derive(Deserialize)]
struct SignBody {
	url: String,
}

async fn sign_append(State(state): State<MockState>, Json(body): Json<SignBody>) -> Json<serde_json::Value> {
	state.sign_calls.fetch_add(1, Ordering::SeqCst);
	let sep = if body.url.contains('?') { '&' } else { '?' };
	Json(json!({ "signed_url": format!("{}{sep}sig=TEST", body.url), "authenticated": true }))
}

async fn sign_broken(State(state): State<MockState>) -> StatusCode {
	state.sign_calls.fetch_add(1, Ordering::SeqCst);
	StatusCode::INTERNAL_SERVER_ERROR
}

async fn sign_incomplete(State(state): State<MockState>) -> Json<serde_json::Value> {
	state.sign_calls.fetch_add(1, Ordering::SeqCst);
	Json(json!({ "authenticated": false }))
}

async fn sign_proxy(State(state): State<MockState>, Json(body): Json<SignBody>) -> Json<serde_json::Value> {
	state.sign_calls.fetch_add(1, Ordering::SeqCst);
	let encoded: String = url::form_urlencoded::byte_serialize(body.url.as_bytes()).collect();
	Json(json!({ "signed_url": format!("https://proxy.example/fetch?u={encoded}&sig=TEST") }))
}

fn tilejson(tiles: &[&str]) -> Json<serde_json::Value> {
	Json(json!({
		"tilejson": "3.0.0",
		"tiles": tiles,
		"bounds": [5.9, 45.8, 10.5, 47.8],
		"minzoom": 2,
		"maxzoom": 16
	}))
}

async fn item_tilejson(State(state): State<MockState>, RawQuery(query): RawQuery) -> Response {
	state.tilejson_calls.fetch_add(1, Ordering::SeqCst);
	if query.unwrap_or_default().contains("sig=TEST") {
		tilejson(&[SCENARIO_TEMPLATE]).into_response()
	} else {
		StatusCode::FORBIDDEN.into_response()
	}
}

async fn open_tilejson(State(state): State<MockState>) -> Json<serde_json::Value> {
	state.tilejson_calls.fetch_add(1, Ordering::SeqCst);
	tilejson(&[SCENARIO_TEMPLATE])
}

async fn items_tilejson(State(state): State<MockState>, Path(id): Path<String>) -> Response {
	state.tilejson_calls.fetch_add(1, Ordering::SeqCst);
	match id.as_str() {
		"2" => return StatusCode::NOT_FOUND.into_response(),
		"slow" => sleep(Duration::from_secs(5)).await,
		"late" => sleep(Duration::from_millis(300)).await,
		_ => {}
	}
	let template = format!("https://provider.example/{id}/{{z}}/{{x}}/{{y}}.png");
	tilejson(&[template.as_str()]).into_response()
}

async fn slow_tilejson(State(state): State<MockState>) -> Json<serde_json::Value> {
	state.tilejson_calls.fetch_add(1, Ordering::SeqCst);
	sleep(Duration::from_secs(5)).await;
	tilejson(&[SCENARIO_TEMPLATE])
}

async fn empty_tilejson() -> Json<serde_json::Value> {
	Json(json!({ "tilejson": "3.0.0", "tiles": [] }))
}

async fn bad_tilejson() -> &'static str {
	"<html>502 Bad Gateway</html>"
}

async fn assets_tilejson(RawQuery(query): RawQuery) -> Response {
	let query = query.unwrap_or_default();
	if query.contains("assets=red") {
		return (StatusCode::BAD_REQUEST, "uncorrected assets").into_response();
	}
	tilejson(&["https://provider.example/{z}/{x}/{y}.png?assets=red&assets=green&assets=blue&nodata=0"]).into_response()
}
