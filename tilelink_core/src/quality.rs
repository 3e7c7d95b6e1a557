//! Offline diagnostics for tile URL templates.
//!
//! The report is advisory. Nothing in the pipeline branches on it; it exists so that a missing
//! resolution parameter or a missing signature shows up in the logs instead of as blurry tiles.

use crate::{TileCoord, template::build_tile_url};
use regex::Regex;
use serde::Serialize;
use std::{fmt, sync::LazyLock};
use url::Url;

static RE_SCALE_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@(\d+(?:\.\d+)?)x(?:\b|$)").unwrap());

const SCALE_KEYS: [&str; 3] = ["tile_scale", "scale", "resolution"];
const AUTH_KEYS: [&str; 11] = [
	"sig",
	"se",
	"st",
	"sv",
	"sp",
	"sr",
	"skoid",
	"sktid",
	"token",
	"signature",
	"expires",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatedQuality {
	High,
	Standard,
	Unknown,
}

impl fmt::Display for EstimatedQuality {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			EstimatedQuality::High => "high",
			EstimatedQuality::Standard => "standard",
			EstimatedQuality::Unknown => "unknown",
		})
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TileUrlQualityReport {
	pub estimated_quality: EstimatedQuality,
	pub has_scale_hint: bool,
	pub has_high_res_marker: bool,
	pub has_auth_token: bool,
	/// The requested scale, from a query key or an `@Nx` path marker; the larger one when both are present.
	pub scale: Option<f64>,
	pub notes: Vec<String>,
}

impl TileUrlQualityReport {
	fn unknown(note: String) -> TileUrlQualityReport {
		TileUrlQualityReport {
			estimated_quality: EstimatedQuality::Unknown,
			has_scale_hint: false,
			has_high_res_marker: false,
			has_auth_token: false,
			scale: None,
			notes: vec![note],
		}
	}

	/// Logs the notes at debug level, prefixed with `label`.
	pub fn log(&self, label: &str) {
		log::debug!("{label}: estimated quality {}", self.estimated_quality);
		for note in &self.notes {
			log::debug!("{label}: {note}");
		}
	}
}

/// Inspects a template for resolution and authentication hints.
///
/// ```
/// use tilelink_core::quality::{EstimatedQuality, analyze};
///
/// let report = analyze("https://t.example/{z}/{x}/{y}@2x.png?assets=visual");
/// assert_eq!(report.estimated_quality, EstimatedQuality::High);
/// assert!(!report.has_auth_token);
/// ```
#[must_use]
pub fn analyze(template: &str) -> TileUrlQualityReport {
	let concrete = build_tile_url(template, &TileCoord::new_unchecked(0, 0, 0));
	let url = match Url::parse(&concrete) {
		Ok(url) => url,
		Err(err) => return TileUrlQualityReport::unknown(format!("template is not a valid URL: {err}")),
	};

	let mut query_scale: Option<f64> = None;
	let mut has_scale_key = false;
	let mut has_auth_token = false;
	for (key, value) in url.query_pairs() {
		let key = key.to_lowercase();
		if SCALE_KEYS.contains(&key.as_str()) {
			has_scale_key = true;
			query_scale = query_scale.or_else(|| value.parse::<f64>().ok().filter(|s| s.is_finite()));
		}
		if AUTH_KEYS.contains(&key.as_str()) {
			has_auth_token = true;
		}
	}

	let marker_scale = RE_SCALE_MARKER
		.captures(url.path())
		.and_then(|c| c[1].parse::<f64>().ok());
	let has_high_res_marker = marker_scale.is_some_and(|s| s >= 2.0);
	let has_scale_hint = has_scale_key || marker_scale.is_some();
	let scale = match (query_scale, marker_scale) {
		(Some(q), Some(m)) => Some(q.max(m)),
		(q, m) => q.or(m),
	};

	let estimated_quality = if scale.is_some_and(|s| s >= 2.0) {
		EstimatedQuality::High
	} else {
		EstimatedQuality::Standard
	};

	let mut notes = Vec::new();
	if let (Some(q), Some(m)) = (query_scale, marker_scale)
		&& q != m
	{
		notes.push(format!("query scale {q} and path marker @{m}x disagree; using {}", q.max(m)));
	}
	match (has_scale_hint, scale) {
		(false, _) => notes.push("no scale hint found, tiles will be standard resolution".to_string()),
		(true, None) => notes.push("scale hint present but its value is not a number".to_string()),
		(true, Some(s)) if estimated_quality == EstimatedQuality::Standard => {
			notes.push(format!("scale {s} requests standard resolution tiles; use 2 for high-DPI displays"));
		}
		(true, Some(_)) => {}
	}
	if !has_auth_token {
		notes.push("no auth token found; authenticated providers may throttle or reject these tiles".to_string());
	}

	TileUrlQualityReport {
		estimated_quality,
		has_scale_hint,
		has_high_res_marker,
		has_auth_token,
		scale,
		notes,
	}
}
