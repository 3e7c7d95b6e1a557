//! Corrections for asset combinations that are known to render badly.
//!
//! A rule fires when the collection contains the rule's matcher (case-insensitive) and the
//! requested assets, taken as a set, are exactly the rule's bad set. The whole list is then
//! replaced. Supersets and subsets of a bad set are left alone: they are assumed intentional.

use itertools::Itertools;
use std::collections::BTreeSet;
use url::form_urlencoded;

#[derive(Debug)]
pub struct AssetRule {
	pub collection: &'static str,
	pub bad_assets: &'static [&'static str],
	pub replacement: &'static [&'static str],
}

pub static ASSET_RULES: &[AssetRule] = &[
	AssetRule {
		collection: "sentinel-2",
		bad_assets: &["red", "green", "blue"],
		replacement: &["visual"],
	},
	AssetRule {
		collection: "sentinel-2",
		bad_assets: &["B04", "B03", "B02"],
		replacement: &["visual"],
	},
	AssetRule {
		collection: "naip",
		bad_assets: &["red", "green", "blue"],
		replacement: &["image"],
	},
	AssetRule {
		collection: "landsat",
		bad_assets: &["visual"],
		replacement: &["red", "green", "blue"],
	},
];

impl AssetRule {
	fn fires(&self, collection: &str, requested: &BTreeSet<&str>) -> bool {
		collection.contains(self.collection) && *requested == self.bad_assets.iter().copied().collect::<BTreeSet<_>>()
	}
}

/// Returns the corrected asset list, or the input unchanged when no rule fires.
///
/// ```
/// use tilelink_core::assets::correct_assets;
///
/// assert_eq!(correct_assets("sentinel-2-l2a", &["red", "green", "blue"]), vec!["visual"]);
/// assert_eq!(correct_assets("sentinel-2-l2a", &["red", "green", "blue", "nir"]), vec!["red", "green", "blue", "nir"]);
/// ```
#[must_use]
pub fn correct_assets<S: AsRef<str>>(collection: &str, requested: &[S]) -> Vec<String> {
	let collection = collection.to_lowercase();
	let set: BTreeSet<&str> = requested.iter().map(AsRef::as_ref).collect();

	match ASSET_RULES.iter().find(|rule| rule.fires(&collection, &set)) {
		Some(rule) => {
			log::debug!(
				"replacing assets [{}] of '{collection}' with [{}]",
				requested.iter().map(AsRef::as_ref).join(","),
				rule.replacement.join(",")
			);
			rule.replacement.iter().map(|s| (*s).to_string()).collect()
		}
		None => requested.iter().map(|s| s.as_ref().to_string()).collect(),
	}
}

fn split_query(url: &str) -> (&str, Option<&str>, &str) {
	let (head, fragment) = match url.find('#') {
		Some(i) => url.split_at(i),
		None => (url, ""),
	};
	match head.split_once('?') {
		Some((base, query)) => (base, Some(query), fragment),
		None => (head, None, fragment),
	}
}

fn decode(text: &str) -> String {
	form_urlencoded::parse(text.as_bytes())
		.next()
		.map(|(k, v)| if v.is_empty() { k.into_owned() } else { format!("{k}={v}") })
		.unwrap_or_default()
}

/// The `assets` values of a URL's query, in order.
#[must_use]
pub fn url_assets(url: &str) -> Vec<String> {
	let (_, query, _) = split_query(url);
	query
		.map(|q| {
			form_urlencoded::parse(q.as_bytes())
				.filter(|(k, _)| k == "assets")
				.map(|(_, v)| v.into_owned())
				.collect()
		})
		.unwrap_or_default()
}

/// Applies [`correct_assets`] to the repeated `assets` query parameters of a URL or template.
///
/// Works on the raw string, so `{z}/{x}/{y}` placeholders and every other parameter are kept
/// byte for byte. The corrected `assets` parameters take the place of the first original one.
///
/// ```
/// use tilelink_core::assets::correct_url_assets;
///
/// assert_eq!(
///     correct_url_assets("sentinel-2-l2a", "https://t.example/{z}/{x}/{y}.png?assets=red&assets=green&assets=blue&nodata=0"),
///     "https://t.example/{z}/{x}/{y}.png?assets=visual&nodata=0"
/// );
/// ```
#[must_use]
pub fn correct_url_assets(collection: &str, url: &str) -> String {
	let requested = url_assets(url);
	if requested.is_empty() {
		return url.to_string();
	}
	let corrected = correct_assets(collection, &requested);
	if corrected == requested {
		return url.to_string();
	}

	let (base, query, fragment) = split_query(url);
	let mut pairs: Vec<String> = Vec::new();
	let mut inserted = false;
	for pair in query.unwrap_or_default().split('&') {
		let key = decode(pair.split('=').next().unwrap_or_default());
		if key == "assets" {
			if !inserted {
				pairs.extend(
					corrected
						.iter()
						.map(|a| format!("assets={}", form_urlencoded::byte_serialize(a.as_bytes()).collect::<String>())),
				);
				inserted = true;
			}
		} else {
			pairs.push(pair.to_string());
		}
	}

	format!("{base}?{}{fragment}", pairs.join("&"))
}

/// Adds `assets` parameters to a URL that does not name any assets yet.
///
/// URLs that already carry `assets` are returned unchanged; their own choice wins.
#[must_use]
pub fn with_requested_assets<S: AsRef<str>>(url: &str, assets: &[S]) -> String {
	if assets.is_empty() || !url_assets(url).is_empty() {
		return url.to_string();
	}
	let (base, query, fragment) = split_query(url);
	let mut pairs: Vec<String> = query.filter(|q| !q.is_empty()).map(str::to_string).into_iter().collect();
	pairs.extend(
		assets
			.iter()
			.map(|a| format!("assets={}", form_urlencoded::byte_serialize(a.as_ref().as_bytes()).collect::<String>())),
	);
	format!("{base}?{}{fragment}", pairs.join("&"))
}
