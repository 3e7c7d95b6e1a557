//! Collections served by the authenticated provider.
//!
//! Collection ids are matched case-insensitively by substring against an ordered table, so the
//! whole authentication policy can be read (and tested) as data.

use std::fmt;

/// The family a matched collection belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionFamily {
	Multispectral,
	Radar,
	Elevation,
	ClimateReanalysis,
}

impl fmt::Display for CollectionFamily {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			CollectionFamily::Multispectral => "multispectral",
			CollectionFamily::Radar => "radar",
			CollectionFamily::Elevation => "elevation",
			CollectionFamily::ClimateReanalysis => "climate-reanalysis",
		})
	}
}

/// Lowercase substring patterns of collections that require signed URLs.
pub static AUTHENTICATED_COLLECTIONS: &[(&str, CollectionFamily)] = &[
	("sentinel-2", CollectionFamily::Multispectral),
	("landsat", CollectionFamily::Multispectral),
	("hls", CollectionFamily::Multispectral),
	("naip", CollectionFamily::Multispectral),
	("modis", CollectionFamily::Multispectral),
	("aster", CollectionFamily::Multispectral),
	("sentinel-1", CollectionFamily::Radar),
	("alos-palsar", CollectionFamily::Radar),
	("cop-dem", CollectionFamily::Elevation),
	("nasadem", CollectionFamily::Elevation),
	("alos-dem", CollectionFamily::Elevation),
	("3dep", CollectionFamily::Elevation),
	("era5", CollectionFamily::ClimateReanalysis),
	("daymet", CollectionFamily::ClimateReanalysis),
	("terraclimate", CollectionFamily::ClimateReanalysis),
	("gridmet", CollectionFamily::ClimateReanalysis),
];

/// Finds the first table entry whose pattern occurs in `collection`.
///
/// ```
/// use tilelink_core::rules::{CollectionFamily, match_collection};
///
/// assert_eq!(match_collection("Sentinel-1-GRD"), Some(("sentinel-1", CollectionFamily::Radar)));
/// assert_eq!(match_collection("my-private-mosaic"), None);
/// ```
#[must_use]
pub fn match_collection(collection: &str) -> Option<(&'static str, CollectionFamily)> {
	let collection = collection.to_lowercase();
	AUTHENTICATED_COLLECTIONS
		.iter()
		.find(|(pattern, _)| collection.contains(pattern))
		.copied()
}
