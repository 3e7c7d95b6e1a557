//! YAML configuration.
//!
//! ```yaml
//! signing:
//!   base_url: https://planetarycomputer.microsoft.com/api/sas/v1
//!   authenticated_host: planetarycomputer.microsoft.com
//!   extra_collection_patterns: [my-private-mosaic]
//!   timeout_ms: 5000
//! http:
//!   timeout_ms: 10000
//!   max_retries: 2
//!   max_concurrent_requests: 8
//! ```
//!
//! Every section and field is optional.

use anyhow::{Result, ensure};
use serde::Deserialize;
use std::{
	fs::File,
	io::{BufReader, Read},
	path::Path,
	time::Duration,
};
use tilelink_derive::context;
use url::Url;

pub const DEFAULT_SIGNING_BASE_URL: &str = "https://planetarycomputer.microsoft.com/api/sas/v1";
pub const DEFAULT_AUTHENTICATED_HOST: &str = "planetarycomputer.microsoft.com";

#[derive(Default, Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
	/// Signing endpoint and authentication policy.
	#[serde(default)]
	pub signing: SigningConfig,

	/// Settings for TileJSON requests.
	#[serde(default)]
	pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct SigningConfig {
	/// Base URL of the signing service; requests go to `{base_url}/sign`.
	pub base_url: String,

	/// URLs on this host (or its subdomains) are always signed.
	pub authenticated_host: String,

	/// Collection patterns that require signing in addition to the built-in table.
	pub extra_collection_patterns: Vec<String>,

	pub timeout_ms: u64,
}

impl Default for SigningConfig {
	fn default() -> Self {
		SigningConfig {
			base_url: DEFAULT_SIGNING_BASE_URL.to_string(),
			authenticated_host: DEFAULT_AUTHENTICATED_HOST.to_string(),
			extra_collection_patterns: Vec::new(),
			timeout_ms: 5_000,
		}
	}
}

impl SigningConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_millis(self.timeout_ms)
	}
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct HttpConfig {
	/// Timeout of a single TileJSON request.
	pub timeout_ms: u64,

	/// Retries after connection errors. Timeouts are not retried.
	pub max_retries: u32,

	/// How many items of a mosaic are resolved at once.
	pub max_concurrent_requests: usize,

	pub user_agent: String,
}

impl Default for HttpConfig {
	fn default() -> Self {
		HttpConfig {
			timeout_ms: 10_000,
			max_retries: 2,
			max_concurrent_requests: 8,
			user_agent: format!("tilelink/{}", env!("CARGO_PKG_VERSION")),
		}
	}
}

impl HttpConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_millis(self.timeout_ms)
	}
}

impl Config {
	pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
		Ok(serde_yaml_ng::from_reader(reader)?)
	}

	pub fn from_string(text: &str) -> Result<Self> {
		Ok(serde_yaml_ng::from_str(text)?)
	}

	#[context("loading config '{}'", path.display())]
	pub fn from_path(path: &Path) -> Result<Self> {
		let file = File::open(path)?;
		let config = Config::from_reader(BufReader::new(file))?;
		config.validate()?;
		Ok(config)
	}

	#[context("invalid config")]
	pub fn validate(&self) -> Result<()> {
		let base = Url::parse(&self.signing.base_url)?;
		ensure!(
			matches!(base.scheme(), "http" | "https"),
			"signing.base_url must be an http(s) URL, got '{}'",
			self.signing.base_url
		);
		ensure!(
			!self.signing.authenticated_host.is_empty(),
			"signing.authenticated_host must not be empty"
		);
		ensure!(self.signing.timeout_ms > 0, "signing.timeout_ms must be greater than 0");
		ensure!(self.http.timeout_ms > 0, "http.timeout_ms must be greater than 0");
		ensure!(
			self.http.max_concurrent_requests >= 1,
			"http.max_concurrent_requests must be at least 1"
		);
		Ok(())
	}

	pub fn override_optional_signing_url(&mut self, url: &Option<String>) {
		if let Some(url) = url {
			self.signing.base_url.clone_from(url);
		}
	}

	pub fn override_optional_timeout_ms(&mut self, timeout_ms: Option<u64>) {
		if let Some(timeout_ms) = timeout_ms {
			self.http.timeout_ms = timeout_ms;
		}
	}
}
