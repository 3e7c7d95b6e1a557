//! Signing of provider URLs.
//!
//! Whether a URL needs a signature is decided by its host first and by the collection second.
//! Signing itself never fails from the caller's point of view: every problem with the signing
//! service is logged and the unsigned URL is handed back.

use crate::config::SigningConfig;
use anyhow::{Result, anyhow, ensure};
use reqwest::{Client, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tilelink_core::{rules, template::SampleTileUrl};
use tilelink_derive::context;
use tokio_util::sync::CancellationToken;
use url::Url;

/// What triggered a signing decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchedBy {
	UrlPattern,
	CollectionPattern,
	None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AuthDecision {
	pub requires_signing: bool,
	pub matched_by: MatchedBy,
}

/// Result of a signing attempt. When `was_signed` is false, `signed_url == original_url`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SignedUrl {
	pub original_url: String,
	pub signed_url: String,
	pub was_signed: bool,
}

impl SignedUrl {
	fn unsigned(url: &str) -> SignedUrl {
		SignedUrl {
			original_url: url.to_string(),
			signed_url: url.to_string(),
			was_signed: false,
		}
	}
}

#[derive(Serialize)]
struct SignRequest<'a> {
	url: &'a str,
}

#[derive(Deserialize)]
struct SignResponse {
	signed_url: String,
	authenticated: Option<bool>,
}

#[derive(Clone, Debug)]
pub struct UrlAuthenticator {
	client: Client,
	sign_endpoint: String,
	authenticated_host: String,
	extra_patterns: Vec<String>,
	timeout: Duration,
}

impl UrlAuthenticator {
	pub fn new(client: Client, config: &SigningConfig) -> UrlAuthenticator {
		UrlAuthenticator {
			client,
			sign_endpoint: format!("{}/sign", config.base_url.trim_end_matches('/')),
			authenticated_host: config.authenticated_host.to_lowercase(),
			extra_patterns: config.extra_collection_patterns.iter().map(|p| p.to_lowercase()).collect(),
			timeout: config.timeout(),
		}
	}

	fn is_authenticated_host(&self, url: &str) -> bool {
		let Ok(url) = Url::parse(url) else {
			return false;
		};
		url.host_str().is_some_and(|host| {
			let host = host.to_lowercase();
			host == self.authenticated_host
				|| host
					.strip_suffix(&self.authenticated_host)
					.is_some_and(|prefix| prefix.ends_with('.'))
		})
	}

	fn matches_collection(&self, collection: &str) -> bool {
		if let Some((pattern, family)) = rules::match_collection(collection) {
			log::trace!("collection '{collection}' matches '{pattern}' ({family})");
			return true;
		}
		let collection = collection.to_lowercase();
		self.extra_patterns.iter().any(|p| collection.contains(p.as_str()))
	}

	/// Decides whether a URL or collection needs signing. A URL on the authenticated host
	/// always does, whatever the collection.
	pub fn decide(&self, collection: Option<&str>, url: Option<&str>) -> AuthDecision {
		let matched_by = if url.is_some_and(|u| self.is_authenticated_host(u)) {
			MatchedBy::UrlPattern
		} else if collection.is_some_and(|c| self.matches_collection(c)) {
			MatchedBy::CollectionPattern
		} else {
			MatchedBy::None
		};
		AuthDecision {
			requires_signing: matched_by != MatchedBy::None,
			matched_by,
		}
	}

	pub fn should_authenticate(&self, collection: Option<&str>, url: Option<&str>) -> bool {
		self.decide(collection, url).requires_signing
	}

	#[context("signing '{url}' via '{}'", self.sign_endpoint)]
	async fn request_signature(&self, url: &str) -> Result<SignResponse> {
		let body = serde_json::to_string(&SignRequest { url })?;
		let response = self
			.client
			.post(&self.sign_endpoint)
			.header(CONTENT_TYPE, "application/json")
			.body(body)
			.timeout(self.timeout)
			.send()
			.await?;

		ensure!(
			response.status().is_success(),
			"signing service answered HTTP {}",
			response.status()
		);

		let text = response.text().await?;
		let parsed: SignResponse = serde_json::from_str(&text)?;
		ensure!(!parsed.signed_url.is_empty(), "signing service returned an empty 'signed_url'");
		Ok(parsed)
	}

	/// Signs a concrete URL.
	pub async fn sign(&self, url: &str) -> SignedUrl {
		self.sign_cancellable(url, &CancellationToken::new()).await
	}

	/// Signs a concrete URL, giving up when `cancel` fires.
	pub async fn sign_cancellable(&self, url: &str, cancel: &CancellationToken) -> SignedUrl {
		let result = tokio::select! {
			biased;
			() = cancel.cancelled() => Err(anyhow!("signing '{url}' was cancelled")),
			result = self.request_signature(url) => result,
		};

		match result {
			Ok(response) => {
				log::debug!("signed '{url}' (authenticated: {:?})", response.authenticated);
				SignedUrl {
					original_url: url.to_string(),
					signed_url: response.signed_url,
					was_signed: true,
				}
			}
			Err(err) => {
				log::warn!("{err:#}; continuing with the unsigned URL");
				SignedUrl::unsigned(url)
			}
		}
	}

	/// Signs a `{z}/{x}/{y}` template by signing its `0/0/0` sample URL and restoring the
	/// placeholders in the result.
	pub async fn sign_template(&self, template: &str, cancel: &CancellationToken) -> SignedUrl {
		let Some(sample) = SampleTileUrl::from_template(template) else {
			log::warn!("cannot sign template '{template}': placeholders do not form a single /{{z}}/{{x}}/{{y}} path run");
			return SignedUrl::unsigned(template);
		};

		let signed = self.sign_cancellable(sample.url(), cancel).await;
		if !signed.was_signed {
			return SignedUrl::unsigned(template);
		}

		match sample.restore(&signed.signed_url) {
			Some(signed_url) => SignedUrl {
				original_url: template.to_string(),
				signed_url,
				was_signed: true,
			},
			None => {
				log::warn!(
					"signed URL '{}' no longer contains the 0/0/0 tile path; keeping the unsigned template",
					signed.signed_url
				);
				SignedUrl::unsigned(template)
			}
		}
	}
}
