//! Fetches a TileJSON document and turns it into a ready-to-use tile template.
//!
//! The pipeline for one URL is:
//!
//! 1. correct the `assets` of the TileJSON URL for the collection,
//! 2. sign the URL if the host or collection requires it,
//! 3. fetch it with a per-request timeout, racing the caller's cancellation token,
//! 4. parse the body strictly,
//! 5. correct and, if required, sign the first tile template.
//!
//! Signing problems never fail a resolution; they only leave URLs unsigned.

use crate::{
	auth::UrlAuthenticator,
	config::{Config, HttpConfig},
	http::{backoff, build_client, is_retryable_error},
};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tilelink_core::{
	assets::correct_url_assets,
	template::query_value,
	tilejson::{TileJsonDocument, TileJsonError},
};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResolveError {
	#[error("request to '{url}' timed out after {timeout:?}")]
	Timeout { url: String, timeout: Duration },
	#[error("request to '{url}' failed: {message}")]
	Transport { url: String, message: String },
	#[error("resolving '{0}' was cancelled")]
	Cancelled(String),
	#[error("HTTP {status} fetching '{url}'")]
	HttpStatus { url: String, status: u16 },
	#[error("bad TileJSON response shape: {0}")]
	InvalidShape(String),
	#[error("TileJSON 'tiles' array is empty")]
	EmptyTiles,
	#[error("tile template '{0}' must contain exactly one {{z}}, {{x}} and {{y}}")]
	InvalidTemplate(String),
}

impl From<TileJsonError> for ResolveError {
	fn from(err: TileJsonError) -> Self {
		match err {
			TileJsonError::InvalidShape(message) => ResolveError::InvalidShape(message),
			TileJsonError::EmptyTiles => ResolveError::EmptyTiles,
			TileJsonError::InvalidTemplate(template) => ResolveError::InvalidTemplate(template),
		}
	}
}

#[derive(Clone, Debug, Default)]
pub struct ResolveOptions {
	/// Collection of the item, used for asset correction and the signing decision. Defaults to
	/// the `collection` query parameter of the TileJSON URL.
	pub collection: Option<String>,
	/// Overrides the configured request timeout.
	pub timeout: Option<Duration>,
	pub cancel: CancellationToken,
}

impl ResolveOptions {
	pub fn for_collection(collection: Option<&str>, cancel: &CancellationToken) -> ResolveOptions {
		ResolveOptions {
			collection: collection.map(str::to_string),
			timeout: None,
			cancel: cancel.clone(),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedTileJson {
	pub tile_template: String,
	pub document: TileJsonDocument,
	pub url_was_signed: bool,
	pub template_was_signed: bool,
}

#[derive(Clone, Debug)]
pub struct TileJsonResolver {
	client: Client,
	authenticator: UrlAuthenticator,
	timeout: Duration,
	max_retries: u32,
}

impl TileJsonResolver {
	pub fn new(client: Client, authenticator: UrlAuthenticator, config: &HttpConfig) -> TileJsonResolver {
		TileJsonResolver {
			client,
			authenticator,
			timeout: config.timeout(),
			max_retries: config.max_retries,
		}
	}

	/// Builds the shared client and the authenticator from a validated config.
	pub fn from_config(config: &Config) -> anyhow::Result<TileJsonResolver> {
		let client = build_client(&config.http)?;
		let authenticator = UrlAuthenticator::new(client.clone(), &config.signing);
		Ok(TileJsonResolver::new(client, authenticator, &config.http))
	}

	pub fn authenticator(&self) -> &UrlAuthenticator {
		&self.authenticator
	}

	pub async fn resolve(&self, tilejson_url: &str, options: &ResolveOptions) -> Result<ResolvedTileJson, ResolveError> {
		let collection = options
			.collection
			.clone()
			.or_else(|| query_value(tilejson_url, "collection"));
		let collection = collection.as_deref();
		let cancel = &options.cancel;
		let timeout = options.timeout.unwrap_or(self.timeout);

		let url = match collection {
			Some(collection) => correct_url_assets(collection, tilejson_url),
			None => tilejson_url.to_string(),
		};
		if cancel.is_cancelled() {
			return Err(ResolveError::Cancelled(url));
		}

		let mut request_url = url.clone();
		let mut url_was_signed = false;
		if self.authenticator.should_authenticate(collection, Some(&url)) {
			let signed = self.authenticator.sign_cancellable(&url, cancel).await;
			url_was_signed = signed.was_signed;
			request_url = signed.signed_url;
		}

		log::debug!("fetching TileJSON '{url}'");
		let body = self.fetch(&url, &request_url, timeout, cancel).await?;
		let document = TileJsonDocument::parse(&body)?;

		let template = match collection {
			Some(collection) => correct_url_assets(collection, document.first_template()),
			None => document.first_template().to_string(),
		};

		let (tile_template, template_was_signed) = if self.authenticator.should_authenticate(collection, Some(&template)) {
			let signed = self.authenticator.sign_template(&template, cancel).await;
			(signed.signed_url, signed.was_signed)
		} else {
			(template, false)
		};

		if cancel.is_cancelled() {
			return Err(ResolveError::Cancelled(url));
		}

		log::debug!("resolved '{url}' to '{tile_template}'");
		Ok(ResolvedTileJson {
			tile_template,
			document,
			url_was_signed,
			template_was_signed,
		})
	}

	/// GETs `request_url`, retrying connection errors. `url` is the unsigned form used in
	/// messages so that signatures do not end up in logs.
	async fn fetch(
		&self,
		url: &str,
		request_url: &str,
		timeout: Duration,
		cancel: &CancellationToken,
	) -> Result<String, ResolveError> {
		let transport_error = |err: reqwest::Error| {
			if err.is_timeout() {
				ResolveError::Timeout {
					url: url.to_string(),
					timeout,
				}
			} else {
				ResolveError::Transport {
					url: url.to_string(),
					message: err.without_url().to_string(),
				}
			}
		};

		for attempt in 0..=self.max_retries {
			if attempt > 0 {
				let wait = backoff(attempt);
				log::warn!(
					"retry attempt {attempt}/{} fetching '{url}', waiting {wait:?}",
					self.max_retries
				);
				tokio::select! {
					biased;
					() = cancel.cancelled() => return Err(ResolveError::Cancelled(url.to_string())),
					() = sleep(wait) => {}
				}
			}

			let request = self.client.get(request_url).timeout(timeout).send();
			let response = tokio::select! {
				biased;
				() = cancel.cancelled() => return Err(ResolveError::Cancelled(url.to_string())),
				response = request => response,
			};

			let response = match response {
				Ok(r) => r,
				Err(e) if is_retryable_error(&e) && attempt < self.max_retries => {
					log::warn!("retryable error fetching '{url}': {}", e.without_url());
					continue;
				}
				Err(e) => return Err(transport_error(e)),
			};

			let status = response.status();
			if !status.is_success() {
				return Err(ResolveError::HttpStatus {
					url: url.to_string(),
					status: status.as_u16(),
				});
			}

			return tokio::select! {
				biased;
				() = cancel.cancelled() => Err(ResolveError::Cancelled(url.to_string())),
				body = response.text() => body.map_err(transport_error),
			};
		}

		Err(ResolveError::Transport {
			url: url.to_string(),
			message: format!("request failed after {} retries", self.max_retries),
		})
	}
}
