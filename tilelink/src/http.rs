//! The shared HTTP client.

use crate::config::HttpConfig;
use anyhow::Result;
use reqwest::Client;
use std::time::Duration;

/// Builds the client that every component shares. Timeouts are set per request, not here.
pub fn build_client(config: &HttpConfig) -> Result<Client> {
	Ok(Client::builder()
		.tcp_keepalive(Duration::from_secs(600))
		.user_agent(config.user_agent.clone())
		.build()?)
}

/// Errors worth another attempt. Timeouts are excluded: they already consumed the caller's budget.
pub fn is_retryable_error(err: &reqwest::Error) -> bool {
	err.is_connect() && !err.is_timeout()
}

/// Exponential backoff before retry `attempt` (1-based): 250 ms, 500 ms, 1 s, ...
pub fn backoff(attempt: u32) -> Duration {
	Duration::from_millis(250 << attempt.saturating_sub(1).min(6))
}
