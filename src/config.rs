//! Client configuration: base URL, credentials, timeout, retry policy, and user agent.

/// Validating builder for client configuration.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, auth::Credentials, error::ConfigError, retry::RetryPolicy};

/// Production API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.rencom.ai";
/// User agent sent with every request unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!("rencom-rs/", env!("CARGO_PKG_VERSION"));

/// Validated configuration shared by every clone of a [`Client`](crate::Client).
///
/// Construct it through [`ClientConfig::builder`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// Base URL every endpoint path is appended to.
	pub base_url: Url,
	/// Credentials resolved into the authentication header.
	pub credentials: Credentials,
	/// Per-request timeout applied by the bundled reqwest transport.
	pub timeout: Duration,
	/// Retry behavior for every logical request.
	pub retry_policy: RetryPolicy,
	/// `User-Agent` header value.
	pub user_agent: String,
}
impl ClientConfig {
	/// Starts a builder seeded with the defaults.
	pub fn builder() -> ClientConfigBuilder {
		ClientConfigBuilder::default()
	}

	/// Resolves an endpoint path (e.g. `/ucp/v1/merchants`) against the base URL.
	///
	/// Any path prefix carried by the base URL is preserved.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		let joined = format!(
			"{}/{}",
			self.base_url.as_str().trim_end_matches('/'),
			path.trim_start_matches('/')
		);

		Url::parse(&joined).map_err(|source| ConfigError::InvalidPath { path: path.into(), source })
	}
}
