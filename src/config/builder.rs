// self
use crate::{
	_prelude::*,
	auth::Credentials,
	config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_USER_AGENT},
	error::ConfigError,
	retry::RetryPolicy,
};

/// Builder for [`ClientConfig`] values.
///
/// When no credentials are supplied, [`build`](ClientConfigBuilder::build) falls back to
/// [`Credentials::from_env`].
#[derive(Clone, Debug, Default)]
pub struct ClientConfigBuilder {
	/// Base URL override; defaults to [`DEFAULT_BASE_URL`].
	pub base_url: Option<Url>,
	/// Explicit credentials.
	pub credentials: Option<Credentials>,
	/// Timeout override; defaults to 30 seconds.
	pub timeout: Option<Duration>,
	/// Retry policy override.
	pub retry_policy: Option<RetryPolicy>,
	/// User agent override.
	pub user_agent: Option<String>,
}
impl ClientConfigBuilder {
	const DEFAULT_TIMEOUT: Duration = Duration::seconds(30);

	/// Sets the base URL.
	pub fn base_url(mut self, url: Url) -> Self {
		self.base_url = Some(url);

		self
	}

	/// Sets the credentials.
	pub fn credentials(mut self, credentials: Credentials) -> Self {
		self.credentials = Some(credentials);

		self
	}

	/// Shorthand for [`Credentials::api_key`].
	pub fn api_key(self, key: impl Into<String>) -> Self {
		self.credentials(Credentials::api_key(key))
	}

	/// Sets the per-request timeout.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Sets the retry policy.
	pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
		self.retry_policy = Some(policy);

		self
	}

	/// Sets the `User-Agent` header value.
	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = Some(user_agent.into());

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let base_url = match self.base_url {
			Some(url) => url,
			None => Url::parse(DEFAULT_BASE_URL)
				.map_err(|source| ConfigError::InvalidBaseUrl { source })?,
		};
		let credentials = self
			.credentials
			.filter(|credentials| !credentials.is_empty())
			.or_else(Credentials::from_env)
			.ok_or(ConfigError::MissingCredentials)?;
		let config = ClientConfig {
			base_url,
			credentials,
			timeout: self.timeout.unwrap_or(Self::DEFAULT_TIMEOUT),
			retry_policy: self.retry_policy.unwrap_or_default(),
			user_agent: self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.into()),
		};

		config.validate()?;

		Ok(config)
	}
}

impl ClientConfig {
	fn validate(&self) -> Result<(), ConfigError> {
		if !matches!(self.base_url.scheme(), "http" | "https") || self.base_url.cannot_be_a_base() {
			return Err(ConfigError::UnsupportedBaseUrl { url: self.base_url.to_string() });
		}
		if self.retry_policy.max_attempts == 0 {
			return Err(ConfigError::ZeroAttempts);
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_apply() {
		let config = ClientConfig::builder().api_key("rk_test").build().expect("Config should build.");

		assert_eq!(config.base_url.as_str(), "https://api.rencom.ai/");
		assert_eq!(config.timeout, Duration::seconds(30));
		assert_eq!(config.retry_policy, RetryPolicy::default());
		assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
	}

	#[test]
	fn rejects_non_http_base_urls() {
		let err = ClientConfig::builder()
			.api_key("rk_test")
			.base_url(Url::parse("ftp://files.example.com").expect("URL should parse."))
			.build()
			.expect_err("ftp base URL should be rejected.");

		assert!(matches!(err, ConfigError::UnsupportedBaseUrl { .. }));
	}

	#[test]
	fn rejects_zero_attempt_policies() {
		let err = ClientConfig::builder()
			.api_key("rk_test")
			.retry_policy(RetryPolicy::default().with_max_attempts(0))
			.build()
			.expect_err("Zero attempts should be rejected.");

		assert!(matches!(err, ConfigError::ZeroAttempts));
	}

	#[test]
	fn explicit_credentials_win_over_environment() {
		let config = ClientConfig::builder()
			.credentials(Credentials::jwt("jwt_token"))
			.build()
			.expect("Config should build.");

		assert_eq!(
			config.credentials.auth_header(),
			Some(("Authorization", "Bearer jwt_token".into()))
		);
	}
}
