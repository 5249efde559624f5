//! API credentials and the single authentication header they resolve to.
//!
//! The API accepts three credential kinds. When several are configured, only the
//! highest-priority one is sent: admin key, then JWT, then API key.

// self
use crate::{_prelude::*, auth::Secret};

/// Environment variable consulted by [`Credentials::from_env`].
pub const API_KEY_ENV: &str = "RENCOM_API_KEY";

/// Header carrying a plain API key.
pub const API_KEY_HEADER: &str = "X-API-Key";
/// Header carrying an admin key.
pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";
/// Header carrying a bearer JWT.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Credential set attached to every request issued by a client.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
	/// API key sent as `X-API-Key`.
	pub api_key: Option<Secret>,
	/// JWT sent as `Authorization: Bearer <token>`.
	pub jwt_token: Option<Secret>,
	/// Admin key sent as `X-Admin-Key`.
	pub admin_key: Option<Secret>,
}
impl Credentials {
	/// Credentials holding only an API key.
	pub fn api_key(key: impl Into<String>) -> Self {
		Self { api_key: Some(Secret::new(key)), ..Self::default() }
	}

	/// Credentials holding only a JWT.
	pub fn jwt(token: impl Into<String>) -> Self {
		Self { jwt_token: Some(Secret::new(token)), ..Self::default() }
	}

	/// Reads an API key from `RENCOM_API_KEY`, returning `None` when unset or blank.
	pub fn from_env() -> Option<Self> {
		std::env::var(API_KEY_ENV)
			.ok()
			.map(Secret::new)
			.filter(|key| !key.is_blank())
			.map(|key| Self { api_key: Some(key), ..Self::default() })
	}

	/// Adds or replaces the API key.
	pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
		self.api_key = Some(Secret::new(key));

		self
	}

	/// Adds or replaces the JWT.
	pub fn with_jwt(mut self, token: impl Into<String>) -> Self {
		self.jwt_token = Some(Secret::new(token));

		self
	}

	/// Adds or replaces the admin key.
	pub fn with_admin_key(mut self, key: impl Into<String>) -> Self {
		self.admin_key = Some(Secret::new(key));

		self
	}

	/// Returns `true` when no usable credential is configured.
	pub fn is_empty(&self) -> bool {
		self.auth_header().is_none()
	}

	/// Resolves the single `(name, value)` header to send, honoring credential priority.
	///
	/// Blank secrets are skipped as if they were absent.
	pub fn auth_header(&self) -> Option<(&'static str, String)> {
		let usable = |secret: &Option<Secret>| secret.as_ref().filter(|s| !s.is_blank()).cloned();

		if let Some(admin) = usable(&self.admin_key) {
			return Some((ADMIN_KEY_HEADER, admin.expose().to_owned()));
		}
		if let Some(jwt) = usable(&self.jwt_token) {
			return Some((AUTHORIZATION_HEADER, format!("Bearer {}", jwt.expose())));
		}

		usable(&self.api_key).map(|key| (API_KEY_HEADER, key.expose().to_owned()))
	}
}
