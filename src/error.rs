//! Client-level error types shared across transports, the retry policy, and pagination.

// self
use crate::{_prelude::*, paginate::PageToken};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary failure; retried by the policy and surfaced once attempts run out.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// The server's quota was exhausted.
	#[error(transparent)]
	RateLimited(#[from] RateLimitError),
	/// A response body could not be decoded into the expected shape.
	#[error("Failed to decode the response{}: {source}", describe_token(.page_token.as_ref()))]
	Decode {
		/// Token of the page whose body failed to decode, when the call was paginated.
		page_token: Option<PageToken>,
		/// Structured decoding failure.
		#[source]
		source: DecodeError,
	},

	/// Request parameters were rejected (locally or by the server).
	#[error("Request validation failed: {message}.")]
	Validation {
		/// Human-readable summary.
		message: String,
		/// Field-level errors reported by the server, if any.
		errors: Vec<serde_json::Value>,
	},
	/// Credentials are missing, invalid, or expired.
	#[error("Authentication failed: {reason}.")]
	Authentication {
		/// Server-supplied reason string.
		reason: String,
	},
	/// Credentials are valid but lack access to the resource.
	#[error("Access denied: {reason}.")]
	Authorization {
		/// Server-supplied reason string.
		reason: String,
	},
	/// The requested resource does not exist.
	#[error("Resource not found: {reason}.")]
	NotFound {
		/// Server-supplied reason string.
		reason: String,
	},
	/// Any other unexpected HTTP status.
	#[error("Unexpected HTTP {status}: {message}.")]
	Api {
		/// HTTP status code.
		status: u16,
		/// Server-supplied message.
		message: String,
	},
}
impl Error {
	/// Builds a client-side validation error with no field-level details.
	pub fn validation(message: impl Into<String>) -> Self {
		Self::Validation { message: message.into(), errors: Vec::new() }
	}

	/// Returns `true` when the retry policy may try the request again.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Transient(_) | Self::RateLimited(_))
	}

	/// HTTP status associated with the failure, when one was received.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Transient(TransientError::Server { status, .. }) | Self::Api { status, .. } =>
				Some(*status),
			Self::RateLimited(_) => Some(429),
			Self::Authentication { .. } => Some(401),
			Self::Authorization { .. } => Some(403),
			Self::NotFound { .. } => Some(404),
			_ => None,
		}
	}
}
impl From<TransportError> for Error {
	fn from(e: TransportError) -> Self {
		TransientError::Transport(e).into()
	}
}

/// Configuration and request-construction failures raised before anything is sent.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] http::Error),
	/// Base URL cannot be parsed.
	#[error("Base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL uses a scheme other than http/https or cannot carry a path.
	#[error("Base URL must be an absolute http(s) URL: {url}.")]
	UnsupportedBaseUrl {
		/// Offending URL.
		url: String,
	},
	/// Endpoint path could not be joined onto the base URL.
	#[error("Endpoint path `{path}` cannot be joined onto the base URL.")]
	InvalidPath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// No API key, JWT, or admin key was supplied.
	#[error("Either an API key or a JWT must be provided, or RENCOM_API_KEY must be set.")]
	MissingCredentials,
	/// Retry policy must allow at least one attempt.
	#[error("Retry policy must allow at least one attempt.")]
	ZeroAttempts,
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	Body(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// The transport failed before a response arrived.
	#[error(transparent)]
	Transport(TransportError),
	/// The server answered with a 5xx status.
	#[error("Server returned HTTP {status}: {message}.")]
	Server {
		/// HTTP status code.
		status: u16,
		/// Server-supplied message.
		message: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
}

/// Transport-level failures (network, IO, timeouts).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the Rencom API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The transport gave up waiting for a response.
	#[error("Request to the Rencom API timed out.")]
	Timeout,
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the Rencom API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}

/// Quota exhaustion reported by the server (HTTP 429).
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Rate limit exceeded: {message}.")]
pub struct RateLimitError {
	/// Server-supplied message.
	pub message: String,
	/// Retry-After hint, when the server sent one.
	pub retry_after: Option<Duration>,
	/// Per-minute request limit reported alongside the rejection.
	pub limit: Option<u64>,
	/// Requests remaining in the current window.
	pub remaining: Option<u64>,
	/// Instant the current window resets.
	pub reset_at: Option<OffsetDateTime>,
}

/// Failures raised while turning a response body into typed values.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// Body is not valid JSON or does not match the expected shape.
	#[error("Malformed JSON at `{}`.", .0.path())]
	Json(#[from] serde_path_to_error::Error<serde_json::Error>),
	/// Body holds extra bytes after the first JSON value.
	#[error("Response has trailing data after the JSON value.")]
	TrailingData(#[source] serde_json::Error),
	/// A field the decoder relies on is absent.
	#[error("Response is missing the `{field}` field.")]
	MissingField {
		/// Name of the missing field.
		field: String,
	},
	/// A field is present but has an unusable value.
	#[error("Response field `{field}` is invalid: {reason}.")]
	InvalidField {
		/// Name of the offending field.
		field: String,
		/// Why the value was rejected.
		reason: String,
	},
}

fn describe_token(token: Option<&PageToken>) -> String {
	match token {
		Some(token) => format!(" for page {token}"),
		None => String::new(),
	}
}
