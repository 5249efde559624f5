//! Transport primitives for Rencom API exchanges.
//!
//! The module exposes [`HttpTransport`], the client's only dependency on an HTTP stack,
//! alongside the reqwest-backed [`ReqwestTransport`] shipped behind the default `reqwest`
//! feature. Downstream crates can plug any other HTTP client by implementing the trait;
//! the client owns URL construction, headers, quota tracking and retries, so a transport
//! only has to perform a single exchange.

// self
use crate::{_prelude::*, error::TransportError};

/// Outbound request handed to a transport.
pub type HttpRequest = http::Request<Vec<u8>>;
/// Fully buffered response returned by a transport.
pub type HttpResponse = http::Response<Vec<u8>>;

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing one Rencom API exchange.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared
/// across client clones (the client keeps it behind an `Arc`). Any HTTP status, including
/// 4xx and 5xx, is a successful exchange from the transport's point of view; only failures
/// that prevent a response from arriving map to [`TransportError`]. Timeouts belong to the
/// transport and should surface as [`TransportError::Timeout`].
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Performs one HTTP exchange.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Build it with [`ReqwestTransport::with_timeout`] to apply a per-request timeout, or wrap
/// a preconfigured client with [`ReqwestTransport::with_client`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a reqwest client whose requests time out after `timeout`.
	pub fn with_timeout(timeout: Duration) -> Result<Self, crate::error::ConfigError> {
		let mut builder = ReqwestClient::builder();

		if timeout.is_positive() {
			builder = builder.timeout(timeout.unsigned_abs());
		}

		Ok(Self(builder.build()?))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let request = reqwest::Request::try_from(request).map_err(TransportError::from)?;
			let response = self.0.execute(request).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}
