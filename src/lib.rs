//! Async client for the Rencom search API: x402 resource discovery plus UCP merchant and
//! product search, with quota-aware retries and lazy, resumable pagination.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod obs;
pub mod paginate;
pub mod rate_limit;
pub mod retry;
pub mod transport;
pub mod ucp;
pub mod x402;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and an in-process transport for tests; enabled via `cfg(test)` or
	//! the `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// self
	use crate::{
		auth::Credentials,
		client::Client,
		config::ClientConfig,
		error::TransportError,
		retry::RetryPolicy,
		transport::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	};

	/// Transport that replays a fixed script of outcomes and records every request it sees.
	///
	/// Once the script runs dry the transport keeps replaying its fallback outcome, which
	/// defaults to a network failure.
	#[derive(Default)]
	pub struct ScriptedTransport {
		script: Mutex<VecDeque<Scripted>>,
		fallback: Mutex<Option<Scripted>>,
		requests: Mutex<Vec<HttpRequest>>,
	}
	impl ScriptedTransport {
		/// Appends a response with the provided status, headers, and body.
		pub fn respond(self, status: u16, headers: &[(&str, &str)], body: &str) -> Self {
			self.script.lock().push_back(Scripted::response(status, headers, body));

			self
		}

		/// Appends a `200 OK` JSON response.
		pub fn json(self, body: &str) -> Self {
			self.respond(200, &[("content-type", "application/json")], body)
		}

		/// Appends a transport-level network failure.
		pub fn network_failure(self) -> Self {
			self.script.lock().push_back(Scripted::Network);

			self
		}

		/// Appends a transport-level timeout.
		pub fn timeout(self) -> Self {
			self.script.lock().push_back(Scripted::Timeout);

			self
		}

		/// Replays the provided response forever once the script is exhausted.
		pub fn always_respond(self, status: u16, headers: &[(&str, &str)], body: &str) -> Self {
			*self.fallback.lock() = Some(Scripted::response(status, headers, body));

			self
		}

		/// Replays a network failure forever once the script is exhausted.
		pub fn always_fail(self) -> Self {
			*self.fallback.lock() = Some(Scripted::Network);

			self
		}

		/// Number of requests dispatched so far.
		pub fn calls(&self) -> usize {
			self.requests.lock().len()
		}

		/// Query strings of every dispatched request, in order.
		pub fn queries(&self) -> Vec<String> {
			self.requests
				.lock()
				.iter()
				.map(|request| request.uri().query().unwrap_or_default().to_owned())
				.collect()
		}

		/// Clones the headers + URI of every dispatched request.
		pub fn requests(&self) -> Vec<(String, http::HeaderMap)> {
			self.requests
				.lock()
				.iter()
				.map(|request| (request.uri().to_string(), request.headers().clone()))
				.collect()
		}
	}
	impl HttpTransport for ScriptedTransport {
		fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
			self.requests.lock().push(request);

			let next = self
				.script
				.lock()
				.pop_front()
				.or_else(|| self.fallback.lock().clone())
				.unwrap_or(Scripted::Network);

			Box::pin(async move { next.into_outcome() })
		}
	}

	#[derive(Clone)]
	enum Scripted {
		Response { status: u16, headers: Vec<(String, String)>, body: String },
		Network,
		Timeout,
	}
	impl Scripted {
		fn response(status: u16, headers: &[(&str, &str)], body: &str) -> Self {
			Self::Response {
				status,
				headers: headers.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect(),
				body: body.to_owned(),
			}
		}

		fn into_outcome(self) -> Result<HttpResponse, TransportError> {
			match self {
				Self::Response { status, headers, body } => {
					let mut builder = http::Response::builder().status(status);

					for (name, value) in headers {
						builder = builder.header(name, value);
					}

					builder.body(body.into_bytes()).map_err(TransportError::network)
				},
				Self::Network => Err(TransportError::network(std::io::Error::new(
					std::io::ErrorKind::ConnectionReset,
					"scripted connection reset",
				))),
				Self::Timeout => Err(TransportError::Timeout),
			}
		}
	}

	/// Retry policy with millisecond delays so tests stay fast on a real clock.
	pub fn fast_retry_policy() -> RetryPolicy {
		RetryPolicy::default()
			.with_base_delay(Duration::milliseconds(1))
			.with_max_delay(Duration::milliseconds(5))
	}

	/// Builds a client over `transport` that authenticates with a fixed test API key.
	pub fn scripted_client(transport: Arc<ScriptedTransport>) -> Client<ScriptedTransport> {
		let config = ClientConfig::builder()
			.base_url(Url::parse("https://api.test.rencom.ai").expect("Test base URL should parse."))
			.credentials(Credentials::api_key("rk_test_key"))
			.retry_policy(fast_retry_policy())
			.build()
			.expect("Test client config should build.");

		Client::with_transport(config, transport)
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};

pub use crate::{
	client::Client,
	config::ClientConfig,
	error::{Error, Result},
	paginate::{PageRequest, PageToken, Pager},
};
#[cfg(feature = "reqwest")] pub use crate::client::ReqwestRencomClient;
