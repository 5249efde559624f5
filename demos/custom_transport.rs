//! Plugs a non-reqwest transport into the client.
//!
//! 1. Implement [`HttpTransport`] so one exchange turns an [`HttpRequest`] into an
//!    [`HttpResponse`], mapping connection failures to [`TransportError`].
//! 2. Wrap the transport in `Arc` and hand it to [`Client::with_transport`].
//! 3. Let the client drive authentication headers, retries, and status mapping.

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use color_eyre::Result;
use time::Duration;
// self
use rencom::{
	Client, ClientConfig, Error,
	auth::Credentials,
	error::TransportError,
	retry::RetryPolicy,
	transport::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	x402::X402Search,
};

/// Serves canned search pages and fails the first `flaky` exchanges.
#[derive(Debug)]
struct FixtureTransport {
	flaky: usize,
	calls: AtomicUsize,
}
impl FixtureTransport {
	fn new(flaky: usize) -> Self {
		Self { flaky, calls: AtomicUsize::new(0) }
	}
}
impl HttpTransport for FixtureTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		let call = self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			if call < self.flaky {
				return Err(TransportError::Timeout);
			}

			println!("Serving {} {} from fixtures.", request.method(), request.uri());

			let authorized = request.headers().contains_key("x-api-key");
			let (status, body) = if authorized {
				(
					200,
					r#"{"results":[{"resource":"https://api.example.com/v1/trading"}],"has_more":false}"#,
				)
			} else {
				(401, r#"{"detail":"Missing API key"}"#)
			};

			http::Response::builder()
				.status(status)
				.header("content-type", "application/json")
				.body(body.as_bytes().to_vec())
				.map_err(TransportError::network)
		})
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = ClientConfig::builder()
		.credentials(Credentials::api_key("rk_demo_key"))
		.retry_policy(RetryPolicy::default().with_base_delay(Duration::milliseconds(50)))
		.build()?;
	let transport = Arc::new(FixtureTransport::new(2));
	let client = Client::with_transport(config.clone(), Arc::clone(&transport));
	let response = client.x402().search(&X402Search::new("trading api")).await?;

	println!(
		"Received {} result(s) after {} exchange(s).",
		response.results.len(),
		transport.calls.load(Ordering::SeqCst)
	);

	let failing = Client::with_transport(config, Arc::new(FixtureTransport::new(usize::MAX)));

	match failing.x402().search(&X402Search::new("trading api")).await {
		Err(Error::Transient(e)) => {
			println!("Gave up after {} attempts: {e}.", failing.metrics().attempts());
		},
		other => println!("Unexpected outcome: {other:?}."),
	}

	Ok(())
}
