// std
use std::time::Instant;
// crates.io
use httpmock::prelude::*;
use time::Duration;
// self
use rencom::{
	Client, ClientConfig, Error, ReqwestRencomClient,
	auth::Credentials,
	error::TransientError,
	retry::RetryPolicy,
	url::Url,
	x402::X402Search,
};

fn fast_policy() -> RetryPolicy {
	RetryPolicy::default()
		.with_base_delay(Duration::milliseconds(1))
		.with_max_delay(Duration::milliseconds(10))
}

fn build_client(server: &MockServer, policy: RetryPolicy) -> ReqwestRencomClient {
	let config = ClientConfig::builder()
		.base_url(Url::parse(&server.base_url()).expect("Mock base URL should parse."))
		.credentials(Credentials::api_key("rk_retry_it"))
		.retry_policy(policy)
		.build()
		.expect("Client config should build for retry tests.");

	Client::new(config).expect("Reqwest client should build for retry tests.")
}

#[tokio::test]
async fn server_errors_are_retried_until_attempts_run_out() {
	let server = MockServer::start_async().await;
	let client = build_client(&server, fast_policy());
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/x402/v1/search");
			then.status(503)
				.header("content-type", "application/json")
				.body(r#"{"detail":"Service unavailable"}"#);
		})
		.await;
	let err = client
		.x402()
		.search(&X402Search::new("weather"))
		.await
		.expect_err("Persistent 503s should surface after the final attempt.");

	assert!(matches!(
		err,
		Error::Transient(TransientError::Server { status: 503, ref message, .. })
			if message == "Service unavailable"
	));
	assert_eq!(client.metrics().attempts(), 3);
	assert_eq!(client.metrics().retries(), 2);
	assert_eq!(client.metrics().failures(), 1);

	mock.assert_calls_async(3).await;
}

#[tokio::test]
async fn disabled_retries_send_a_single_request() {
	let server = MockServer::start_async().await;
	let client = build_client(&server, RetryPolicy::no_retry());
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/x402/v1/search");
			then.status(502).body("bad gateway");
		})
		.await;
	let err = client
		.x402()
		.search(&X402Search::new("weather"))
		.await
		.expect_err("A single 502 should surface immediately.");

	assert_eq!(err.status(), Some(502));

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn rate_limits_surface_quota_details_when_not_retried() {
	let server = MockServer::start_async().await;
	let client = build_client(&server, fast_policy().with_retry_rate_limits(false));
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/x402/v1/search");
			then.status(429)
				.header("content-type", "application/json")
				.header("Retry-After", "30")
				.header("X-RateLimit-Limit-Minute", "60")
				.header("X-RateLimit-Remaining-Minute", "0")
				.body(r#"{"detail":"Rate limit exceeded"}"#);
		})
		.await;
	let err = client
		.x402()
		.search(&X402Search::new("weather"))
		.await
		.expect_err("429 responses should surface when rate-limit retries are disabled.");
	let Error::RateLimited(err) = err else {
		panic!("Expected a rate-limit error, got {err:?}.");
	};

	assert_eq!(err.retry_after, Some(Duration::seconds(30)));
	assert_eq!(err.limit, Some(60));
	assert_eq!(err.remaining, Some(0));
	assert_eq!(client.rate_limit_state().remaining, Some(0));

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn rate_limits_honor_retry_after_between_attempts() {
	let server = MockServer::start_async().await;
	let client = build_client(&server, fast_policy().with_max_attempts(2));
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/x402/v1/search");
			then.status(429).header("Retry-After", "1").body(r#"{"detail":"Slow down"}"#);
		})
		.await;
	let started = Instant::now();
	let err = client
		.x402()
		.search(&X402Search::new("weather"))
		.await
		.expect_err("Persistent 429s should surface after the final attempt.");

	assert!(matches!(err, Error::RateLimited(_)));
	assert!(started.elapsed() >= std::time::Duration::from_secs(1));

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn quota_headers_update_the_tracker() {
	let server = MockServer::start_async().await;
	let client = build_client(&server, fast_policy());
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/x402/v1/search");
			then.status(200)
				.header("content-type", "application/json")
				.header("X-RateLimit-Limit-Minute", "60")
				.header("X-RateLimit-Remaining-Minute", "42")
				.header("X-RateLimit-Limit-Daily", "1000")
				.header("X-RateLimit-Remaining-Daily", "900")
				.body(r#"{"results":[],"has_more":false}"#);
		})
		.await;

	client
		.x402()
		.search(&X402Search::new("weather"))
		.await
		.expect("Search should succeed against the mock server.");

	let state = client.rate_limit_state();

	assert_eq!(state.limit, Some(60));
	assert_eq!(state.remaining, Some(42));
	assert_eq!(state.daily_limit, Some(1000));
	assert_eq!(state.daily_remaining, Some(900));
	assert!(!state.is_exhausted());
	assert_eq!(client.metrics().successes(), 1);

	mock.assert_calls_async(1).await;
}
