//! Request layer: credential headers, URL construction, quota waits, retries, and
//! status-code mapping.

/// Per-client request counters.
pub mod metrics;

pub use metrics::*;

// crates.io
use http::{
	Method,
	header::{ACCEPT, CONTENT_TYPE, USER_AGENT},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	error::{ConfigError, DecodeError, RateLimitError, TransientError},
	obs::{self, CallKind, CallOutcome, CallSpan},
	paginate::{PageDecoder, PageRequest, Pager},
	rate_limit::{self, RateLimitDecision, RateLimitState, RateLimitTracker},
	retry,
	transport::{HttpRequest, HttpResponse, HttpTransport},
	ucp::Ucp,
	x402::X402,
};
#[cfg(feature = "reqwest")] use crate::transport::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestRencomClient = Client<ReqwestTransport>;

/// Transport-agnostic description of one API call.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Endpoint path relative to the base URL.
	pub path: String,
	/// Query parameters in send order; repeated keys are allowed.
	pub query: Vec<(String, String)>,
	/// Optional JSON body.
	pub body: Option<Value>,
	/// Extra headers sent after the default and authentication headers.
	pub headers: Vec<(String, String)>,
}
impl ApiRequest {
	/// Creates a request for `method` + `path` with no parameters.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), query: Vec::new(), body: None, headers: Vec::new() }
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Appends a query parameter.
	pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
		self.query.push((key.into(), value.to_string()));

		self
	}

	/// Appends a query parameter when `value` is present.
	pub fn query_opt<V>(self, key: impl Into<String>, value: Option<V>) -> Self
	where
		V: ToString,
	{
		match value {
			Some(value) => self.query(key, value),
			None => self,
		}
	}

	/// Appends one `key=value` pair per element of `values`.
	pub fn query_all<I>(mut self, key: &str, values: I) -> Self
	where
		I: IntoIterator,
		I::Item: ToString,
	{
		for value in values {
			self.query.push((key.to_owned(), value.to_string()));
		}

		self
	}

	/// Replaces every occurrence of `key` with a single `key=value` pair.
	pub fn set_query(&mut self, key: &str, value: impl ToString) {
		self.remove_query(key);
		self.query.push((key.to_owned(), value.to_string()));
	}

	/// Removes every occurrence of `key`.
	pub fn remove_query(&mut self, key: &str) {
		self.query.retain(|(k, _)| k != key);
	}

	/// Sets the JSON body.
	pub fn json(mut self, body: Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Appends an extra header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}
}

/// Async client for the Rencom API.
///
/// The client owns the transport, the validated configuration, the rate-limit tracker and
/// the request metrics behind `Arc`s, so clones are cheap and share all of them. Separate
/// client instances share nothing.
pub struct Client<C>
where
	C: ?Sized + HttpTransport,
{
	transport: Arc<C>,
	config: Arc<ClientConfig>,
	rate_limit: Arc<RateLimitTracker>,
	metrics: Arc<RequestMetrics>,
}
impl<C> Client<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a client that sends every request through `transport`.
	pub fn with_transport(config: ClientConfig, transport: Arc<C>) -> Self {
		Self {
			transport,
			config: Arc::new(config),
			rate_limit: Default::default(),
			metrics: Default::default(),
		}
	}

	/// Validated configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Underlying transport.
	pub fn transport(&self) -> &Arc<C> {
		&self.transport
	}

	/// Copy of the quota figures last reported by the server.
	pub fn rate_limit_state(&self) -> RateLimitState {
		self.rate_limit.snapshot()
	}

	/// Shared quota tracker.
	pub fn rate_limit(&self) -> &RateLimitTracker {
		&self.rate_limit
	}

	/// Request counters shared by every clone of this client.
	pub fn metrics(&self) -> &RequestMetrics {
		&self.metrics
	}

	/// x402 resource search endpoints.
	pub fn x402(&self) -> X402<'_, C> {
		X402::new(self)
	}

	/// Universal Commerce Protocol endpoints.
	pub fn ucp(&self) -> Ucp<'_, C> {
		Ucp::new(self)
	}

	/// Sends `request` with retries and returns the raw successful response.
	pub async fn send(&self, request: &ApiRequest) -> Result<HttpResponse> {
		self.execute(request, CallKind::Request).await
	}

	/// Sends `request` with retries and decodes the JSON body into `T`.
	///
	/// An empty body decodes as JSON `null`.
	pub async fn send_json<T>(&self, request: &ApiRequest) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let response = self.send(request).await?;

		decode_json(response.body()).map_err(|source| Error::Decode { page_token: None, source })
	}

	/// Starts a lazy page sequence for `request`, decoding each page with `decoder`.
	///
	/// Nothing is sent until the returned [`Pager`] is polled. A page size of zero is
	/// rejected up front.
	pub fn paginate<D>(&self, request: PageRequest, decoder: D) -> Result<Pager<D::Item, C>>
	where
		D: 'static + PageDecoder + Send + Sync,
	{
		if request.page_size == 0 {
			return Err(Error::validation("page size must be greater than zero"));
		}

		Ok(Pager::new(self.clone(), request, Box::new(decoder)))
	}

	/// Runs one logical call (all of its attempts) under a `rencom.call` span.
	pub(crate) async fn execute(
		&self,
		request: &ApiRequest,
		kind: CallKind,
	) -> Result<HttpResponse> {
		let span = CallSpan::new(kind, &request.path);

		span.instrument(async move {
			let result = self
				.config
				.retry_policy
				.execute(&self.rate_limit, |attempt| self.attempt(request, kind, attempt))
				.await;

			match &result {
				Ok(_) => {
					self.metrics.record_success();
					obs::record_call_outcome(kind, CallOutcome::Success);
				},
				Err(_) => {
					self.metrics.record_failure();
					obs::record_call_outcome(kind, CallOutcome::Failure);
				},
			}

			result
		})
		.await
	}

	async fn attempt(
		&self,
		request: &ApiRequest,
		kind: CallKind,
		attempt: u32,
	) -> Result<HttpResponse> {
		let http_request = self.build_request(request)?;

		if attempt > 1 {
			self.metrics.record_retry();
			obs::record_call_outcome(kind, CallOutcome::Retry);
		}
		if let RateLimitDecision::Delay(directive) = self.rate_limit.reserve() {
			self.metrics.record_rate_limit_wait();
			obs::log_quota_wait(directive.recommended_backoff);
			retry::sleep(directive.recommended_backoff).await;
		}

		self.metrics.record_attempt();
		obs::record_call_outcome(kind, CallOutcome::Attempt);

		let response = self.transport.send(http_request).await?;

		self.rate_limit.observe(response.headers());

		if response.status().is_success() { Ok(response) } else { Err(error_from_response(&response)) }
	}

	fn build_request(&self, request: &ApiRequest) -> Result<HttpRequest, ConfigError> {
		let mut url = self.config.endpoint(&request.path)?;

		if !request.query.is_empty() {
			url.query_pairs_mut().extend_pairs(request.query.iter());
		}

		let body = match &request.body {
			Some(value) => serde_json::to_vec(value)?,
			None => Vec::new(),
		};
		let mut builder = http::Request::builder()
			.method(request.method.clone())
			.uri(url.as_str())
			.header(CONTENT_TYPE, "application/json")
			.header(ACCEPT, "application/json")
			.header(USER_AGENT, self.config.user_agent.as_str());

		if let Some((name, value)) = self.config.credentials.auth_header() {
			builder = builder.header(name, value);
		}
		for (name, value) in &request.headers {
			builder = builder.header(name.as_str(), value.as_str());
		}

		Ok(builder.body(body)?)
	}
}
#[cfg(feature = "reqwest")]
impl Client<ReqwestTransport> {
	/// Creates a client backed by a reqwest transport honoring [`ClientConfig::timeout`].
	pub fn new(config: ClientConfig) -> Result<Self> {
		let transport = ReqwestTransport::with_timeout(config.timeout)?;

		Ok(Self::with_transport(config, Arc::new(transport)))
	}

	/// Creates a client with default settings, authenticating with `RENCOM_API_KEY`.
	pub fn from_env() -> Result<Self> {
		Self::new(ClientConfig::builder().build()?)
	}
}
impl<C> Clone for Client<C>
where
	C: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: Arc::clone(&self.transport),
			config: Arc::clone(&self.config),
			rate_limit: Arc::clone(&self.rate_limit),
			metrics: Arc::clone(&self.metrics),
		}
	}
}
impl<C> Debug for Client<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("base_url", &self.config.base_url.as_str())
			.field("credentials", &self.config.credentials)
			.field("rate_limit", &self.rate_limit.snapshot())
			.finish()
	}
}

/// Decodes a JSON body, reporting the path of the first mismatching field.
pub(crate) fn decode_json<T>(body: &[u8]) -> Result<T, DecodeError>
where
	T: DeserializeOwned,
{
	let body = if body.iter().all(u8::is_ascii_whitespace) { b"null".as_slice() } else { body };
	let mut de = serde_json::Deserializer::from_slice(body);
	let value = serde_path_to_error::deserialize(&mut de)?;

	de.end().map_err(DecodeError::TrailingData)?;

	Ok(value)
}

fn error_from_response(response: &HttpResponse) -> Error {
	let status = response.status().as_u16();
	let headers = response.headers();
	let (message, errors) = parse_error_body(status, response.body());

	match status {
		400 | 422 => Error::Validation { message, errors },
		401 => Error::Authentication { reason: message },
		403 => Error::Authorization { reason: message },
		404 => Error::NotFound { reason: message },
		429 => RateLimitError {
			message,
			retry_after: rate_limit::parse_retry_after(headers),
			limit: rate_limit::header_u64(headers, rate_limit::LIMIT_MINUTE_HEADER),
			remaining: rate_limit::header_u64(headers, rate_limit::REMAINING_MINUTE_HEADER),
			reset_at: rate_limit::header_timestamp(headers, rate_limit::RESET_HEADER),
		}
		.into(),
		500..=599 => TransientError::Server {
			status,
			message,
			retry_after: rate_limit::parse_retry_after(headers),
		}
		.into(),
		_ => Error::Api { status, message },
	}
}

/// Extracts `(message, errors)` from an error body.
///
/// The message comes from `detail` when the body is JSON, falling back to the raw body and
/// then to `HTTP <status>`. Structured `detail` arrays double as field-level errors.
fn parse_error_body(status: u16, body: &[u8]) -> (String, Vec<Value>) {
	let raw = String::from_utf8_lossy(body).trim().to_owned();
	let fallback = if raw.is_empty() { format!("HTTP {status}") } else { raw };
	let Ok(Value::Object(mut object)) = serde_json::from_slice::<Value>(body) else {
		return (fallback, Vec::new());
	};
	let mut errors = match object.remove("errors") {
		Some(Value::Array(errors)) => errors,
		_ => Vec::new(),
	};
	let message = match object.remove("detail") {
		Some(Value::String(detail)) => detail,
		Some(Value::Array(details)) => {
			let message = Value::Array(details.clone()).to_string();

			if errors.is_empty() {
				errors = details;
			}

			message
		},
		Some(Value::Null) | None => fallback,
		Some(other) => other.to_string(),
	};

	(message, errors)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::*,
		error::TransportError,
		retry::RetryPolicy,
	};

	#[tokio::test]
	async fn requests_carry_auth_user_agent_and_query() {
		let transport = Arc::new(ScriptedTransport::default().json(r#"{"ok":true}"#));
		let client = scripted_client(transport.clone());
		let request = ApiRequest::get("/ucp/v1/merchants")
			.query_all("capabilities", ["checkout", "catalog"])
			.query("limit", 20);
		let value: Value = client.send_json(&request).await.expect("Request should succeed.");

		assert_eq!(value, serde_json::json!({ "ok": true }));

		let requests = transport.requests();
		let (uri, headers) = &requests[0];

		assert_eq!(
			uri,
			"https://api.test.rencom.ai/ucp/v1/merchants?capabilities=checkout&capabilities=catalog&limit=20"
		);
		assert_eq!(headers["x-api-key"], "rk_test_key");
		assert_eq!(headers["content-type"], "application/json");
		assert!(headers["user-agent"].to_str().expect("ASCII header").starts_with("rencom-rs/"));
		assert!(headers.get("authorization").is_none());
	}

	#[tokio::test]
	async fn status_codes_map_to_error_variants() {
		let transport = Arc::new(
			ScriptedTransport::default()
				.respond(400, &[], r#"{"detail":"Query cannot be empty","errors":[{"field":"q"}]}"#)
				.respond(401, &[], r#"{"detail":"Invalid API key"}"#)
				.respond(403, &[], r#"{"detail":"Admin only"}"#)
				.respond(404, &[], r#"{"detail":"Merchant not found"}"#)
				.respond(418, &[], "short and stout"),
		);
		let client = scripted_client(transport.clone());
		let request = ApiRequest::get("/x402/v1/search");

		match client.send(&request).await {
			Err(Error::Validation { message, errors }) => {
				assert_eq!(message, "Query cannot be empty");
				assert_eq!(errors, vec![serde_json::json!({ "field": "q" })]);
			},
			other => panic!("Unexpected result: {other:?}"),
		}
		assert!(matches!(
			client.send(&request).await,
			Err(Error::Authentication { reason }) if reason == "Invalid API key"
		));
		assert!(matches!(client.send(&request).await, Err(Error::Authorization { .. })));
		assert!(matches!(
			client.send(&request).await,
			Err(Error::NotFound { reason }) if reason == "Merchant not found"
		));
		assert!(matches!(
			client.send(&request).await,
			Err(Error::Api { status: 418, message }) if message == "short and stout"
		));
		assert_eq!(transport.calls(), 5);
		assert_eq!(client.metrics().failures(), 5);
	}

	#[tokio::test]
	async fn unprocessable_entity_keeps_detail_array_as_errors() {
		let transport = Arc::new(ScriptedTransport::default().respond(
			422,
			&[],
			r#"{"detail":[{"loc":["query","limit"],"msg":"too large"}]}"#,
		));
		let client = scripted_client(transport);
		let err = client
			.send(&ApiRequest::get("/x402/v1/search"))
			.await
			.expect_err("422 should fail.");
		let Error::Validation { errors, .. } = err else {
			panic!("422 should map to a validation error.");
		};

		assert_eq!(errors.len(), 1);
		assert_eq!(errors[0]["msg"], "too large");
	}

	#[tokio::test]
	async fn server_errors_retry_then_succeed() {
		let transport = Arc::new(
			ScriptedTransport::default()
				.respond(503, &[], r#"{"detail":"maintenance"}"#)
				.network_failure()
				.json(r#"{"results":[]}"#),
		);
		let client = scripted_client(transport.clone());

		client.send(&ApiRequest::get("/x402/v1/search")).await.expect("Third attempt should succeed.");

		assert_eq!(transport.calls(), 3);
		assert_eq!(client.metrics().attempts(), 3);
		assert_eq!(client.metrics().retries(), 2);
		assert_eq!(client.metrics().successes(), 1);
	}

	#[tokio::test]
	async fn exhausted_retries_surface_the_last_transient_error() {
		let transport = Arc::new(ScriptedTransport::default().network_failure().always_respond(
			502,
			&[],
			"bad gateway",
		));
		let client = scripted_client(transport.clone());
		let err = client
			.send(&ApiRequest::get("/x402/v1/search"))
			.await
			.expect_err("Every attempt fails.");

		assert_eq!(transport.calls(), 3);
		assert!(matches!(
			err,
			Error::Transient(TransientError::Server { status: 502, ref message, .. }) if message == "bad gateway"
		));
	}

	#[tokio::test]
	async fn timeouts_are_transient() {
		let transport = Arc::new(ScriptedTransport::default().timeout().timeout().timeout());
		let client = scripted_client(transport.clone());
		let err = client
			.send(&ApiRequest::get("/x402/v1/search"))
			.await
			.expect_err("Every attempt times out.");

		assert!(matches!(err, Error::Transient(TransientError::Transport(TransportError::Timeout))));
		assert_eq!(transport.calls(), 3);
	}

	#[tokio::test]
	async fn rate_limits_propagate_when_retries_disabled() {
		let transport = Arc::new(ScriptedTransport::default().respond(
			429,
			&[
				("retry-after", "30"),
				("x-ratelimit-limit-minute", "60"),
				("x-ratelimit-remaining-minute", "0"),
				("x-ratelimit-reset", "1735689630"),
			],
			r#"{"detail":"Rate limit exceeded"}"#,
		));
		let config = ClientConfig::builder()
			.base_url(Url::parse("https://api.test.rencom.ai").expect("URL should parse."))
			.api_key("rk_test_key")
			.retry_policy(fast_retry_policy().with_retry_rate_limits(false))
			.build()
			.expect("Config should build.");
		let client = Client::with_transport(config, transport.clone());
		let err = client
			.send(&ApiRequest::get("/x402/v1/search"))
			.await
			.expect_err("429 should propagate.");
		let Error::RateLimited(e) = err else {
			panic!("429 should map to a rate-limit error.");
		};

		assert_eq!(e.message, "Rate limit exceeded");
		assert_eq!(e.retry_after, Some(Duration::seconds(30)));
		assert_eq!(e.limit, Some(60));
		assert_eq!(e.remaining, Some(0));
		assert_eq!(e.reset_at.map(OffsetDateTime::unix_timestamp), Some(1_735_689_630));
		assert_eq!(transport.calls(), 1);
		assert_eq!(client.rate_limit_state().remaining, Some(0));
	}

	#[tokio::test(start_paused = true)]
	async fn rate_limit_retry_sleeps_at_least_should_wait() {
		let now = OffsetDateTime::now_utc();
		let reset = now.unix_timestamp() + 5;
		let reset_header = reset.to_string();
		let transport = Arc::new(
			ScriptedTransport::default()
				.respond(
					429,
					&[("x-ratelimit-remaining-minute", "0"), ("x-ratelimit-reset", &reset_header)],
					r#"{"detail":"Rate limit exceeded"}"#,
				)
				.json(r#"{"ok":true}"#),
		);
		let config = ClientConfig::builder()
			.base_url(Url::parse("https://api.test.rencom.ai").expect("URL should parse."))
			.api_key("rk_test_key")
			.retry_policy(RetryPolicy::default())
			.build()
			.expect("Config should build.");
		let client = Client::with_transport(config, transport.clone());
		let should_wait =
			OffsetDateTime::from_unix_timestamp(reset).expect("Reset should be valid.") - now;
		let started = tokio::time::Instant::now();

		client.send(&ApiRequest::get("/x402/v1/search")).await.expect("Retry should succeed.");

		let elapsed = started.elapsed();

		assert_eq!(transport.calls(), 2);
		assert!(should_wait >= Duration::ZERO && should_wait <= Duration::seconds(5));
		// Tolerates the wall-clock drift between this read and the tracker's own.
		assert!(
			elapsed + std::time::Duration::from_millis(50) >= should_wait.unsigned_abs(),
			"elapsed {elapsed:?}, expected at least {should_wait}"
		);
	}

	#[test]
	fn error_body_falls_back_to_raw_text_and_status() {
		assert_eq!(parse_error_body(500, b"").0, "HTTP 500");
		assert_eq!(parse_error_body(500, b"upstream exploded").0, "upstream exploded");
		assert_eq!(parse_error_body(500, br#"{"detail":null}"#).0, r#"{"detail":null}"#);
		assert_eq!(parse_error_body(400, br#"{"detail":{"code":7}}"#).0, r#"{"code":7}"#);
	}

	#[test]
	fn empty_bodies_decode_as_null() {
		let value: Option<Value> = decode_json(b"  ").expect("Empty body should decode.");

		assert_eq!(value, None);
	}

	#[test]
	fn trailing_bytes_fail_json_decoding() {
		let err = decode_json::<Value>(br#"{"ok":true}garbage"#)
			.expect_err("Trailing bytes should be rejected.");

		assert!(matches!(err, DecodeError::TrailingData(_)));
		assert!(decode_json::<Value>(b"{\"ok\":true}\n  ").is_ok());
	}

	#[tokio::test]
	async fn send_json_rejects_trailing_garbage() {
		let transport = Arc::new(ScriptedTransport::default().json(r#"{"ok":true}garbage"#));
		let client = scripted_client(transport.clone());
		let result = client.send_json::<Value>(&ApiRequest::get("/x402/v1/search")).await;

		assert!(matches!(
			result,
			Err(Error::Decode { page_token: None, source: DecodeError::TrailingData(_) })
		));
		assert_eq!(transport.calls(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn concurrent_requests_never_spend_the_same_quota_unit() {
		let reset = (OffsetDateTime::now_utc().unix_timestamp() + 3).to_string();
		let transport = Arc::new(
			ScriptedTransport::default()
				.respond(
					200,
					&[("x-ratelimit-remaining-minute", "1"), ("x-ratelimit-reset", &reset)],
					r#"{"ok":true}"#,
				)
				.json(r#"{"ok":true}"#)
				.json(r#"{"ok":true}"#),
		);
		let client = scripted_client(transport.clone());
		let request = ApiRequest::get("/x402/v1/search");

		client.send(&request).await.expect("Warm-up request should succeed.");

		assert_eq!(client.rate_limit_state().remaining, Some(1));

		let (first, second) = tokio::join!(client.send(&request), client.send(&request));

		first.expect("First concurrent request should succeed.");
		second.expect("Second concurrent request should succeed.");

		assert_eq!(client.metrics().rate_limit_waits(), 1);
		assert_eq!(client.metrics().successes(), 3);
		assert_eq!(transport.calls(), 3);
	}
}
