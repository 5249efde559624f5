//! Walks an x402 search lazily with the default reqwest transport, then prints the quota
//! figures the server reported along the way.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use rencom::{
	Client, ClientConfig,
	auth::Credentials,
	url::Url,
	x402::{SortBy, X402Search},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let first = server
		.mock_async(|when, then| {
			when.method(GET).path("/x402/v1/search").query_param("offset", "0");
			then.status(200)
				.header("content-type", "application/json")
				.header("X-RateLimit-Limit-Minute", "60")
				.header("X-RateLimit-Remaining-Minute", "58")
				.body(
					r#"{"results":[{"resource":"https://api.example.com/weather"},{"resource":"https://api.example.com/forecast"}],"has_more":true}"#,
				);
		})
		.await;
	let second = server
		.mock_async(|when, then| {
			when.method(GET).path("/x402/v1/search").query_param("offset", "2");
			then.status(200)
				.header("content-type", "application/json")
				.header("X-RateLimit-Limit-Minute", "60")
				.header("X-RateLimit-Remaining-Minute", "57")
				.body(r#"{"results":[{"resource":"https://api.example.com/radar"}],"has_more":false}"#);
		})
		.await;
	let config = ClientConfig::builder()
		.base_url(Url::parse(&server.base_url())?)
		.credentials(Credentials::api_key("rk_demo_key"))
		.build()?;
	let client = Client::new(config)?;
	let mut pager = client
		.x402()
		.search_iter(&X402Search::new("weather data").with_sort_by(SortBy::MostUsed).with_limit(2))?;

	while let Some(result) = pager.next().await {
		println!("Found resource: {}.", result?.resource);
	}

	let quota = client.rate_limit_state();

	println!(
		"Fetched {} pages; {:?} of {:?} requests left this minute.",
		pager.pages_fetched(),
		quota.remaining,
		quota.limit
	);

	first.assert_async().await;
	second.assert_async().await;

	Ok(())
}
