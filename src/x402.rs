//! x402 resource search: discovery of APIs that accept blockchain payments.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	client::{ApiRequest, Client},
	paginate::{JsonPageDecoder, PageRequest, Pager},
	transport::HttpTransport,
};

/// Free search endpoint.
pub const SEARCH_PATH: &str = "/x402/v1/search";
/// Pay-per-call search endpoint.
pub const PAID_SEARCH_PATH: &str = "/x402/v1/paid/search";
/// Header carrying an x402 payment payload.
pub const PAYMENT_HEADER: &str = "X-PAYMENT";

/// Largest page the search endpoints accept.
pub const MAX_LIMIT: u32 = 5;
const DEFAULT_LIMIT: u32 = 3;
const DEFAULT_ITER_PAGE_SIZE: u32 = 5;

/// Ranking applied to x402 search results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
	/// Weighted combination of every ranking signal.
	#[default]
	Recommended,
	/// Cheapest first.
	PriceLow,
	/// Most expensive first.
	PriceHigh,
	/// Most recently discovered first.
	Newest,
	/// Highest popularity score first.
	MostPopular,
	/// Most total API calls first.
	MostUsed,
}
impl SortBy {
	/// Returns the wire value.
	pub const fn as_str(self) -> &'static str {
		match self {
			SortBy::Recommended => "recommended",
			SortBy::PriceLow => "price_low",
			SortBy::PriceHigh => "price_high",
			SortBy::Newest => "newest",
			SortBy::MostPopular => "most_popular",
			SortBy::MostUsed => "most_used",
		}
	}
}
impl Display for SortBy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Parameters for x402 searches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct X402Search {
	/// Free-text query; natural language works well.
	pub query: String,
	/// Result ordering.
	pub sort_by: SortBy,
	/// Page size (1-5). Defaults to 3 for single searches and 5 for iteration.
	pub limit: Option<u32>,
	/// Offset of the first result.
	pub offset: u64,
}
impl X402Search {
	/// Creates a search for `query` with default ordering and paging.
	pub fn new(query: impl Into<String>) -> Self {
		Self { query: query.into(), sort_by: SortBy::default(), limit: None, offset: 0 }
	}

	/// Overrides the ordering.
	pub fn with_sort_by(mut self, sort_by: SortBy) -> Self {
		self.sort_by = sort_by;

		self
	}

	/// Overrides the page size.
	pub fn with_limit(mut self, limit: u32) -> Self {
		self.limit = Some(limit);

		self
	}

	/// Overrides the starting offset.
	pub fn with_offset(mut self, offset: u64) -> Self {
		self.offset = offset;

		self
	}

	fn validate(&self, default_limit: u32) -> Result<u32> {
		if self.query.trim().is_empty() {
			return Err(Error::validation("search query must not be empty"));
		}

		let limit = self.limit.unwrap_or(default_limit);

		if !(1..=MAX_LIMIT).contains(&limit) {
			return Err(Error::validation(format!("limit must be between 1 and {MAX_LIMIT}")));
		}

		Ok(limit)
	}

	fn endpoint(&self, path: &str) -> ApiRequest {
		ApiRequest::get(path).query("q", &self.query).query("sort_by", self.sort_by)
	}
}

/// One x402 resource ranked by the search engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceSearchResult {
	/// Catalog identifier.
	#[serde(default)]
	pub id: Option<i64>,
	/// Resource URL.
	pub resource: String,
	/// Human-readable description.
	#[serde(default)]
	pub description: Option<String>,
	/// Settlement network (e.g. `base`).
	#[serde(default)]
	pub network: Option<String>,
	/// Combined ranking score.
	#[serde(default)]
	pub final_score: Option<f64>,
	/// Every other field returned by the server.
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}

/// One page of x402 search results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
	/// Ranked results.
	pub results: Vec<ResourceSearchResult>,
	/// Whether another page is available.
	#[serde(default)]
	pub has_more: bool,
	/// Page size applied by the server.
	#[serde(default)]
	pub limit: Option<u32>,
	/// Offset applied by the server.
	#[serde(default)]
	pub offset: Option<u64>,
	/// Query echoed back by the server.
	#[serde(default)]
	pub query: Option<String>,
	/// Ordering echoed back by the server.
	#[serde(default)]
	pub sort_by: Option<SortBy>,
	/// Every other field returned by the server.
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}

/// x402 endpoints borrowed from a [`Client`].
#[derive(Debug)]
pub struct X402<'a, C>
where
	C: ?Sized + HttpTransport,
{
	client: &'a Client<C>,
}
impl<'a, C> X402<'a, C>
where
	C: ?Sized + HttpTransport,
{
	pub(crate) fn new(client: &'a Client<C>) -> Self {
		Self { client }
	}

	/// Runs one search page.
	pub async fn search(&self, search: &X402Search) -> Result<SearchResponse> {
		let limit = search.validate(DEFAULT_LIMIT)?;
		let request = search.endpoint(SEARCH_PATH).query("limit", limit).query("offset", search.offset);

		self.client.send_json(&request).await
	}

	/// Runs one search page on the pay-per-call endpoint.
	///
	/// `payment` is an x402 payment payload produced by the caller's wallet tooling and is
	/// sent verbatim as the `X-PAYMENT` header.
	pub async fn paid_search(
		&self,
		search: &X402Search,
		payment: Option<&str>,
	) -> Result<SearchResponse> {
		let limit = search.validate(DEFAULT_LIMIT)?;
		let mut request =
			search.endpoint(PAID_SEARCH_PATH).query("limit", limit).query("offset", search.offset);

		if let Some(payment) = payment {
			request = request.header(PAYMENT_HEADER, payment);
		}

		self.client.send_json(&request).await
	}

	/// Lazily walks every result, following `has_more` page by page.
	pub fn search_iter(&self, search: &X402Search) -> Result<Pager<ResourceSearchResult, C>> {
		let page_size = search.validate(DEFAULT_ITER_PAGE_SIZE)?;
		let request =
			PageRequest::new(search.endpoint(SEARCH_PATH), page_size).with_start_offset(search.offset);

		self.client.paginate(request, JsonPageDecoder::offset("results"))
	}
}
