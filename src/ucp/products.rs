// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	client::{ApiRequest, Client},
	paginate::{JsonPageDecoder, PageRequest, Pager},
	transport::HttpTransport,
	ucp::{ResultId, validate_limit},
};

/// Product search endpoint.
pub const PRODUCTS_SEARCH_PATH: &str = "/ucp/v1/products/search";

/// Product condition filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
	/// Brand new.
	New,
	/// Previously owned.
	Used,
	/// Restored by the seller or manufacturer.
	Refurbished,
}
impl Condition {
	/// Returns the wire value.
	pub const fn as_str(self) -> &'static str {
		match self {
			Condition::New => "new",
			Condition::Used => "used",
			Condition::Refurbished => "refurbished",
		}
	}
}
impl Display for Condition {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Product search parameters; prices are expressed in cents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductSearch {
	/// Free-text query (e.g. `running shoes`).
	pub query: String,
	/// Minimum price in cents.
	pub price_min: Option<u64>,
	/// Maximum price in cents.
	pub price_max: Option<u64>,
	/// Single category filter.
	pub category: Option<String>,
	/// Multiple category filter.
	pub categories: Vec<String>,
	/// Brand filter.
	pub brand: Option<String>,
	/// Condition filter.
	pub condition: Option<Condition>,
	/// Restrict the search to these merchant domains.
	pub merchant_domains: Vec<String>,
	/// Page size (1-100, default 20).
	pub limit: Option<u32>,
	/// Offset of the first result.
	pub offset: u64,
	/// Session id for analytics attribution.
	pub session_id: Option<String>,
}
impl ProductSearch {
	/// Creates a search for `query`.
	pub fn new(query: impl Into<String>) -> Self {
		Self { query: query.into(), ..Self::default() }
	}

	/// Sets the inclusive price range in cents; either bound may be omitted.
	pub fn price_range(mut self, min: Option<u64>, max: Option<u64>) -> Self {
		self.price_min = min;
		self.price_max = max;

		self
	}

	/// Filters by a single category.
	pub fn category(mut self, category: impl Into<String>) -> Self {
		self.category = Some(category.into());

		self
	}

	/// Adds a category to the multi-category filter.
	pub fn add_category(mut self, category: impl Into<String>) -> Self {
		self.categories.push(category.into());

		self
	}

	/// Filters by brand.
	pub fn brand(mut self, brand: impl Into<String>) -> Self {
		self.brand = Some(brand.into());

		self
	}

	/// Filters by condition.
	pub fn condition(mut self, condition: Condition) -> Self {
		self.condition = Some(condition);

		self
	}

	/// Restricts the search to a merchant domain; may be called repeatedly.
	pub fn merchant_domain(mut self, domain: impl Into<String>) -> Self {
		self.merchant_domains.push(domain.into());

		self
	}

	/// Overrides the page size.
	pub fn limit(mut self, limit: u32) -> Self {
		self.limit = Some(limit);

		self
	}

	/// Overrides the starting offset.
	pub fn offset(mut self, offset: u64) -> Self {
		self.offset = offset;

		self
	}

	/// Attaches an analytics session id.
	pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
		self.session_id = Some(session_id.into());

		self
	}

	fn validate(&self) -> Result<u32> {
		if self.query.trim().is_empty() {
			return Err(Error::validation("search query must not be empty"));
		}
		if matches!((self.price_min, self.price_max), (Some(min), Some(max)) if min > max) {
			return Err(Error::validation("price_min must not exceed price_max"));
		}

		validate_limit(self.limit)
	}

	fn endpoint(&self) -> ApiRequest {
		ApiRequest::get(PRODUCTS_SEARCH_PATH)
			.query("q", &self.query)
			.query_opt("price_min", self.price_min)
			.query_opt("price_max", self.price_max)
			.query_opt("category", self.category.as_ref())
			.query_all("categories", &self.categories)
			.query_opt("brand", self.brand.as_ref())
			.query_opt("condition", self.condition)
			.query_all("merchant_domains", &self.merchant_domains)
			.query_opt("session_id", self.session_id.as_ref())
	}
}

/// One product in a search page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductSearchResult {
	/// Product identifier.
	#[serde(default)]
	pub id: Option<ResultId>,
	/// Product name.
	pub name: String,
	/// Product description.
	#[serde(default)]
	pub description: Option<String>,
	/// Price in the smallest currency unit.
	#[serde(default)]
	pub price_cents: Option<i64>,
	/// ISO 4217 currency code.
	#[serde(default)]
	pub currency: Option<String>,
	/// Domain of the selling merchant.
	#[serde(default)]
	pub merchant_domain: Option<String>,
	/// Every other field returned by the server.
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}

/// One page of product search results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductSearchResponse {
	/// Matching products.
	pub products: Vec<ProductSearchResult>,
	/// Whether another page is available.
	#[serde(default)]
	pub has_more: bool,
	/// Total matches, when reported.
	#[serde(default)]
	pub total: Option<u64>,
	/// Identifier to reference in click analytics.
	#[serde(default)]
	pub search_log_id: Option<i64>,
	/// Every other field returned by the server.
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}

/// Product endpoints borrowed from a [`Client`].
#[derive(Debug)]
pub struct Products<'a, C>
where
	C: ?Sized + HttpTransport,
{
	client: &'a Client<C>,
}
impl<'a, C> Products<'a, C>
where
	C: ?Sized + HttpTransport,
{
	pub(crate) fn new(client: &'a Client<C>) -> Self {
		Self { client }
	}

	/// Runs one product search page.
	pub async fn search(&self, search: &ProductSearch) -> Result<ProductSearchResponse> {
		let limit = search.validate()?;
		let request = search.endpoint().query("limit", limit).query("offset", search.offset);

		self.client.send_json(&request).await
	}

	/// Lazily walks every matching product.
	pub fn search_iter(&self, search: &ProductSearch) -> Result<Pager<ProductSearchResult, C>> {
		let page_size = search.validate()?;
		let request =
			PageRequest::new(search.endpoint(), page_size).with_start_offset(search.offset);

		self.client.paginate(request, JsonPageDecoder::offset("products"))
	}
}
