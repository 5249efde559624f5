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

/// Merchant search endpoint.
pub const MERCHANTS_PATH: &str = "/ucp/v1/merchants";

/// Filters for merchant discovery. Every filter is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MerchantSearch {
	/// UCP capabilities the merchant must expose (e.g. `dev.ucp.shopping.checkout`).
	pub capabilities: Vec<String>,
	/// Industry filter (e.g. `retail`).
	pub industry: Option<String>,
	/// Region code filter (e.g. `US`).
	pub region: Option<String>,
	/// Restrict to merchants with (or without) a native catalog API.
	pub has_catalog: Option<bool>,
	/// Page size (1-100, default 20).
	pub limit: Option<u32>,
	/// Offset of the first result.
	pub offset: u64,
	/// Session id for analytics attribution.
	pub session_id: Option<String>,
}
impl MerchantSearch {
	/// Creates an unfiltered search.
	pub fn new() -> Self {
		Self::default()
	}

	/// Requires a capability; may be called repeatedly.
	pub fn capability(mut self, capability: impl Into<String>) -> Self {
		self.capabilities.push(capability.into());

		self
	}

	/// Filters by industry.
	pub fn industry(mut self, industry: impl Into<String>) -> Self {
		self.industry = Some(industry.into());

		self
	}

	/// Filters by region code.
	pub fn region(mut self, region: impl Into<String>) -> Self {
		self.region = Some(region.into());

		self
	}

	/// Filters on native catalog support.
	pub fn has_catalog(mut self, has_catalog: bool) -> Self {
		self.has_catalog = Some(has_catalog);

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

	fn endpoint(&self) -> ApiRequest {
		ApiRequest::get(MERCHANTS_PATH)
			.query_all("capabilities", &self.capabilities)
			.query_opt("industry", self.industry.as_ref())
			.query_opt("region", self.region.as_ref())
			.query_opt("has_catalog", self.has_catalog)
			.query_opt("session_id", self.session_id.as_ref())
	}
}

/// One merchant in a search page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MerchantSearchResult {
	/// Merchant identifier.
	#[serde(default)]
	pub id: Option<ResultId>,
	/// Merchant domain.
	pub domain: String,
	/// Display name.
	#[serde(default)]
	pub name: Option<String>,
	/// Industry label.
	#[serde(default)]
	pub industry: Option<String>,
	/// Region code.
	#[serde(default)]
	pub region: Option<String>,
	/// Advertised UCP capabilities.
	#[serde(default)]
	pub capabilities: Vec<String>,
	/// Whether the merchant exposes a native catalog API.
	#[serde(default)]
	pub has_native_catalog: Option<bool>,
	/// Every other field returned by the server.
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}

/// One page of merchant search results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MerchantSearchResponse {
	/// Matching merchants.
	pub merchants: Vec<MerchantSearchResult>,
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

/// Full merchant profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MerchantDetails {
	/// Merchant identifier.
	#[serde(default)]
	pub id: Option<ResultId>,
	/// Merchant domain.
	pub domain: String,
	/// Display name.
	#[serde(default)]
	pub name: Option<String>,
	/// Advertised UCP capabilities.
	#[serde(default)]
	pub capabilities: Vec<String>,
	/// Every other field returned by the server.
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}

/// Merchant endpoints borrowed from a [`Client`].
#[derive(Debug)]
pub struct Merchants<'a, C>
where
	C: ?Sized + HttpTransport,
{
	client: &'a Client<C>,
}
impl<'a, C> Merchants<'a, C>
where
	C: ?Sized + HttpTransport,
{
	pub(crate) fn new(client: &'a Client<C>) -> Self {
		Self { client }
	}

	/// Runs one merchant search page.
	pub async fn search(&self, search: &MerchantSearch) -> Result<MerchantSearchResponse> {
		let limit = validate_limit(search.limit)?;
		let request = search.endpoint().query("limit", limit).query("offset", search.offset);

		self.client.send_json(&request).await
	}

	/// Fetches one merchant by domain.
	pub async fn get(&self, domain: &str) -> Result<MerchantDetails> {
		let domain = domain.trim();

		if !is_domain(domain) {
			return Err(Error::validation(format!("`{domain}` is not a merchant domain")));
		}

		self.client.send_json(&ApiRequest::get(format!("{MERCHANTS_PATH}/{domain}"))).await
	}

	/// Lazily walks every matching merchant.
	pub fn search_iter(&self, search: &MerchantSearch) -> Result<Pager<MerchantSearchResult, C>> {
		let page_size = validate_limit(search.limit)?;
		let request =
			PageRequest::new(search.endpoint(), page_size).with_start_offset(search.offset);

		self.client.paginate(request, JsonPageDecoder::offset("merchants"))
	}
}

/// Bare host names: ASCII letters, digits, `-`, `_`, and `.`, but not dots alone.
fn is_domain(domain: &str) -> bool {
	!domain.trim_matches('.').is_empty()
		&& domain.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::*;

	#[tokio::test]
	async fn search_encodes_repeated_capabilities() {
		let transport = Arc::new(ScriptedTransport::default().json(
			r#"{"merchants":[{"id":1,"domain":"example.com","name":"Example Store","capabilities":["dev.ucp.shopping.checkout"],"has_native_catalog":true}],"has_more":false,"total":1,"search_log_id":77}"#,
		));
		let client = scripted_client(transport.clone());
		let search = MerchantSearch::new()
			.capability("dev.ucp.shopping.checkout")
			.capability("dev.ucp.shopping.cart")
			.industry("retail")
			.has_catalog(true);
		let response = client.ucp().merchants().search(&search).await.expect("Search should succeed.");

		assert_eq!(response.merchants[0].domain, "example.com");
		assert_eq!(response.merchants[0].id, Some(ResultId::Int(1)));
		assert_eq!(response.search_log_id, Some(77));
		assert_eq!(
			transport.queries(),
			["capabilities=dev.ucp.shopping.checkout&capabilities=dev.ucp.shopping.cart&industry=retail&has_catalog=true&limit=20&offset=0"]
		);
	}

	#[tokio::test]
	async fn get_maps_missing_merchants_to_not_found() {
		let transport = Arc::new(
			ScriptedTransport::default()
				.json(r#"{"domain":"example.com","name":"Example Store","capabilities":[]}"#)
				.respond(404, &[], r#"{"detail":"Merchant not found"}"#),
		);
		let client = scripted_client(transport.clone());
		let merchants = client.ucp().merchants();
		let details = merchants.get("example.com").await.expect("Merchant should load.");

		assert_eq!(details.name.as_deref(), Some("Example Store"));
		assert!(matches!(merchants.get("gone.example").await, Err(Error::NotFound { .. })));

		for domain in ["", "a/b", ".", "..", "example.com?x=1", "%2e%2e", "ex ample.com"] {
			assert!(
				matches!(merchants.get(domain).await, Err(Error::Validation { .. })),
				"{domain}"
			);
		}

		assert!(transport.requests()[0].0.ends_with("/ucp/v1/merchants/example.com"));
		assert_eq!(transport.calls(), 2);
	}

	#[tokio::test]
	async fn search_iter_follows_has_more() {
		let transport = Arc::new(
			ScriptedTransport::default()
				.json(r#"{"merchants":[{"domain":"a.com"},{"domain":"b.com"}],"has_more":true}"#)
				.json(r#"{"merchants":[{"domain":"c.com"}],"has_more":false}"#),
		);
		let client = scripted_client(transport.clone());
		let merchants = client
			.ucp()
			.merchants()
			.search_iter(&MerchantSearch::new().region("US").limit(2))
			.expect("Pager should build.")
			.try_collect()
			.await
			.expect("Pages should decode.");
		let domains: Vec<_> = merchants.iter().map(|m| m.domain.as_str()).collect();

		assert_eq!(domains, ["a.com", "b.com", "c.com"]);
		assert_eq!(transport.queries(), ["region=US&limit=2&offset=0", "region=US&limit=2&offset=2"]);
	}
}
