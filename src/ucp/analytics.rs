// self
use crate::{
	_prelude::*,
	client::{ApiRequest, Client},
	error::ConfigError,
	transport::HttpTransport,
	ucp::ResultId,
};

/// Click logging endpoint.
pub const CLICK_PATH: &str = "/ucp/v1/analytics/click";

/// A click on a search result, tied back to the search that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
	/// `search_log_id` returned with the originating search page.
	pub search_log_id: i64,
	/// Clicked product, for product searches.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub clicked_product_id: Option<ResultId>,
	/// Clicked merchant, for merchant searches.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub clicked_merchant_id: Option<ResultId>,
	/// Zero-based position of the result on its page.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub clicked_position: Option<u32>,
}
impl ClickEvent {
	/// Creates a click for the given search log entry.
	pub fn new(search_log_id: i64) -> Self {
		Self {
			search_log_id,
			clicked_product_id: None,
			clicked_merchant_id: None,
			clicked_position: None,
		}
	}

	/// Records the clicked product.
	pub fn product(mut self, id: impl Into<ResultId>) -> Self {
		self.clicked_product_id = Some(id.into());

		self
	}

	/// Records the clicked merchant.
	pub fn merchant(mut self, id: impl Into<ResultId>) -> Self {
		self.clicked_merchant_id = Some(id.into());

		self
	}

	/// Records the result position.
	pub fn position(mut self, position: u32) -> Self {
		self.clicked_position = Some(position);

		self
	}
}

/// Analytics endpoints borrowed from a [`Client`].
#[derive(Debug)]
pub struct Analytics<'a, C>
where
	C: ?Sized + HttpTransport,
{
	client: &'a Client<C>,
}
impl<'a, C> Analytics<'a, C>
where
	C: ?Sized + HttpTransport,
{
	pub(crate) fn new(client: &'a Client<C>) -> Self {
		Self { client }
	}

	/// Reports a click; the response body is ignored.
	pub async fn log_click(&self, event: &ClickEvent) -> Result<()> {
		let body = serde_json::to_value(event).map_err(ConfigError::from)?;

		self.client.send(&ApiRequest::post(CLICK_PATH).json(body)).await?;

		Ok(())
	}
}
