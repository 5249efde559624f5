//! Universal Commerce Protocol endpoints: merchant discovery, product search, and click
//! analytics.

/// Click analytics.
pub mod analytics;
/// Merchant discovery.
pub mod merchants;
/// Product search across merchant catalogs.
pub mod products;

pub use analytics::*;
pub use merchants::*;
pub use products::*;

// self
use crate::{_prelude::*, client::Client, transport::HttpTransport};

/// Largest page the UCP search endpoints accept.
pub const MAX_LIMIT: u32 = 100;
const DEFAULT_LIMIT: u32 = 20;

/// Identifier of a merchant or product; the API issues both numeric and string ids.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultId {
	/// Numeric identifier.
	Int(i64),
	/// String identifier.
	Str(String),
}
impl Display for ResultId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Int(id) => write!(f, "{id}"),
			Self::Str(id) => f.write_str(id),
		}
	}
}
impl From<i64> for ResultId {
	fn from(id: i64) -> Self {
		Self::Int(id)
	}
}
impl From<&str> for ResultId {
	fn from(id: &str) -> Self {
		Self::Str(id.to_owned())
	}
}
impl From<String> for ResultId {
	fn from(id: String) -> Self {
		Self::Str(id)
	}
}

/// UCP endpoint groups borrowed from a [`Client`].
#[derive(Debug)]
pub struct Ucp<'a, C>
where
	C: ?Sized + HttpTransport,
{
	client: &'a Client<C>,
}
impl<'a, C> Ucp<'a, C>
where
	C: ?Sized + HttpTransport,
{
	pub(crate) fn new(client: &'a Client<C>) -> Self {
		Self { client }
	}

	/// Merchant discovery.
	pub fn merchants(&self) -> Merchants<'a, C> {
		Merchants::new(self.client)
	}

	/// Product search.
	pub fn products(&self) -> Products<'a, C> {
		Products::new(self.client)
	}

	/// Click analytics.
	pub fn analytics(&self) -> Analytics<'a, C> {
		Analytics::new(self.client)
	}
}

fn validate_limit(limit: Option<u32>) -> Result<u32> {
	let limit = limit.unwrap_or(DEFAULT_LIMIT);

	if (1..=MAX_LIMIT).contains(&limit) {
		Ok(limit)
	} else {
		Err(Error::validation(format!("limit must be between 1 and {MAX_LIMIT}")))
	}
}
