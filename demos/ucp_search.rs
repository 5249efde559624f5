//! Discovers merchants, searches their products, and reports a click against the search log.

// crates.io
use color_eyre::{Result, eyre::eyre};
use httpmock::prelude::*;
// self
use rencom::{
	Client, ClientConfig,
	auth::Credentials,
	ucp::{ClickEvent, Condition, MerchantSearch, ProductSearch},
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let merchants_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/ucp/v1/merchants");
			then.status(200).header("content-type", "application/json").body(
				r#"{"merchants":[{"id":1,"domain":"example.com","name":"Example Store","capabilities":["dev.ucp.shopping.checkout"]}],"has_more":false,"total":1}"#,
			);
		})
		.await;
	let products_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/ucp/v1/products/search");
			then.status(200).header("content-type", "application/json").body(
				r#"{"products":[{"id":"prod_123","name":"Trail Runner","price_cents":12900,"currency":"USD","merchant_domain":"example.com"}],"has_more":false,"search_log_id":42}"#,
			);
		})
		.await;
	let click_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/ucp/v1/analytics/click");
			then.status(200).header("content-type", "application/json").body(r#"{"status":"ok"}"#);
		})
		.await;
	let config = ClientConfig::builder()
		.base_url(Url::parse(&server.base_url())?)
		.credentials(Credentials::jwt("demo-jwt"))
		.build()?;
	let client = Client::new(config)?;
	let ucp = client.ucp();
	let merchants = ucp
		.merchants()
		.search(&MerchantSearch::new().capability("dev.ucp.shopping.checkout").region("US"))
		.await?;

	for merchant in &merchants.merchants {
		println!("Merchant {} ({:?}).", merchant.domain, merchant.name);
	}

	let mut search = ProductSearch::new("running shoes")
		.price_range(None, Some(15_000))
		.condition(Condition::New);

	for merchant in &merchants.merchants {
		search = search.merchant_domain(merchant.domain.as_str());
	}

	let products = ucp.products().search(&search).await?;
	let search_log_id =
		products.search_log_id.ok_or_else(|| eyre!("Product search returned no search log id."))?;
	let (position, product) = products
		.products
		.iter()
		.enumerate()
		.next()
		.ok_or_else(|| eyre!("Product search returned no products."))?;

	println!("Top product: {} at {:?} cents.", product.name, product.price_cents);

	let mut click = ClickEvent::new(search_log_id).position(u32::try_from(position)?);

	if let Some(id) = &product.id {
		click = click.product(id.clone());
	}

	ucp.analytics().log_click(&click).await?;

	merchants_mock.assert_async().await;
	products_mock.assert_async().await;
	click_mock.assert_async().await;

	Ok(())
}
