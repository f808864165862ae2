//! Shopify storefront handler.
//!
//! Two-tier fetch: the public `products.json` endpoint first (classic
//! storefronts), then the Storefront GraphQL API for headless/Hydrogen
//! stores that disable it. Prices come straight from variant fields, never
//! from scraped HTML.

use pricewatch_core::{DiscoveredProduct, EngineConfig, Platform};
use rust_decimal::Decimal;
use serde::Deserialize;
use url::Url;

use crate::error::ScraperError;
use crate::fetch;

use super::{filter_by_keyword, store_origin};

const PAGE_SIZE: usize = 250;

/// Hard page-count ceiling. Prevents infinite loops against servers that
/// keep returning non-empty pages.
const MAX_PAGES: usize = 200;

/// Storefront API versions tried in order; availability varies per store
/// and `unstable` works on the most Hydrogen deployments.
const STOREFRONT_API_VERSIONS: [&str; 4] = ["unstable", "2024-01", "2023-10", "2023-07"];

pub struct ShopifyHandler {
    client: reqwest::Client,
    max_fetch: usize,
}

impl ShopifyHandler {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &EngineConfig) -> Result<Self, ScraperError> {
        Ok(Self {
            client: fetch::build_client(config.request_timeout_secs, None)?,
            max_fetch: config.max_products_fetch,
        })
    }

    /// Probes `/products.json?limit=1` for a `products` key.
    pub(crate) async fn detect(&self, url: &Url) -> bool {
        let origin = store_origin(url);
        let probe = format!("{origin}/products.json?limit=1");

        match fetch::fetch_json(&self.client, &probe).await {
            Ok(data) => data.get("products").is_some(),
            Err(err) => {
                tracing::debug!(url = %url, error = %err, "shopify probe failed");
                false
            }
        }
    }

    /// Fetches the full (capped) catalog, then filters by keyword, then
    /// truncates to `limit`. Filtering never limits the fetch itself;
    /// keyword relevance cannot be judged from a truncated early slice.
    pub(crate) async fn fetch_products(
        &self,
        url: &Url,
        keyword: Option<&str>,
        limit: usize,
    ) -> Result<Vec<DiscoveredProduct>, ScraperError> {
        let origin = store_origin(url);

        let mut products = self.fetch_via_products_json(&origin).await;

        if products.is_empty() {
            products = self.fetch_via_storefront(&origin).await;
        }

        let mut filtered = filter_by_keyword(products, keyword);
        filtered.truncate(limit);
        Ok(filtered)
    }

    /// Classic path: paginate `products.json` until an empty page or the
    /// fetch cap. Mid-stream failures keep whatever was already collected.
    async fn fetch_via_products_json(&self, origin: &str) -> Vec<DiscoveredProduct> {
        let mut products: Vec<DiscoveredProduct> = Vec::new();
        let mut page = 1usize;

        while products.len() < self.max_fetch && page <= MAX_PAGES {
            let url = format!("{origin}/products.json?limit={PAGE_SIZE}&page={page}");

            let data = match fetch::fetch_json(&self.client, &url).await {
                Ok(data) => data,
                Err(err) => {
                    tracing::debug!(origin, page, error = %err, "products.json page fetch failed");
                    break;
                }
            };

            let Some(page_products) = data.get("products").and_then(serde_json::Value::as_array)
            else {
                break;
            };
            if page_products.is_empty() {
                break;
            }

            for raw in page_products {
                if let Some(product) = parse_product(raw, origin) {
                    products.push(product);
                }
            }

            page += 1;
        }

        products
    }

    /// Hydrogen fallback: the Storefront GraphQL API, trying each version
    /// until one yields products.
    async fn fetch_via_storefront(&self, origin: &str) -> Vec<DiscoveredProduct> {
        for version in STOREFRONT_API_VERSIONS {
            let api_url = format!("{origin}/api/{version}/graphql.json");
            let products = self.fetch_storefront_version(&api_url, origin).await;
            if !products.is_empty() {
                tracing::debug!(origin, version, "storefront API version succeeded");
                return products;
            }
        }
        vec![]
    }

    async fn fetch_storefront_version(&self, api_url: &str, origin: &str) -> Vec<DiscoveredProduct> {
        let mut products: Vec<DiscoveredProduct> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page_count = 0usize;

        while products.len() < self.max_fetch && page_count < MAX_PAGES {
            page_count += 1;

            let query = build_storefront_query(PAGE_SIZE, cursor.as_deref());
            let response = match self
                .client
                .post(api_url)
                .json(&serde_json::json!({ "query": query }))
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    tracing::debug!(api_url, error = %err, "storefront request failed");
                    break;
                }
            };

            if !response.status().is_success() {
                break;
            }

            let data: serde_json::Value = match response.json().await {
                Ok(data) => data,
                Err(_) => break,
            };

            // GraphQL-level errors mean this API version is unusable.
            if data.get("errors").is_some() {
                break;
            }

            let Some(edges) = data
                .pointer("/data/products/edges")
                .and_then(serde_json::Value::as_array)
            else {
                break;
            };
            if edges.is_empty() {
                break;
            }

            for edge in edges {
                if let Some(product) = edge
                    .get("node")
                    .and_then(|node| parse_storefront_product(node, origin))
                {
                    products.push(product);
                }
            }

            let page_info = data.pointer("/data/products/pageInfo");
            let has_next = page_info
                .and_then(|info| info.get("hasNextPage"))
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
            if !has_next {
                break;
            }

            cursor = page_info
                .and_then(|info| info.get("endCursor"))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string);
            if cursor.is_none() {
                break;
            }
        }

        products
    }
}

// ---------------------------------------------------------------------------
// products.json parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ShopifyProduct {
    title: String,
    handle: String,
    #[serde(default)]
    body_html: Option<String>,
    #[serde(default)]
    product_type: Option<String>,
    /// Array of strings on current stores; legacy Liquid stores return a
    /// comma-separated string instead.
    #[serde(default, deserialize_with = "tags_list")]
    tags: Vec<String>,
    #[serde(default)]
    images: Vec<ShopifyImage>,
    #[serde(default)]
    variants: Vec<ShopifyVariant>,
}

#[derive(Debug, Deserialize)]
struct ShopifyVariant {
    id: i64,
    #[serde(default)]
    sku: Option<String>,
    /// Decimal string, e.g. `"29.99"`.
    #[serde(default)]
    price: Option<String>,
    /// Absent on older stores; optimistic default.
    #[serde(default = "default_available")]
    available: bool,
}

#[derive(Debug, Deserialize)]
struct ShopifyImage {
    src: String,
}

/// serde's `default = "..."` attribute needs a function path, not a const.
fn default_available() -> bool {
    true
}

fn tags_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tags {
        List(Vec<String>),
        Csv(String),
    }

    match Tags::deserialize(deserializer)? {
        Tags::List(tags) => Ok(tags),
        Tags::Csv(csv) => Ok(csv
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()),
    }
}

fn parse_product(raw: &serde_json::Value, origin: &str) -> Option<DiscoveredProduct> {
    let product: ShopifyProduct = serde_json::from_value(raw.clone()).ok()?;

    let product_url = format!("{origin}/products/{}", product.handle);
    let image_url = product.images.first().map(|image| image.src.clone());

    let first_variant = product.variants.first();
    let price = first_variant
        .and_then(|v| v.price.as_deref())
        .and_then(|p| p.parse::<Decimal>().ok());
    let variant_id = first_variant.map(|v| v.id.to_string());
    let sku = first_variant
        .and_then(|v| v.sku.clone())
        .filter(|s| !s.is_empty());
    let in_stock = first_variant.map_or(true, |v| v.available);

    Some(DiscoveredProduct {
        name: product.title,
        price,
        // products.json does not expose a currency; store currency is
        // resolved downstream, USD assumed here.
        currency: "USD".to_string(),
        image_url,
        product_url,
        platform: Platform::Shopify,
        variant_id,
        sku,
        in_stock,
        product_type: product.product_type.filter(|t| !t.is_empty()),
        tags: product.tags,
        description: product.body_html.filter(|d| !d.is_empty()),
        raw_data: raw.clone(),
    })
}

// ---------------------------------------------------------------------------
// Storefront GraphQL parsing
// ---------------------------------------------------------------------------

fn build_storefront_query(page_size: usize, cursor: Option<&str>) -> String {
    let after_clause = cursor.map_or_else(String::new, |c| format!(", after: \"{c}\""));

    format!(
        r#"{{
  products(first: {page_size}{after_clause}) {{
    edges {{
      node {{
        id
        title
        handle
        description
        productType
        tags
        priceRange {{
          minVariantPrice {{
            amount
            currencyCode
          }}
        }}
        images(first: 1) {{
          edges {{
            node {{
              url
            }}
          }}
        }}
        variants(first: 1) {{
          edges {{
            node {{
              id
              availableForSale
              sku
            }}
          }}
        }}
      }}
    }}
    pageInfo {{
      hasNextPage
      endCursor
    }}
  }}
}}"#
    )
}

fn parse_storefront_product(node: &serde_json::Value, origin: &str) -> Option<DiscoveredProduct> {
    let title = node.get("title")?.as_str()?.to_string();
    let handle = node.get("handle")?.as_str()?;
    let product_url = format!("{origin}/products/{handle}");

    let image_url = node
        .pointer("/images/edges/0/node/url")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string);

    let min_price = node.pointer("/priceRange/minVariantPrice");
    let price = min_price
        .and_then(|p| p.get("amount"))
        .and_then(super::json_decimal);
    let currency = min_price
        .and_then(|p| p.get("currencyCode"))
        .and_then(serde_json::Value::as_str)
        .unwrap_or("USD")
        .to_string();

    let first_variant = node.pointer("/variants/edges/0/node");
    let variant_id = first_variant
        .and_then(|v| v.get("id"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_string);
    let sku = first_variant
        .and_then(|v| v.get("sku"))
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let in_stock = first_variant
        .and_then(|v| v.get("availableForSale"))
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(true);

    let product_type = node
        .get("productType")
        .and_then(serde_json::Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    let tags = node
        .get("tags")
        .and_then(serde_json::Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(serde_json::Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let description = node
        .get("description")
        .and_then(serde_json::Value::as_str)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    Some(DiscoveredProduct {
        name: title,
        price,
        currency,
        image_url,
        product_url,
        platform: Platform::Shopify,
        variant_id,
        sku,
        in_stock,
        product_type,
        tags,
        description,
        raw_data: node.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn parses_products_json_product() {
        let raw = json!({
            "id": 123,
            "title": "Trail Shoe",
            "handle": "trail-shoe",
            "body_html": "<p>Grippy.</p>",
            "product_type": "Footwear",
            "tags": ["running", "trail"],
            "images": [{"src": "https://cdn.shopify.com/img/1.jpg"}],
            "variants": [{
                "id": 456,
                "sku": "TS-01",
                "price": "89.95",
                "available": true
            }]
        });

        let product = parse_product(&raw, "https://shop.example.com").unwrap();
        assert_eq!(product.name, "Trail Shoe");
        assert_eq!(product.price, Some(dec("89.95")));
        assert_eq!(product.currency, "USD");
        assert_eq!(
            product.product_url,
            "https://shop.example.com/products/trail-shoe"
        );
        assert_eq!(product.variant_id.as_deref(), Some("456"));
        assert_eq!(product.sku.as_deref(), Some("TS-01"));
        assert!(product.in_stock);
        assert_eq!(product.tags, vec!["running", "trail"]);
    }

    #[test]
    fn legacy_comma_separated_tags_are_split() {
        let raw = json!({
            "id": 1,
            "title": "Tee",
            "handle": "tee",
            "tags": "cotton, summer , ",
            "variants": []
        });
        let product = parse_product(&raw, "https://shop.example.com").unwrap();
        assert_eq!(product.tags, vec!["cotton", "summer"]);
    }

    #[test]
    fn product_without_variants_has_no_price_and_default_stock() {
        let raw = json!({
            "id": 1,
            "title": "Gift Card",
            "handle": "gift-card",
            "variants": []
        });
        let product = parse_product(&raw, "https://shop.example.com").unwrap();
        assert!(product.price.is_none());
        assert!(product.in_stock);
    }

    #[test]
    fn empty_product_type_becomes_none() {
        let raw = json!({
            "id": 1,
            "title": "Tee",
            "handle": "tee",
            "product_type": "",
            "variants": []
        });
        let product = parse_product(&raw, "https://shop.example.com").unwrap();
        assert!(product.product_type.is_none());
    }

    #[test]
    fn storefront_query_includes_cursor_only_when_present() {
        let without = build_storefront_query(250, None);
        assert!(without.contains("products(first: 250)"));

        let with = build_storefront_query(250, Some("abc123"));
        assert!(with.contains(r#"products(first: 250, after: "abc123")"#));
    }

    #[test]
    fn parses_storefront_graphql_node() {
        let node = json!({
            "id": "gid://shopify/Product/1",
            "title": "Hydrogen Hoodie",
            "handle": "hydrogen-hoodie",
            "description": "Cozy.",
            "productType": "Apparel",
            "tags": ["fleece"],
            "priceRange": {
                "minVariantPrice": {"amount": "59.0", "currencyCode": "EUR"}
            },
            "images": {"edges": [{"node": {"url": "https://cdn.shopify.com/img/h.jpg"}}]},
            "variants": {"edges": [{"node": {
                "id": "gid://shopify/ProductVariant/9",
                "availableForSale": false,
                "sku": "HH-01"
            }}]}
        });

        let product = parse_storefront_product(&node, "https://shop.example.com").unwrap();
        assert_eq!(product.name, "Hydrogen Hoodie");
        assert_eq!(product.price, Some(dec("59.0")));
        assert_eq!(product.currency, "EUR");
        assert_eq!(
            product.product_url,
            "https://shop.example.com/products/hydrogen-hoodie"
        );
        assert!(!product.in_stock);
        assert_eq!(product.sku.as_deref(), Some("HH-01"));
        assert_eq!(
            product.image_url.as_deref(),
            Some("https://cdn.shopify.com/img/h.jpg")
        );
    }
}
