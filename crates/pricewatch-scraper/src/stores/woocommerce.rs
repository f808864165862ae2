//! WooCommerce storefront handler.
//!
//! Probes the Store API first, then the REST API v3/v2. The Store API
//! reports prices in integer minor units with an explicit
//! `currency_minor_unit`; the REST APIs report plain decimal strings.

use pricewatch_core::{DiscoveredProduct, EngineConfig, Platform};
use rust_decimal::Decimal;
use url::Url;

use crate::error::ScraperError;
use crate::fetch;

use super::{filter_by_keyword, json_decimal, store_origin};

/// Probe order matters: the Store API is unauthenticated on most shops,
/// the REST endpoints only sometimes.
const API_ENDPOINTS: [&str; 3] = [
    "/wp-json/wc/store/products",
    "/wp-json/wc/v3/products",
    "/wp-json/wc/v2/products",
];

const PAGE_SIZE: usize = 100;
const MAX_PAGES: usize = 200;

pub struct WooCommerceHandler {
    client: reqwest::Client,
    max_fetch: usize,
}

impl WooCommerceHandler {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &EngineConfig) -> Result<Self, ScraperError> {
        Ok(Self {
            client: fetch::build_client(config.request_timeout_secs, None)?,
            max_fetch: config.max_products_fetch,
        })
    }

    /// A store is WooCommerce when any known endpoint returns a non-empty
    /// product list.
    pub(crate) async fn detect(&self, url: &Url) -> bool {
        let origin = store_origin(url);

        for endpoint in API_ENDPOINTS {
            let probe = format!("{origin}{endpoint}?per_page=1");
            match fetch::fetch_json(&self.client, &probe).await {
                Ok(data) => {
                    if data.as_array().is_some_and(|a| !a.is_empty()) {
                        return true;
                    }
                }
                Err(err) => {
                    tracing::debug!(url = %url, endpoint, error = %err, "woocommerce probe failed");
                }
            }
        }

        false
    }

    /// Fetches the full (capped) catalog, filters by keyword, truncates to
    /// `limit`.
    pub(crate) async fn fetch_products(
        &self,
        url: &Url,
        keyword: Option<&str>,
        limit: usize,
    ) -> Result<Vec<DiscoveredProduct>, ScraperError> {
        let origin = store_origin(url);

        let Some(endpoint) = self.find_working_endpoint(&origin).await else {
            return Ok(vec![]);
        };

        let mut products: Vec<DiscoveredProduct> = Vec::new();
        let mut page = 1usize;

        while products.len() < self.max_fetch && page <= MAX_PAGES {
            let page_url = format!("{origin}{endpoint}?per_page={PAGE_SIZE}&page={page}");

            let data = match fetch::fetch_json(&self.client, &page_url).await {
                Ok(data) => data,
                Err(err) => {
                    tracing::debug!(origin, page, error = %err, "woocommerce page fetch failed");
                    break;
                }
            };

            let Some(page_products) = data.as_array() else {
                break;
            };
            if page_products.is_empty() {
                break;
            }

            for raw in page_products {
                if let Some(product) = parse_product(raw, &origin, endpoint) {
                    products.push(product);
                }
            }

            page += 1;
        }

        let mut filtered = filter_by_keyword(products, keyword);
        filtered.truncate(limit);
        Ok(filtered)
    }

    /// First endpoint that answers 200 with a JSON list, even an empty one.
    async fn find_working_endpoint(&self, origin: &str) -> Option<&'static str> {
        for endpoint in API_ENDPOINTS {
            let probe = format!("{origin}{endpoint}?per_page=1");
            if let Ok(data) = fetch::fetch_json(&self.client, &probe).await {
                if data.is_array() {
                    return Some(endpoint);
                }
            }
        }
        None
    }
}

fn parse_product(
    raw: &serde_json::Value,
    origin: &str,
    endpoint: &str,
) -> Option<DiscoveredProduct> {
    if endpoint.contains("store") {
        parse_store_api_product(raw, origin)
    } else {
        parse_rest_api_product(raw, origin)
    }
}

/// Store API shape: prices are integer minor units.
fn parse_store_api_product(raw: &serde_json::Value, origin: &str) -> Option<DiscoveredProduct> {
    let name = raw.get("name")?.as_str()?.to_string();
    let product_url = product_url(raw, origin);
    let image_url = first_image_src(raw);

    let prices = raw.get("prices");
    let currency = prices
        .and_then(|p| p.get("currency_code"))
        .and_then(serde_json::Value::as_str)
        .unwrap_or("USD")
        .to_string();
    let price = prices
        .and_then(|p| p.get("price"))
        .and_then(serde_json::Value::as_str)
        .and_then(|minor| {
            let scale = prices
                .and_then(|p| p.get("currency_minor_unit"))
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(2)
                .min(9);
            let units: i128 = minor.parse().ok()?;
            Some(Decimal::from_i128_with_scale(units, u32::try_from(scale).ok()?))
        });

    let in_stock = raw
        .get("is_in_stock")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(true);

    Some(DiscoveredProduct {
        name,
        price,
        currency,
        image_url,
        product_url,
        platform: Platform::WooCommerce,
        variant_id: raw.get("id").map(ToString::to_string),
        sku: raw
            .get("sku")
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        in_stock,
        product_type: None,
        tags: category_names(raw),
        description: description_text(raw),
        raw_data: raw.clone(),
    })
}

/// REST API v3/v2 shape: prices are decimal strings.
fn parse_rest_api_product(raw: &serde_json::Value, origin: &str) -> Option<DiscoveredProduct> {
    let name = raw.get("name")?.as_str()?.to_string();
    let product_url = product_url(raw, origin);
    let image_url = first_image_src(raw);

    let price = raw.get("price").and_then(json_decimal);
    let in_stock = raw
        .get("in_stock")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(true);

    let mut tags = category_names(raw);
    tags.extend(
        raw.get("tags")
            .and_then(serde_json::Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|t| t.get("name"))
            .filter_map(serde_json::Value::as_str)
            .map(str::to_string),
    );

    Some(DiscoveredProduct {
        name,
        price,
        currency: "USD".to_string(),
        image_url,
        product_url,
        platform: Platform::WooCommerce,
        variant_id: raw.get("id").map(ToString::to_string),
        sku: raw
            .get("sku")
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        in_stock,
        product_type: None,
        tags,
        description: description_text(raw),
        raw_data: raw.clone(),
    })
}

fn product_url(raw: &serde_json::Value, origin: &str) -> String {
    raw.get("permalink")
        .and_then(serde_json::Value::as_str)
        .filter(|p| !p.is_empty())
        .map_or_else(
            || {
                let slug = raw
                    .get("slug")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default();
                format!("{origin}/product/{slug}")
            },
            str::to_string,
        )
}

fn first_image_src(raw: &serde_json::Value) -> Option<String> {
    raw.get("images")
        .and_then(serde_json::Value::as_array)
        .and_then(|images| images.first())
        .and_then(|image| image.get("src"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}

fn category_names(raw: &serde_json::Value) -> Vec<String> {
    raw.get("categories")
        .and_then(serde_json::Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|category| category.get("name"))
        .filter_map(serde_json::Value::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn description_text(raw: &serde_json::Value) -> Option<String> {
    raw.get("description")
        .and_then(serde_json::Value::as_str)
        .filter(|d| !d.is_empty())
        .or_else(|| {
            raw.get("short_description")
                .and_then(serde_json::Value::as_str)
                .filter(|d| !d.is_empty())
        })
        .map(str::to_string)
}
