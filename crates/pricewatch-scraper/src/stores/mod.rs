//! Platform handlers for store discovery.
//!
//! Tries handlers in a fixed priority order (Shopify, WooCommerce, Amazon,
//! eBay, then the generic fallback) and dispatches through a closed enum:
//! the set of supported platforms is known at compile time.

mod amazon;
mod ebay;
mod generic;
mod shopify;
mod woocommerce;

pub use amazon::AmazonHandler;
pub use ebay::EbayHandler;
pub use generic::GenericHandler;
pub use shopify::ShopifyHandler;
pub use woocommerce::WooCommerceHandler;

use pricewatch_core::{DiscoveredProduct, EngineConfig, Platform};
use rust_decimal::Decimal;
use url::Url;

use crate::error::ScraperError;

/// A detected platform handler. Each variant owns its HTTP client; dropping
/// the handler releases it, and callers scope the handler so the drop runs
/// on success and failure paths alike.
pub enum StoreHandler {
    Shopify(ShopifyHandler),
    WooCommerce(WooCommerceHandler),
    Amazon(AmazonHandler),
    Ebay(EbayHandler),
    Generic(GenericHandler),
}

impl StoreHandler {
    #[must_use]
    pub fn platform(&self) -> Platform {
        match self {
            StoreHandler::Shopify(_) => Platform::Shopify,
            StoreHandler::WooCommerce(_) => Platform::WooCommerce,
            StoreHandler::Amazon(_) => Platform::Amazon,
            StoreHandler::Ebay(_) => Platform::Ebay,
            StoreHandler::Generic(_) => Platform::Custom,
        }
    }

    /// Whether this handler claims the URL. Network probes are permitted;
    /// probe failures count as "not mine", never as an error.
    pub async fn detect(&self, url: &Url) -> bool {
        match self {
            StoreHandler::Shopify(h) => h.detect(url).await,
            StoreHandler::WooCommerce(h) => h.detect(url).await,
            StoreHandler::Amazon(h) => h.detect(url),
            StoreHandler::Ebay(h) => h.detect(url),
            StoreHandler::Generic(h) => h.detect(url),
        }
    }

    /// Fetches products from the store, keyword-filtered and capped at
    /// `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] when the platform fetch fails outright;
    /// partial page failures degrade to shorter lists instead.
    pub async fn fetch_products(
        &self,
        url: &Url,
        keyword: Option<&str>,
        limit: usize,
    ) -> Result<Vec<DiscoveredProduct>, ScraperError> {
        match self {
            StoreHandler::Shopify(h) => h.fetch_products(url, keyword, limit).await,
            StoreHandler::WooCommerce(h) => h.fetch_products(url, keyword, limit).await,
            StoreHandler::Amazon(h) => h.fetch_products(url, keyword, limit).await,
            StoreHandler::Ebay(h) => h.fetch_products(url, keyword, limit).await,
            StoreHandler::Generic(h) => h.fetch_products(url, keyword, limit).await,
        }
    }
}

/// Detects the store platform and returns the matching handler.
///
/// Handlers are tried most-specific first; the first positive `detect` wins
/// and a handler that fails its probe is dropped (releasing its client)
/// before the next is tried. Falls back to the generic handler when nothing
/// matches.
///
/// # Errors
///
/// Returns [`ScraperError::Http`] only if a handler's HTTP client cannot be
/// constructed.
pub async fn detect_platform(
    url: &Url,
    config: &EngineConfig,
) -> Result<StoreHandler, ScraperError> {
    let handler = StoreHandler::Shopify(ShopifyHandler::new(config)?);
    if handler.detect(url).await {
        tracing::debug!(url = %url, "detected Shopify storefront");
        return Ok(handler);
    }

    let handler = StoreHandler::WooCommerce(WooCommerceHandler::new(config)?);
    if handler.detect(url).await {
        tracing::debug!(url = %url, "detected WooCommerce storefront");
        return Ok(handler);
    }

    let handler = StoreHandler::Amazon(AmazonHandler::new(config)?);
    if handler.detect(url).await {
        tracing::debug!(url = %url, "detected Amazon store page");
        return Ok(handler);
    }

    let handler = StoreHandler::Ebay(EbayHandler::new(config)?);
    if handler.detect(url).await {
        tracing::debug!(url = %url, "detected eBay store page");
        return Ok(handler);
    }

    tracing::debug!(url = %url, "no platform matched; using generic handler");
    Ok(StoreHandler::Generic(GenericHandler::new(config)?))
}

/// Returns the handler for an already-known platform tag. Unrecognized tags
/// map to the generic handler.
///
/// # Errors
///
/// Returns [`ScraperError::Http`] if the handler's HTTP client cannot be
/// constructed.
pub fn handler_for_platform(
    platform: &str,
    config: &EngineConfig,
) -> Result<StoreHandler, ScraperError> {
    match platform.to_lowercase().as_str() {
        "shopify" => Ok(StoreHandler::Shopify(ShopifyHandler::new(config)?)),
        "woocommerce" => Ok(StoreHandler::WooCommerce(WooCommerceHandler::new(config)?)),
        "amazon" => Ok(StoreHandler::Amazon(AmazonHandler::new(config)?)),
        "ebay" => Ok(StoreHandler::Ebay(EbayHandler::new(config)?)),
        _ => Ok(StoreHandler::Generic(GenericHandler::new(config)?)),
    }
}

/// Scheme+host(+port) origin of a store URL, used to build API endpoints
/// from the store root regardless of any path in the configured URL.
pub(crate) fn store_origin(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Filters products by keyword: case-insensitive, any word of the keyword
/// matching any searchable field keeps the product.
pub(crate) fn filter_by_keyword(
    products: Vec<DiscoveredProduct>,
    keyword: Option<&str>,
) -> Vec<DiscoveredProduct> {
    let Some(keyword) = keyword else {
        return products;
    };

    let words: Vec<String> = keyword
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();
    if words.is_empty() {
        return products;
    }

    products
        .into_iter()
        .filter(|p| {
            let searchable = format!(
                "{} {} {} {}",
                p.name.to_lowercase(),
                p.product_type.as_deref().unwrap_or_default().to_lowercase(),
                p.tags.join(" ").to_lowercase(),
                p.description.as_deref().unwrap_or_default().to_lowercase(),
            );
            words.iter().any(|word| searchable.contains(word.as_str()))
        })
        .collect()
}

/// Reads a JSON value as a decimal: accepts decimal strings and bare
/// numbers, which providers mix freely.
pub(crate) fn json_decimal(value: &serde_json::Value) -> Option<Decimal> {
    if let Some(s) = value.as_str() {
        return s.trim().parse::<Decimal>().ok();
    }
    if value.is_number() {
        return value.to_string().parse::<Decimal>().ok();
    }
    None
}

/// Replaces (or appends) a single query parameter on a URL.
pub(crate) fn set_query_param(url: &Url, key: &str, value: &str) -> Url {
    let mut out = url.clone();
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut pairs = out.query_pairs_mut();
    pairs.clear();
    for (k, v) in &kept {
        pairs.append_pair(k, v);
    }
    pairs.append_pair(key, value);
    drop(pairs);

    out
}
