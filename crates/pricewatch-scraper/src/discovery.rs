//! Store discovery orchestration.
//!
//! `discover_products` is a total function: any failure (bad input URL,
//! SSRF rejection, handler construction, platform fetch) becomes a
//! `DiscoveryResult` with `error` set, never a propagated error.

use pricewatch_core::{DiscoveredProduct, DiscoveryResult, EngineConfig, Platform};
use url::Url;

use crate::error::truncate_error;
use crate::stores;
use crate::urlcheck::UrlPolicy;

pub const DEFAULT_DISCOVERY_LIMIT: usize = 50;

/// Discovers products from any store URL: normalize, validate, detect the
/// platform, fetch, keyword-filter, cap at `limit`.
///
/// The detected handler is scoped to this call; its HTTP client is released
/// when the handler drops, on success and failure paths alike.
pub async fn discover_products(
    config: &EngineConfig,
    url: &str,
    keyword: Option<&str>,
    limit: usize,
) -> DiscoveryResult {
    let policy = UrlPolicy {
        allow_insecure: config.allow_insecure_urls,
    };

    let normalized = match policy
        .normalize(url)
        .and_then(|u| policy.validate(&u).map(|()| u))
    {
        Ok(normalized) => normalized,
        Err(err) => {
            tracing::warn!(url, error = %err, "discovery rejected URL");
            return failure_result(url, &err.to_string());
        }
    };

    match run_discovery(config, &normalized, keyword, limit).await {
        Ok((platform, products)) => {
            tracing::debug!(
                url,
                platform = %platform,
                count = products.len(),
                "discovery finished"
            );
            DiscoveryResult {
                platform: platform.as_str().to_string(),
                store_url: url.to_string(),
                total_found: products.len(),
                products,
                error: None,
            }
        }
        Err(err) => {
            tracing::warn!(url, error = %err, "discovery failed");
            failure_result(url, &err.to_string())
        }
    }
}

/// Convenience wrapper for tracking one known product page: discovery with
/// a limit of one.
pub async fn discover_single_product(
    config: &EngineConfig,
    url: &str,
) -> Option<DiscoveredProduct> {
    discover_products(config, url, None, 1)
        .await
        .products
        .into_iter()
        .next()
}

async fn run_discovery(
    config: &EngineConfig,
    url: &Url,
    keyword: Option<&str>,
    limit: usize,
) -> Result<(Platform, Vec<DiscoveredProduct>), crate::error::ScraperError> {
    let handler = stores::detect_platform(url, config).await?;
    let platform = handler.platform();
    let products = handler.fetch_products(url, keyword, limit).await?;
    Ok((platform, products))
}

fn failure_result(url: &str, message: &str) -> DiscoveryResult {
    DiscoveryResult {
        platform: "unknown".to_string(),
        store_url: url.to_string(),
        total_found: 0,
        products: vec![],
        error: Some(truncate_error(message)),
    }
}
