//! Single-product price scraping for ongoing tracking.
//!
//! Two-tier fetch: a cheap plain-HTTP GET first (most storefronts are
//! server-rendered), then a headless-browser render for client-rendered
//! pages. Each tier walks the proxy rotation and ends with a direct
//! connection.

use std::time::Duration;

use pricewatch_core::{EngineConfig, ScrapeResult};
use rust_decimal::Decimal;

use crate::error::{truncate_error, ScraperError};
use crate::extract::{extract_price_from_html, get_retailer};
use crate::fetch;
use crate::proxy::{ProxyCache, ProxyProvider};
use crate::render::{ChromiumRenderer, PageRenderer};
use crate::urlcheck::UrlPolicy;

pub struct PriceScraper {
    config: EngineConfig,
    policy: UrlPolicy,
    proxy_cache: ProxyCache,
    renderer: Box<dyn PageRenderer>,
}

impl PriceScraper {
    /// Scraper with the production renderer (headless Chromium).
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the proxy provider's HTTP client
    /// cannot be built.
    pub fn new(config: EngineConfig) -> Result<Self, ScraperError> {
        let renderer = Box::new(ChromiumRenderer::new(
            config.browser_timeout_secs,
            config.browser_settle_ms,
        ));
        Self::with_renderer(config, renderer)
    }

    /// Scraper with an injected renderer. Tests substitute a stub here.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the proxy provider's HTTP client
    /// cannot be built.
    pub fn with_renderer(
        config: EngineConfig,
        renderer: Box<dyn PageRenderer>,
    ) -> Result<Self, ScraperError> {
        let provider = match &config.proxy_api_key {
            Some(api_key) => Some(ProxyProvider::new(api_key.clone())?),
            None => None,
        };

        Ok(Self {
            policy: UrlPolicy {
                allow_insecure: config.allow_insecure_urls,
            },
            proxy_cache: ProxyCache::new(provider),
            renderer,
            config,
        })
    }

    /// Extracts the current price from a product page.
    ///
    /// Total function: every failure mode becomes a `failed` result carrying
    /// the most specific available message. Normalization or validation
    /// failures short-circuit before any network traffic.
    pub async fn scrape_url(&self, raw_url: &str) -> ScrapeResult {
        let url = match self
            .policy
            .normalize(raw_url)
            .and_then(|u| self.policy.validate(&u).map(|()| u))
        {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(url = raw_url, error = %err, "scrape rejected URL");
                return ScrapeResult::failed(truncate_error(&err.to_string()));
            }
        };

        let retailer = get_retailer(&url);

        // Courtesy delay before touching the storefront at all.
        self.pre_scrape_delay().await;

        let proxies = self.proxy_cache.proxies_with_direct().await;
        let mut last_error: Option<String> = None;

        // Tier 1: plain HTTP fetch through each proxy, then direct.
        for proxy in &proxies {
            match self.fetch_page(url.as_str(), proxy.as_deref()).await {
                Ok(html) => {
                    if let Some(result) = try_extract(&html, retailer) {
                        return result;
                    }
                }
                Err(err) => {
                    tracing::debug!(url = %url, error = %err, "http fetch tier failed");
                    last_error = Some(truncate_error(&err.to_string()));
                }
            }
        }

        // Tier 2: headless render for client-rendered storefronts.
        for proxy in &proxies {
            match self
                .renderer
                .render(url.as_str(), fetch::random_user_agent(), proxy.as_deref())
                .await
            {
                Ok(html) => {
                    if let Some(result) = try_extract(&html, retailer) {
                        return result;
                    }
                }
                Err(err) => {
                    tracing::debug!(url = %url, error = %err, "render tier failed");
                    last_error = Some(truncate_error(&err.to_string()));
                }
            }
        }

        ScrapeResult::failed(
            last_error.unwrap_or_else(|| "could not extract price from page".to_string()),
        )
    }

    async fn fetch_page(&self, url: &str, proxy: Option<&str>) -> Result<String, ScraperError> {
        let client = fetch::build_client(self.config.request_timeout_secs, proxy)?;
        fetch::fetch_html(&client, url).await
    }

    /// Randomized 2–5 s delay (configurable) before any network call.
    /// Deliberate rate-limiting courtesy, not an optimization knob.
    async fn pre_scrape_delay(&self) {
        let min = self.config.scrape_delay_min_ms;
        let max = self.config.scrape_delay_max_ms;
        if max == 0 {
            return;
        }
        let delay_ms = if min >= max {
            min
        } else {
            rand::random_range(min..=max)
        };
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}

/// Runs the selector cascade; a strictly-positive parsed price completes
/// the scrape.
fn try_extract(html: &str, retailer: Option<&str>) -> Option<ScrapeResult> {
    let (price, currency) = extract_price_from_html(html, retailer);
    let price = price.filter(|p| *p > Decimal::ZERO)?;
    Some(ScrapeResult::success(price, currency))
}
