/// Runtime configuration for the discovery/scraping engine.
///
/// Values change iteration bounds and timing only; they never change the
/// extraction algorithms themselves.
#[derive(Clone)]
pub struct EngineConfig {
    /// Pagination ceiling for API-based handlers (Shopify, WooCommerce):
    /// the maximum number of products fetched per discovery call before
    /// keyword filtering is applied.
    pub max_products_fetch: usize,
    /// Timeout for each plain HTTP fetch.
    pub request_timeout_secs: u64,
    /// Navigation timeout for the headless-browser fallback.
    pub browser_timeout_secs: u64,
    /// Fixed settle delay after navigation, letting client-side JS paint.
    pub browser_settle_ms: u64,
    /// Lower bound of the randomized pre-scrape courtesy delay.
    pub scrape_delay_min_ms: u64,
    /// Upper bound of the randomized pre-scrape courtesy delay.
    pub scrape_delay_max_ms: u64,
    /// Webshare-style proxy provider key. Absent means every fetch uses a
    /// direct connection.
    pub proxy_api_key: Option<String>,
    /// Relaxes the HTTPS-only and private-host rules so the engine can be
    /// pointed at local fixtures. Never enable outside tests/dev.
    pub allow_insecure_urls: bool,
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("max_products_fetch", &self.max_products_fetch)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("browser_timeout_secs", &self.browser_timeout_secs)
            .field("browser_settle_ms", &self.browser_settle_ms)
            .field("scrape_delay_min_ms", &self.scrape_delay_min_ms)
            .field("scrape_delay_max_ms", &self.scrape_delay_max_ms)
            .field(
                "proxy_api_key",
                &self.proxy_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("allow_insecure_urls", &self.allow_insecure_urls)
            .finish()
    }
}

impl Default for EngineConfig {
    /// Matches the documented environment-variable defaults.
    fn default() -> Self {
        Self {
            max_products_fetch: 500,
            request_timeout_secs: 30,
            browser_timeout_secs: 30,
            browser_settle_ms: 2000,
            scrape_delay_min_ms: 2000,
            scrape_delay_max_ms: 5000,
            proxy_api_key: None,
            allow_insecure_urls: false,
        }
    }
}
