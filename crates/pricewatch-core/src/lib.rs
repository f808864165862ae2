use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod app_config;
pub mod config;

pub use app_config::EngineConfig;
pub use config::{load_engine_config, load_engine_config_from_env};

/// E-commerce platform family behind a storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Shopify,
    WooCommerce,
    Amazon,
    Ebay,
    /// Unknown platform handled through generic HTML heuristics.
    Custom,
}

impl Platform {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Shopify => "shopify",
            Platform::WooCommerce => "woocommerce",
            Platform::Amazon => "amazon",
            Platform::Ebay => "ebay",
            Platform::Custom => "custom",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single catalog item found during store discovery.
///
/// Constructed transiently per discovery call; the caller decides whether to
/// persist it as a tracked competitor. Two products are considered the same
/// externally by `product_url` equality, which this type does not enforce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredProduct {
    pub name: String,
    /// Absent means "could not determine price", never "free".
    pub price: Option<Decimal>,
    /// ISO-ish 3-letter code; `"USD"` when undetectable.
    pub currency: String,
    pub image_url: Option<String>,
    /// Absolute URL used for later price tracking.
    pub product_url: String,
    pub platform: Platform,
    /// Platform-assigned variant identifier (Shopify variant id, ASIN,
    /// eBay item id), if available.
    pub variant_id: Option<String>,
    pub sku: Option<String>,
    /// Defaults to `true`; absence of a stock signal is not out-of-stock.
    pub in_stock: bool,
    pub product_type: Option<String>,
    pub tags: Vec<String>,
    pub description: Option<String>,
    /// Raw provider payload for this product, preserved for debugging.
    pub raw_data: serde_json::Value,
}

/// Terminal status of one price-extraction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStatus {
    Success,
    Failed,
}

/// Outcome of attempting to extract a price from one URL.
///
/// Invariant: `Success` always carries a price; `Failed` never does and
/// always carries an error message. Use the constructors to hold it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub price: Option<Decimal>,
    pub currency: String,
    pub status: ScrapeStatus,
    pub error_message: Option<String>,
}

impl ScrapeResult {
    #[must_use]
    pub fn success(price: Decimal, currency: impl Into<String>) -> Self {
        Self {
            price: Some(price),
            currency: currency.into(),
            status: ScrapeStatus::Success,
            error_message: None,
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            price: None,
            currency: "USD".to_string(),
            status: ScrapeStatus::Failed,
            error_message: Some(message.into()),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ScrapeStatus::Success
    }
}

/// Outcome of one discovery call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryResult {
    /// Detected platform tag, or `"unknown"` on total failure.
    pub platform: String,
    /// The store URL exactly as given by the caller.
    pub store_url: String,
    pub total_found: usize,
    /// Products in discovery order (platform API order or DOM order).
    pub products: Vec<DiscoveredProduct>,
    /// Short failure message, truncated to a bounded length.
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
