//! Multi-platform store discovery and price extraction.
//!
//! Given an arbitrary storefront URL the engine determines which e-commerce
//! platform backs it, fetches a catalog (or a single product's price)
//! through platform-appropriate means, normalizes free-text prices into
//! decimal amounts with currency codes, and degrades gracefully through a
//! layered fallback chain. All outbound URLs pass SSRF validation first.

pub mod discovery;
pub mod error;
pub mod price;
pub mod proxy;
pub mod render;
pub mod scrape;
pub mod stores;
pub mod urlcheck;

mod extract;
mod fetch;

pub use discovery::{discover_products, discover_single_product, DEFAULT_DISCOVERY_LIMIT};
pub use error::ScraperError;
pub use price::parse_price;
pub use render::{ChromiumRenderer, PageRenderer};
pub use scrape::PriceScraper;
pub use stores::{detect_platform, handler_for_platform, StoreHandler};
pub use urlcheck::UrlPolicy;
