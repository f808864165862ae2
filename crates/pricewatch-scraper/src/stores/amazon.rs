//! Amazon store/brand/search page handler.
//!
//! Discovery-only: single-product pages are excluded by the URL pattern
//! check and handled by the single-product scraper instead. Search results
//! are server-rendered HTML; cards are parsed with a selector cascade and a
//! malformed card is skipped rather than failing the page.

use pricewatch_core::{DiscoveredProduct, EngineConfig, Platform};
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::ScraperError;
use crate::fetch;
use crate::price::parse_price;

const AMAZON_DOMAINS: [&str; 12] = [
    "amazon.com",
    "amazon.co.uk",
    "amazon.de",
    "amazon.fr",
    "amazon.ca",
    "amazon.it",
    "amazon.es",
    "amazon.com.au",
    "amazon.co.jp",
    "amazon.in",
    "amazon.com.mx",
    "amazon.com.br",
];

/// Path shapes of store/brand/search pages (never single products).
const STORE_MARKERS: [&str; 5] = ["/stores/", "/s?", "/s/", "/brand/", "/gp/browse"];

const CARD_SELECTORS: [&str; 3] = [
    "[data-component-type='s-search-result']",
    ".s-result-item[data-asin]",
    ".sg-col-inner .s-widget-container",
];

const PRICE_SELECTORS: [&str; 4] = [
    ".a-price .a-offscreen",
    ".a-price-whole",
    "[data-a-color='price'] .a-offscreen",
    ".a-color-price",
];

/// Search pages render ~20 cards per page.
const CARDS_PER_PAGE: usize = 20;

pub struct AmazonHandler {
    client: reqwest::Client,
}

impl AmazonHandler {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &EngineConfig) -> Result<Self, ScraperError> {
        Ok(Self {
            client: fetch::build_client(config.request_timeout_secs, None)?,
        })
    }

    /// URL-shape check only; no network probe needed.
    pub(crate) fn detect(&self, url: &Url) -> bool {
        matches_store_url(url)
    }

    pub(crate) async fn fetch_products(
        &self,
        url: &Url,
        keyword: Option<&str>,
        limit: usize,
    ) -> Result<Vec<DiscoveredProduct>, ScraperError> {
        let fetch_url = build_search_url(url, keyword);

        let mut products: Vec<DiscoveredProduct> = Vec::new();
        let max_pages = limit / CARDS_PER_PAGE + 1;

        for page in 1..=max_pages {
            if products.len() >= limit {
                break;
            }

            let page_url = with_page_param(&fetch_url, page);
            let html = match fetch::fetch_html(&self.client, page_url.as_str()).await {
                Ok(html) => html,
                Err(err) => {
                    tracing::debug!(url = %page_url, error = %err, "amazon page fetch failed");
                    break;
                }
            };

            let page_products = parse_search_results(&html, url);
            if page_products.is_empty() {
                break;
            }
            products.extend(page_products);
        }

        products.truncate(limit);
        Ok(products)
    }
}

pub(crate) fn matches_store_url(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_lowercase();

    let is_amazon = AMAZON_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")));
    if !is_amazon {
        return false;
    }

    let full_path = match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    };
    STORE_MARKERS.iter().any(|m| full_path.contains(m))
}

/// Amazon search takes the keyword as the `k` query parameter.
fn build_search_url(url: &Url, keyword: Option<&str>) -> Url {
    match keyword {
        Some(keyword) => super::set_query_param(url, "k", keyword),
        None => url.clone(),
    }
}

fn with_page_param(url: &Url, page: usize) -> Url {
    if page == 1 {
        url.clone()
    } else {
        super::set_query_param(url, "page", &page.to_string())
    }
}

fn parse_search_results(html: &str, base: &Url) -> Vec<DiscoveredProduct> {
    let document = Html::parse_document(html);

    for selector_str in CARD_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };

        let cards: Vec<ElementRef<'_>> = document.select(&selector).collect();
        if cards.is_empty() {
            continue;
        }

        return cards
            .iter()
            .filter_map(|card| parse_product_card(card, base))
            .collect();
    }

    vec![]
}

fn parse_product_card(card: &ElementRef<'_>, base: &Url) -> Option<DiscoveredProduct> {
    let asin = card.value().attr("data-asin")?.trim();
    if asin.is_empty() {
        return None;
    }

    let name = select_text(card, "h2 a span, .a-text-normal")?;

    let product_url = select_attr(card, "h2 a, a.a-link-normal", "href")
        .and_then(|href| base.join(&href).ok())
        .map_or_else(
            || format!("{}/dp/{asin}", super::store_origin(base)),
            String::from,
        );

    let image_url = select_attr(card, "img.s-image, .s-product-image-container img", "src");

    let (price, currency) = extract_card_price(card);

    // "Currently unavailable" renders in the price slot.
    let in_stock = select_text(card, ".a-color-price")
        .is_none_or(|text| !text.to_lowercase().contains("unavailable"));

    Some(DiscoveredProduct {
        name,
        price,
        currency,
        image_url,
        product_url,
        platform: Platform::Amazon,
        variant_id: Some(asin.to_string()),
        sku: None,
        in_stock,
        product_type: None,
        tags: vec![],
        description: None,
        raw_data: serde_json::json!({ "asin": asin }),
    })
}

fn extract_card_price(card: &ElementRef<'_>) -> (Option<Decimal>, String) {
    for selector_str in PRICE_SELECTORS {
        let Some(text) = select_text(card, selector_str) else {
            continue;
        };
        let (price, currency) = parse_price(&text);
        if let Some(price) = price {
            if price > Decimal::ZERO {
                return (Some(price), currency);
            }
        }
    }
    (None, "USD".to_string())
}

fn select_text(card: &ElementRef<'_>, selectors: &str) -> Option<String> {
    let selector = Selector::parse(selectors).ok()?;
    let text = card
        .select(&selector)
        .next()?
        .text()
        .collect::<String>()
        .trim()
        .to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn select_attr(card: &ElementRef<'_>, selectors: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selectors).ok()?;
    card.select(&selector)
        .next()?
        .value()
        .attr(attr)
        .map(str::to_string)
}
