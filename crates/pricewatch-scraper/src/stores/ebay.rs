//! eBay store and search page handler.
//!
//! Server-rendered listing cards with the `.s-item` family of classes.
//! eBay pads result pages with a "Shop on eBay" placeholder card that must
//! be dropped, and auction listings can carry a price range, in which case
//! the lower bound is tracked.

use pricewatch_core::{DiscoveredProduct, EngineConfig, Platform};
use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::ScraperError;
use crate::fetch;
use crate::price::parse_price;

const EBAY_DOMAINS: [&str; 8] = [
    "ebay.com",
    "ebay.co.uk",
    "ebay.de",
    "ebay.fr",
    "ebay.it",
    "ebay.es",
    "ebay.com.au",
    "ebay.ca",
];

/// Store, search, browse, and seller page path shapes.
const STORE_MARKERS: [&str; 4] = ["/str/", "/sch/", "/b/", "/usr/"];

const CARD_SELECTORS: [&str; 3] = [
    ".s-item",
    ".srp-results .s-item__wrapper",
    "[data-view='mi:1686|iid:1']",
];

const PRICE_SELECTORS: [&str; 3] = [
    ".s-item__price",
    ".s-item__price span.POSITIVE",
    "[itemprop='price']",
];

/// Listing pages render ~50 cards per page.
const CARDS_PER_PAGE: usize = 50;

pub struct EbayHandler {
    client: reqwest::Client,
}

impl EbayHandler {
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
                    tracing::debug!(url = %page_url, error = %err, "ebay page fetch failed");
                    break;
                }
            };

            let page_products = parse_search_results(&html);
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

    let is_ebay = EBAY_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")));
    if !is_ebay {
        return false;
    }

    STORE_MARKERS.iter().any(|m| url.path().contains(m))
}

/// eBay search takes the keyword as the `_nkw` query parameter.
fn build_search_url(url: &Url, keyword: Option<&str>) -> Url {
    match keyword {
        Some(keyword) => super::set_query_param(url, "_nkw", keyword),
        None => url.clone(),
    }
}

fn with_page_param(url: &Url, page: usize) -> Url {
    if page == 1 {
        url.clone()
    } else {
        super::set_query_param(url, "_pgn", &page.to_string())
    }
}

fn parse_search_results(html: &str) -> Vec<DiscoveredProduct> {
    let document = Html::parse_document(html);

    for selector_str in CARD_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };

        let cards: Vec<ElementRef<'_>> = document.select(&selector).collect();
        if cards.is_empty() {
            continue;
        }

        return cards.iter().filter_map(parse_listing_card).collect();
    }

    vec![]
}

fn parse_listing_card(card: &ElementRef<'_>) -> Option<DiscoveredProduct> {
    let name = select_text(card, ".s-item__title, .s-item__title span")?;
    if name.eq_ignore_ascii_case("shop on ebay") {
        return None;
    }

    let product_url = select_attr(card, ".s-item__link, a.s-item__link", "href")?;
    if product_url.is_empty() {
        return None;
    }

    let item_id = Regex::new(r"/itm/(\d+)")
        .expect("valid regex")
        .captures(&product_url)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string());

    let image_url = select_attr(card, ".s-item__image-img, img.s-item__image-img", "src");

    let (price, currency) = extract_card_price(card);

    let shipping = select_text(card, ".s-item__shipping, .s-item__freeXDays").unwrap_or_default();

    Some(DiscoveredProduct {
        name,
        price,
        currency,
        image_url,
        product_url,
        platform: Platform::Ebay,
        variant_id: item_id,
        sku: None,
        in_stock: true,
        product_type: None,
        tags: vec![],
        description: None,
        raw_data: serde_json::json!({ "shipping": shipping }),
    })
}

fn extract_card_price(card: &ElementRef<'_>) -> (Option<Decimal>, String) {
    for selector_str in PRICE_SELECTORS {
        let Some(text) = select_text(card, selector_str) else {
            continue;
        };

        // Auction ranges like "$12.00 to $19.00": track the lower bound.
        let text = text.split(" to ").next().unwrap_or(&text);

        let (price, currency) = parse_price(text);
        if let Some(price) = price {
            if price > Decimal::ZERO {
                return (Some(price), marketplace_currency(text, currency));
            }
        }
    }
    (None, "USD".to_string())
}

/// eBay spells some marketplace currencies in ways the shared parser does
/// not recognize ("AU $", "C $" with a space).
fn marketplace_currency(text: &str, detected: String) -> String {
    if text.contains("AU $") {
        "AUD".to_string()
    } else if text.contains("C $") {
        "CAD".to_string()
    } else {
        detected
    }
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
