//! Fallback handler for unknown store types.
//!
//! Handler of last resort: tries common product-card class families, and
//! when those find fewer than two candidates falls back to embedded
//! schema.org JSON-LD. Never fails; total failure is an empty list.

use pricewatch_core::{DiscoveredProduct, EngineConfig, Platform};
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::ScraperError;
use crate::fetch;
use crate::price::parse_price;

use super::{filter_by_keyword, json_decimal};

const PRODUCT_SELECTORS: [&str; 9] = [
    ".product",
    ".product-card",
    ".product-item",
    "[data-product]",
    ".products .item",
    ".product-list .item",
    "article.product",
    ".grid-item.product",
    ".collection-product",
];

const PRICE_SELECTORS: [&str; 8] = [
    "[itemprop='price']",
    ".price",
    ".product-price",
    ".current-price",
    ".sale-price",
    ".regular-price",
    "[data-price]",
    ".money",
];

const TITLE_SELECTORS: [&str; 7] = [
    "[itemprop='name']",
    ".product-title",
    ".product-name",
    "h2.title",
    "h3.title",
    ".product-card__title",
    ".product-item__title",
];

const IMAGE_SELECTORS: [&str; 6] = [
    "[itemprop='image']",
    ".product-image img",
    ".product-img img",
    ".product-card__image img",
    "img.product-image",
    "picture img",
];

/// One or two matches of a card selector are usually page furniture; a real
/// product grid repeats.
const MIN_CARD_MATCHES: usize = 2;

pub struct GenericHandler {
    client: reqwest::Client,
}

impl GenericHandler {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &EngineConfig) -> Result<Self, ScraperError> {
        Ok(Self {
            client: fetch::build_client(config.request_timeout_secs, None)?,
        })
    }

    /// Accepts any HTTPS URL as the fallback of last resort.
    pub(crate) fn detect(&self, url: &Url) -> bool {
        url.scheme() == "https" && url.host_str().is_some()
    }

    /// Never errors: any failure yields an empty list.
    pub(crate) async fn fetch_products(
        &self,
        url: &Url,
        keyword: Option<&str>,
        limit: usize,
    ) -> Result<Vec<DiscoveredProduct>, ScraperError> {
        let html = match fetch::fetch_html(&self.client, url.as_str()).await {
            Ok(html) => html,
            Err(err) => {
                tracing::debug!(url = %url, error = %err, "generic fetch failed");
                return Ok(vec![]);
            }
        };

        let products = parse_products(&html, url);

        let mut filtered = filter_by_keyword(products, keyword);
        filtered.truncate(limit);
        Ok(filtered)
    }
}

fn parse_products(html: &str, base: &Url) -> Vec<DiscoveredProduct> {
    let document = Html::parse_document(html);
    let mut products: Vec<DiscoveredProduct> = Vec::new();

    for selector_str in PRODUCT_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };

        let cards: Vec<ElementRef<'_>> = document.select(&selector).collect();
        if cards.len() < MIN_CARD_MATCHES {
            continue;
        }

        for card in &cards {
            if let Some(product) = parse_product_card(card, base) {
                products.push(product);
            }
        }

        if !products.is_empty() {
            break;
        }
    }

    if products.is_empty() {
        products = parse_jsonld_products(&document, base);
    }

    products
}

fn parse_product_card(card: &ElementRef<'_>, base: &Url) -> Option<DiscoveredProduct> {
    let name = TITLE_SELECTORS
        .iter()
        .find_map(|s| select_text(card, s))
        // Page themes without a recognizable title class usually still lead
        // with a heading or a link.
        .or_else(|| select_text(card, "h1, h2, h3, h4, a"))?;

    let product_url = select_attr(card, "a[href]", "href")
        .and_then(|href| base.join(&href).ok())
        .map(String::from)
        .unwrap_or_default();

    let image_url = IMAGE_SELECTORS
        .iter()
        .find_map(|s| select_image_src(card, s))
        .or_else(|| select_image_src(card, "img"))
        .and_then(|src| base.join(&src).ok())
        .map(String::from);

    let (price, currency) = extract_card_price(card);

    Some(DiscoveredProduct {
        name,
        price,
        currency,
        image_url,
        product_url,
        platform: Platform::Custom,
        variant_id: None,
        sku: None,
        in_stock: true,
        product_type: None,
        tags: vec![],
        description: None,
        raw_data: serde_json::Value::Null,
    })
}

fn extract_card_price(card: &ElementRef<'_>) -> (Option<Decimal>, String) {
    for selector_str in PRICE_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        let Some(element) = card.select(&selector).next() else {
            continue;
        };

        // Microdata carries the machine-readable price in `content`.
        if let Some(content) = element.value().attr("content") {
            if let Some(price) = content.trim().parse::<Decimal>().ok().filter(|p| *p > Decimal::ZERO) {
                return (Some(price), "USD".to_string());
            }
        }

        let text = element.text().collect::<String>();
        let (price, currency) = parse_price(text.trim());
        if let Some(price) = price {
            if price > Decimal::ZERO {
                return (Some(price), currency);
            }
        }
    }
    (None, "USD".to_string())
}

// ---------------------------------------------------------------------------
// schema.org JSON-LD fallback
// ---------------------------------------------------------------------------

fn parse_jsonld_products(document: &Html, base: &Url) -> Vec<DiscoveredProduct> {
    let Ok(selector) = Selector::parse(r#"script[type="application/ld+json"]"#) else {
        return vec![];
    };

    let mut products: Vec<DiscoveredProduct> = Vec::new();

    for script in document.select(&selector) {
        let json_text = script.text().collect::<String>();
        let Ok(data) = serde_json::from_str::<serde_json::Value>(&json_text) else {
            continue;
        };

        let items: Vec<serde_json::Value> = if let Some(array) = data.as_array() {
            array.clone()
        } else if data.get("@type").and_then(serde_json::Value::as_str) == Some("Product") {
            vec![data]
        } else if data.get("@type").and_then(serde_json::Value::as_str) == Some("ItemList") {
            data.get("itemListElement")
                .and_then(serde_json::Value::as_array)
                .cloned()
                .unwrap_or_default()
        } else {
            continue;
        };

        for item in &items {
            if let Some(product) = parse_jsonld_product(item, base) {
                products.push(product);
            }
        }
    }

    products
}

fn parse_jsonld_product(data: &serde_json::Value, base: &Url) -> Option<DiscoveredProduct> {
    // ItemList entries wrap the product in an `item` key.
    let data = data.get("item").unwrap_or(data);

    if let Some(type_tag) = data.get("@type").and_then(serde_json::Value::as_str) {
        if !type_tag.eq_ignore_ascii_case("product") {
            return None;
        }
    }

    let name = data.get("name")?.as_str()?.to_string();
    if name.is_empty() {
        return None;
    }

    let product_url = data
        .get("url")
        .and_then(serde_json::Value::as_str)
        .and_then(|u| base.join(u).ok())
        .map(String::from)
        .unwrap_or_default();

    // `image` may be a string, an array, or an ImageObject.
    let image_url = match data.get("image") {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Array(items)) => items
            .first()
            .and_then(|i| i.as_str().map(str::to_string).or_else(|| {
                i.get("url").and_then(serde_json::Value::as_str).map(str::to_string)
            })),
        Some(serde_json::Value::Object(obj)) => obj
            .get("url")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string),
        _ => None,
    };

    // `offers` may be a single object or an array; take the first.
    let offers = match data.get("offers") {
        Some(serde_json::Value::Array(items)) => items.first().cloned(),
        Some(offer) => Some(offer.clone()),
        None => None,
    };
    let price = offers
        .as_ref()
        .and_then(|o| o.get("price"))
        .and_then(json_decimal);
    let currency = offers
        .as_ref()
        .and_then(|o| o.get("priceCurrency"))
        .and_then(serde_json::Value::as_str)
        .unwrap_or("USD")
        .to_string();

    Some(DiscoveredProduct {
        name,
        price,
        currency,
        image_url,
        product_url,
        platform: Platform::Custom,
        variant_id: None,
        sku: data
            .get("sku")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string),
        in_stock: true,
        product_type: None,
        tags: vec![],
        description: data
            .get("description")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string),
        raw_data: data.clone(),
    })
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

/// Lazy-loaded images keep the real source in `data-src`.
fn select_image_src(card: &ElementRef<'_>, selectors: &str) -> Option<String> {
    let selector = Selector::parse(selectors).ok()?;
    let element = card.select(&selector).next()?;
    element
        .value()
        .attr("src")
        .or_else(|| element.value().attr("data-src"))
        .map(str::to_string)
}
