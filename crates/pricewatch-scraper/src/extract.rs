//! HTML price extraction via CSS selector cascades.
//!
//! The cascade runs retailer-specific selectors first, then selectors for a
//! platform detected from signature strings in the raw HTML, then a generic
//! fallback group. The first strictly-positive parsed price wins.

use rust_decimal::Decimal;
use scraper::{Html, Selector};
use url::Url;

use crate::price::parse_price;

const AMAZON_SELECTORS: [&str; 5] = [
    ".a-price .a-offscreen",
    "#priceblock_ourprice",
    "#priceblock_dealprice",
    ".a-price-whole",
    "[data-a-color='price'] .a-offscreen",
];

const EBAY_SELECTORS: [&str; 4] = [
    ".x-price-primary span",
    "#prcIsum",
    ".display-price",
    "[itemprop='price']",
];

const WALMART_SELECTORS: [&str; 3] = [
    "[itemprop='price']",
    ".price-characteristic",
    "[data-automation='buybox-price']",
];

const SHOPIFY_SELECTORS: [&str; 8] = [
    ".price__current .money",
    ".product__price .money",
    ".product-price .money",
    "[data-product-price]",
    ".price-item--regular",
    ".price-item--sale",
    ".ProductMeta__Price",
    ".product-single__price",
];

const WOOCOMMERCE_SELECTORS: [&str; 6] = [
    ".woocommerce-Price-amount bdi",
    ".woocommerce-Price-amount",
    ".price ins .amount",
    ".price .amount",
    ".summary .price",
    "p.price span.amount",
];

const GENERIC_SELECTORS: [&str; 12] = [
    "[itemprop='price']",
    "[data-price]",
    "[data-product-price]",
    "meta[property='product:price:amount']",
    ".price",
    ".product-price",
    ".current-price",
    ".sale-price",
    ".regular-price",
    "#product-price",
    ".price-value",
    ".amount",
];

/// Maps a product-page URL to a known retailer tag, if any.
pub(crate) fn get_retailer(url: &Url) -> Option<&'static str> {
    let host = url.host_str()?;
    if host.contains("amazon") {
        Some("amazon")
    } else if host.contains("ebay") {
        Some("ebay")
    } else if host.contains("walmart") {
        Some("walmart")
    } else {
        None
    }
}

/// Detects an e-commerce platform from signature strings in raw HTML.
pub(crate) fn detect_platform_from_html(html: &str) -> Option<&'static str> {
    let lowered = html.to_lowercase();
    if lowered.contains("shopify") || lowered.contains("cdn.shopify") {
        Some("shopify")
    } else if lowered.contains("woocommerce") || lowered.contains("wc-block") {
        Some("woocommerce")
    } else {
        None
    }
}

fn selectors_for(tag: &str) -> Option<&'static [&'static str]> {
    match tag {
        "amazon" => Some(&AMAZON_SELECTORS),
        "ebay" => Some(&EBAY_SELECTORS),
        "walmart" => Some(&WALMART_SELECTORS),
        "shopify" => Some(&SHOPIFY_SELECTORS),
        "woocommerce" => Some(&WOOCOMMERCE_SELECTORS),
        _ => None,
    }
}

/// Extracts the first strictly-positive price from a product page.
///
/// `retailer` is the tag from [`get_retailer`]; when absent, the platform is
/// sniffed from the HTML itself before the generic fallback group runs.
/// Returns `(None, "USD")` when no selector yields a positive price.
pub(crate) fn extract_price_from_html(html: &str, retailer: Option<&str>) -> (Option<Decimal>, String) {
    let mut groups: Vec<&'static [&'static str]> = Vec::new();

    if let Some(tag) = retailer {
        if let Some(group) = selectors_for(tag) {
            groups.push(group);
        }
    } else if let Some(platform) = detect_platform_from_html(html) {
        if let Some(group) = selectors_for(platform) {
            groups.push(group);
        }
    }
    groups.push(&GENERIC_SELECTORS);

    let document = Html::parse_document(html);

    for group in groups {
        for selector_str in group {
            let Ok(selector) = Selector::parse(selector_str) else {
                continue;
            };
            for element in document.select(&selector) {
                let text = if selector_str.starts_with("meta[") {
                    match element.value().attr("content") {
                        Some(content) => content.to_string(),
                        None => continue,
                    }
                } else {
                    element.text().collect::<String>()
                };

                let (price, currency) = parse_price(text.trim());
                if let Some(price) = price {
                    if price > Decimal::ZERO {
                        return (Some(price), currency);
                    }
                }
            }
        }
    }

    (None, "USD".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn retailer_from_hostname() {
        let url = Url::parse("https://www.amazon.co.uk/dp/B00X").unwrap();
        assert_eq!(get_retailer(&url), Some("amazon"));
        let url = Url::parse("https://www.ebay.de/itm/123").unwrap();
        assert_eq!(get_retailer(&url), Some("ebay"));
        let url = Url::parse("https://shop.example.com/p/1").unwrap();
        assert_eq!(get_retailer(&url), None);
    }

    #[test]
    fn detects_shopify_from_cdn_reference() {
        let html = r#"<html><head><link href="https://cdn.shopify.com/assets/x.css"></head></html>"#;
        assert_eq!(detect_platform_from_html(html), Some("shopify"));
    }

    #[test]
    fn detects_woocommerce_from_block_classes() {
        let html = r#"<div class="wc-block-grid__products"></div>"#;
        assert_eq!(detect_platform_from_html(html), Some("woocommerce"));
    }

    #[test]
    fn extracts_amazon_offscreen_price() {
        let html = r#"
            <div class="a-price"><span class="a-offscreen">$24.99</span></div>
        "#;
        let (price, currency) = extract_price_from_html(html, Some("amazon"));
        assert_eq!(price, Some(dec("24.99")));
        assert_eq!(currency, "USD");
    }

    #[test]
    fn extracts_price_from_meta_content_attribute() {
        let html = r#"
            <html><head>
            <meta property="product:price:amount" content="49.99">
            </head><body></body></html>
        "#;
        let (price, _) = extract_price_from_html(html, None);
        assert_eq!(price, Some(dec("49.99")));
    }

    #[test]
    fn detected_shopify_platform_selectors_apply_before_generic() {
        let html = r#"
            <html><head><script src="https://cdn.shopify.com/s/app.js"></script></head>
            <body><span class="price-item--regular">£15.00</span></body></html>
        "#;
        let (price, currency) = extract_price_from_html(html, None);
        assert_eq!(price, Some(dec("15.00")));
        assert_eq!(currency, "GBP");
    }

    #[test]
    fn zero_priced_elements_are_skipped() {
        let html = r#"
            <span class="price">$0.00</span>
            <span class="product-price">$12.50</span>
        "#;
        let (price, _) = extract_price_from_html(html, None);
        assert_eq!(price, Some(dec("12.50")));
    }

    #[test]
    fn page_without_price_returns_none_usd() {
        let html = "<html><body><p>Sold out</p></body></html>";
        let (price, currency) = extract_price_from_html(html, None);
        assert!(price.is_none());
        assert_eq!(currency, "USD");
    }
}
