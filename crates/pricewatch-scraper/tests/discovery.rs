//! Integration tests for `discover_products`.
//!
//! Uses `wiremock` to stand up a local HTTP server per test so no real
//! network traffic is made. The engine runs with `allow_insecure_urls` so
//! the SSRF guard lets it reach the loopback fixture server.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pricewatch_core::EngineConfig;
use pricewatch_scraper::discover_products;

fn test_config() -> EngineConfig {
    EngineConfig {
        request_timeout_secs: 5,
        scrape_delay_min_ms: 0,
        scrape_delay_max_ms: 0,
        allow_insecure_urls: true,
        ..EngineConfig::default()
    }
}

fn shopify_product(id: i64, title: &str, handle: &str, price: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "handle": handle,
        "body_html": null,
        "product_type": "",
        "tags": [],
        "images": [{"src": format!("https://cdn.example.com/{handle}.jpg")}],
        "variants": [{
            "id": id * 10,
            "title": "Default Title",
            "sku": null,
            "price": price,
            "available": true
        }]
    })
}

// ---------------------------------------------------------------------------
// Shopify end-to-end
// ---------------------------------------------------------------------------

#[tokio::test]
async fn discovers_products_from_a_mocked_shopify_store() {
    let server = MockServer::start().await;

    // Detection probe.
    Mock::given(method("GET"))
        .and(path("/products.json"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({"products": []})))
        .mount(&server)
        .await;

    // Catalog page 1, then an empty page to stop pagination.
    Mock::given(method("GET"))
        .and(path("/products.json"))
        .and(query_param("limit", "250"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "products": [
                shopify_product(1, "Basic Tee", "basic-tee", "29.99"),
                shopify_product(2, "Premium Tee", "premium-tee", "49.99"),
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/products.json"))
        .and(query_param("limit", "250"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({"products": []})))
        .mount(&server)
        .await;

    let result = discover_products(&test_config(), &server.uri(), None, 50).await;

    assert_eq!(result.platform, "shopify");
    assert_eq!(result.total_found, 2);
    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);

    assert_eq!(result.products[0].name, "Basic Tee");
    assert_eq!(result.products[0].price, Some("29.99".parse().unwrap()));
    assert_eq!(result.products[0].currency, "USD");
    assert_eq!(result.products[1].price, Some("49.99".parse().unwrap()));
    assert!(result.products[0]
        .product_url
        .ends_with("/products/basic-tee"));
}

#[tokio::test]
async fn shopify_keyword_filter_runs_after_the_full_capped_fetch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products.json"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({"products": []})))
        .mount(&server)
        .await;

    // 300-item catalog across two pages; the only keyword match is item 290.
    let page1: Vec<serde_json::Value> = (1..=250)
        .map(|i| shopify_product(i, &format!("Widget {i}"), &format!("widget-{i}"), "5.00"))
        .collect();
    let page2: Vec<serde_json::Value> = (251..=300)
        .map(|i| {
            if i == 290 {
                shopify_product(i, "Limited Snowboard", "limited-snowboard", "499.00")
            } else {
                shopify_product(i, &format!("Widget {i}"), &format!("widget-{i}"), "5.00")
            }
        })
        .collect();

    Mock::given(method("GET"))
        .and(path("/products.json"))
        .and(query_param("limit", "250"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({"products": page1})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products.json"))
        .and(query_param("limit", "250"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({"products": page2})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products.json"))
        .and(query_param("limit", "250"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({"products": []})))
        .mount(&server)
        .await;

    let result = discover_products(&test_config(), &server.uri(), Some("snowboard"), 10).await;

    assert_eq!(result.platform, "shopify");
    assert_eq!(result.total_found, 1, "keyword match deep in the catalog must survive");
    assert_eq!(result.products[0].name, "Limited Snowboard");
}

#[tokio::test]
async fn shopify_falls_back_to_the_storefront_graphql_api() {
    let server = MockServer::start().await;

    // products.json answers the probe but serves an empty catalog, the
    // shape of a headless/Hydrogen storefront.
    Mock::given(method("GET"))
        .and(path("/products.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({"products": []})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/unstable/graphql.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "data": {
                "products": {
                    "edges": [{
                        "node": {
                            "id": "gid://shopify/Product/1",
                            "title": "Hydrogen Jacket",
                            "handle": "hydrogen-jacket",
                            "description": "Windproof.",
                            "productType": "Apparel",
                            "tags": ["shell"],
                            "priceRange": {
                                "minVariantPrice": {"amount": "120.0", "currencyCode": "USD"}
                            },
                            "images": {"edges": []},
                            "variants": {"edges": [{"node": {
                                "id": "gid://shopify/ProductVariant/5",
                                "availableForSale": true,
                                "sku": "HJ-01"
                            }}]}
                        }
                    }],
                    "pageInfo": {"hasNextPage": false, "endCursor": null}
                }
            }
        })))
        .mount(&server)
        .await;

    let result = discover_products(&test_config(), &server.uri(), None, 50).await;

    assert_eq!(result.platform, "shopify");
    assert_eq!(result.total_found, 1);
    assert_eq!(result.products[0].name, "Hydrogen Jacket");
    assert_eq!(result.products[0].price, Some("120.0".parse().unwrap()));
    assert_eq!(result.products[0].sku.as_deref(), Some("HJ-01"));
}

// ---------------------------------------------------------------------------
// WooCommerce
// ---------------------------------------------------------------------------

#[tokio::test]
async fn discovers_woocommerce_store_api_products_with_minor_unit_prices() {
    let server = MockServer::start().await;

    let store_product = json!({
        "id": 11,
        "name": "Espresso Beans",
        "slug": "espresso-beans",
        "permalink": format!("{}/product/espresso-beans", server.uri()),
        "images": [{"src": "https://cdn.example.com/beans.jpg"}],
        "prices": {"price": "1999", "currency_code": "EUR", "currency_minor_unit": 2},
        "is_in_stock": true,
        "categories": [{"name": "Coffee"}]
    });

    // Shopify probe misses (unmatched requests 404), then the Store API
    // answers both the probe and the catalog pages.
    Mock::given(method("GET"))
        .and(path("/wp-json/wc/store/products"))
        .and(query_param("per_page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!([store_product])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wc/store/products"))
        .and(query_param("per_page", "100"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!([store_product])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wc/store/products"))
        .and(query_param("per_page", "100"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!([])))
        .mount(&server)
        .await;

    let result = discover_products(&test_config(), &server.uri(), None, 50).await;

    assert_eq!(result.platform, "woocommerce");
    assert_eq!(result.total_found, 1);
    let product = &result.products[0];
    assert_eq!(product.price, Some("19.99".parse().unwrap()));
    assert_eq!(product.currency, "EUR");
    assert_eq!(product.tags, vec!["Coffee"]);
}

// ---------------------------------------------------------------------------
// Generic fallback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn falls_back_to_generic_handler_for_plain_html_stores() {
    let server = MockServer::start().await;

    let html = r#"
        <html><body>
        <div class="product-card">
            <h3 class="product-card__title">Canvas Tote</h3>
            <a href="/products/canvas-tote"></a>
            <span class="price">$35.00</span>
        </div>
        <div class="product-card">
            <h3 class="product-card__title">Leather Tote</h3>
            <a href="/products/leather-tote"></a>
            <span class="price">$95.00</span>
        </div>
        <div class="product-card">
            <h3 class="product-card__title">Mini Tote</h3>
            <a href="/products/mini-tote"></a>
            <span class="price">$25.00</span>
        </div>
        </body></html>
    "#;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(&server)
        .await;

    let result = discover_products(&test_config(), &server.uri(), None, 50).await;

    assert_eq!(result.platform, "custom");
    assert_eq!(result.total_found, 3);
    assert_eq!(result.products[0].name, "Canvas Tote");
    assert_eq!(result.products[0].price, Some("35.00".parse().unwrap()));
}

#[tokio::test]
async fn generic_limit_caps_the_returned_products() {
    let server = MockServer::start().await;

    let cards: String = (1..=5)
        .map(|i| {
            format!(
                r#"<div class="product-card">
                    <h3 class="product-card__title">Item {i}</h3>
                    <a href="/products/{i}"></a>
                    <span class="price">${i}.00</span>
                </div>"#
            )
        })
        .collect();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!("<html><body>{cards}</body></html>")))
        .mount(&server)
        .await;

    let result = discover_products(&test_config(), &server.uri(), None, 2).await;

    assert_eq!(result.total_found, 2);
    assert_eq!(result.products.len(), 2);
}

// ---------------------------------------------------------------------------
// Total-function guarantees
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_input_becomes_a_failure_result_not_a_panic() {
    let result = discover_products(&test_config(), "not a url", None, 50).await;

    assert_eq!(result.platform, "unknown");
    assert_eq!(result.total_found, 0);
    assert!(result.products.is_empty());
    let error = result.error.expect("error must be set");
    assert!(error.contains("invalid URL format"), "got: {error}");
}

#[tokio::test]
async fn private_address_is_rejected_by_the_strict_policy() {
    let config = EngineConfig {
        scrape_delay_min_ms: 0,
        scrape_delay_max_ms: 0,
        ..EngineConfig::default()
    };

    let result = discover_products(&config, "https://192.168.1.10/shop", None, 50).await;

    assert_eq!(result.platform, "unknown");
    assert!(result.error.expect("error must be set").contains("private"));
}

#[tokio::test]
async fn unreachable_host_yields_an_empty_result_not_a_panic() {
    let config = EngineConfig {
        request_timeout_secs: 5,
        scrape_delay_min_ms: 0,
        scrape_delay_max_ms: 0,
        ..EngineConfig::default()
    };

    // RFC 2606 reserves .invalid; resolution always fails, so every probe
    // misses and the generic fallback returns an empty catalog.
    let result = discover_products(&config, "https://shop.no-such-host.invalid", None, 50).await;

    assert_eq!(result.platform, "custom");
    assert_eq!(result.total_found, 0);
    assert!(result.products.is_empty());
}

// ---------------------------------------------------------------------------
// discover_single_product
// ---------------------------------------------------------------------------

#[tokio::test]
async fn single_product_discovery_returns_the_first_hit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products.json"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({"products": []})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products.json"))
        .and(query_param("limit", "250"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "products": [
                shopify_product(1, "First Tee", "first-tee", "10.00"),
                shopify_product(2, "Second Tee", "second-tee", "12.00"),
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products.json"))
        .and(query_param("limit", "250"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({"products": []})))
        .mount(&server)
        .await;

    let product = pricewatch_scraper::discover_single_product(&test_config(), &server.uri())
        .await
        .expect("a product should be found");

    assert_eq!(product.name, "First Tee");
}

#[tokio::test]
async fn single_product_discovery_returns_none_when_nothing_is_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .mount(&server)
        .await;

    let product =
        pricewatch_scraper::discover_single_product(&test_config(), &server.uri()).await;

    assert!(product.is_none());
}
