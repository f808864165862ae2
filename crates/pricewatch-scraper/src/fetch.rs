//! Low-level HTTP helpers shared by the platform handlers and the
//! single-product scraper.

use std::time::Duration;

use crate::error::ScraperError;

/// Response bodies over this size are discarded; storefront pages that big
/// are not product pages.
pub(crate) const MAX_RESPONSE_BYTES: usize = 5 * 1024 * 1024;

/// Redirect chains longer than this are treated as a fetch failure.
const MAX_REDIRECTS: usize = 5;

/// Desktop browser user-agents rotated across fetches.
pub(crate) const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

pub(crate) fn random_user_agent() -> &'static str {
    USER_AGENTS[rand::random_range(0..USER_AGENTS.len())]
}

/// Builds an HTTP client with the engine's timeout, redirect cap, and a
/// user-agent picked from the rotation pool.
///
/// # Errors
///
/// Returns [`ScraperError::Http`] if the client cannot be constructed
/// (e.g., invalid TLS config or a malformed proxy URL).
pub(crate) fn build_client(
    timeout_secs: u64,
    proxy: Option<&str>,
) -> Result<reqwest::Client, ScraperError> {
    let mut builder = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .user_agent(random_user_agent());

    if let Some(proxy_url) = proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
    }

    Ok(builder.build()?)
}

/// Fetches the HTML body of a URL, enforcing the response-size ceiling.
///
/// # Errors
///
/// - [`ScraperError::Http`] on network failure.
/// - [`ScraperError::UnexpectedStatus`] on any non-2xx status.
/// - [`ScraperError::BodyTooLarge`] when the body exceeds
///   [`MAX_RESPONSE_BYTES`].
pub(crate) async fn fetch_html(
    client: &reqwest::Client,
    url: &str,
) -> Result<String, ScraperError> {
    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ScraperError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_owned(),
        });
    }

    if let Some(length) = response.content_length() {
        if length as usize > MAX_RESPONSE_BYTES {
            return Err(ScraperError::BodyTooLarge {
                limit_bytes: MAX_RESPONSE_BYTES,
            });
        }
    }

    let bytes = response.bytes().await?;
    if bytes.len() > MAX_RESPONSE_BYTES {
        return Err(ScraperError::BodyTooLarge {
            limit_bytes: MAX_RESPONSE_BYTES,
        });
    }

    Ok(String::from_utf8_lossy(&bytes).to_string())
}

/// Performs a GET and parses the body as JSON.
///
/// # Errors
///
/// - [`ScraperError::Http`] on network failure.
/// - [`ScraperError::UnexpectedStatus`] on any non-2xx status.
/// - [`ScraperError::Deserialize`] if the body is not valid JSON.
pub(crate) async fn fetch_json(
    client: &reqwest::Client,
    url: &str,
) -> Result<serde_json::Value, ScraperError> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ScraperError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_owned(),
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ScraperError::Deserialize {
        context: format!("JSON response from {url}"),
        source: e,
    })
}
