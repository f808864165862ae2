//! Headless-browser rendering for client-rendered storefronts.
//!
//! The browser is an external capability behind the [`PageRenderer`] seam;
//! the concurrency strategy is chosen once at construction, not per call.
//! The shipped implementation drives a headless Chromium binary as a child
//! process and reads the JS-executed DOM from stdout.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScraperError;

const DEFAULT_BINARY: &str = "chromium";

/// Renders a URL into the HTML of its JS-executed DOM.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ScraperError::Render`] when the page cannot be rendered.
    async fn render(
        &self,
        url: &str,
        user_agent: &str,
        proxy: Option<&str>,
    ) -> Result<String, ScraperError>;
}

/// [`PageRenderer`] backed by a headless Chromium child process.
pub struct ChromiumRenderer {
    binary: String,
    timeout_secs: u64,
    settle_ms: u64,
}

impl ChromiumRenderer {
    #[must_use]
    pub fn new(timeout_secs: u64, settle_ms: u64) -> Self {
        Self::with_binary(DEFAULT_BINARY, timeout_secs, settle_ms)
    }

    #[must_use]
    pub fn with_binary(binary: impl Into<String>, timeout_secs: u64, settle_ms: u64) -> Self {
        Self {
            binary: binary.into(),
            timeout_secs,
            settle_ms,
        }
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn render(
        &self,
        url: &str,
        user_agent: &str,
        proxy: Option<&str>,
    ) -> Result<String, ScraperError> {
        let mut command = tokio::process::Command::new(&self.binary);
        command
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--hide-scrollbars")
            .arg("--no-first-run")
            .arg(format!("--user-agent={user_agent}"))
            // Lets virtual time advance through the settle window so
            // client-side rendering finishes before the DOM is dumped.
            .arg(format!("--virtual-time-budget={}", self.settle_ms))
            .arg(format!("--timeout={}", self.timeout_secs * 1000));

        if let Some(proxy_url) = proxy {
            // Chromium ignores credentials embedded in --proxy-server;
            // authenticated proxies only work on the plain-HTTP tier.
            command.arg(format!("--proxy-server={proxy_url}"));
        }

        command
            .arg("--dump-dom")
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Hard cap: navigation timeout plus the settle window plus grace.
        let budget =
            Duration::from_secs(self.timeout_secs) + Duration::from_millis(self.settle_ms + 5000);

        let output = match tokio::time::timeout(budget, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return Err(ScraperError::Render {
                    reason: format!("failed to launch {}: {err}", self.binary),
                });
            }
            Err(_) => {
                return Err(ScraperError::Render {
                    reason: format!("render of {url} timed out"),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScraperError::Render {
                reason: format!(
                    "{} exited with {}: {}",
                    self.binary,
                    output.status,
                    stderr.lines().last().unwrap_or_default()
                ),
            });
        }

        let html = String::from_utf8_lossy(&output.stdout).to_string();
        if html.trim().is_empty() {
            return Err(ScraperError::Render {
                reason: format!("empty DOM rendered for {url}"),
            });
        }

        Ok(html)
    }
}
