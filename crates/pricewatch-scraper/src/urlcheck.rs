//! URL normalization and outbound-request hardening.
//!
//! Every user-supplied URL passes through [`UrlPolicy`] before any network
//! call is made; this is the single choke point that keeps the engine from
//! being pointed at loopback, private, link-local, or cloud-metadata
//! addresses.

use std::net::{Ipv4Addr, Ipv6Addr};

use url::{Host, Url};

use crate::error::ScraperError;

/// Domain suffixes that only resolve on internal networks.
const INTERNAL_SUFFIXES: [&str; 6] = [".local", ".internal", ".corp", ".lan", ".home", ".intranet"];

/// Cloud metadata hosts, reachable from inside most cloud VMs.
const METADATA_HOSTS: [&str; 1] = ["metadata.google.internal"];

/// Normalization and SSRF policy applied to every outbound URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlPolicy {
    /// Relaxes the HTTPS-only and private-host rules so the engine can be
    /// pointed at local fixtures. Never enable outside tests/dev.
    pub allow_insecure: bool,
}

impl UrlPolicy {
    #[must_use]
    pub fn strict() -> Self {
        Self {
            allow_insecure: false,
        }
    }

    /// Canonicalizes a raw user-entered string into a parsed HTTPS URL.
    ///
    /// Bare domains (contain a `.`, no embedded space) get `https://`
    /// prepended. `http://` input is rejected outright rather than silently
    /// upgraded, so the user learns their link was insecure.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] for insecure schemes or strings
    /// that do not look like a URL at all.
    pub fn normalize(&self, raw: &str) -> Result<Url, ScraperError> {
        let trimmed = raw.trim();

        if trimmed.to_lowercase().starts_with("http://") {
            if self.allow_insecure {
                return Url::parse(trimmed).map_err(|e| ScraperError::InvalidUrl {
                    reason: e.to_string(),
                });
            }
            return Err(ScraperError::InvalidUrl {
                reason: "HTTP is not secure; use HTTPS or enter the domain without a protocol"
                    .to_string(),
            });
        }

        let candidate = if trimmed.starts_with("https://") {
            trimmed.to_string()
        } else if trimmed.contains('.') && !trimmed.contains(' ') {
            format!("https://{trimmed}")
        } else {
            return Err(ScraperError::InvalidUrl {
                reason: "invalid URL format".to_string(),
            });
        };

        Url::parse(&candidate).map_err(|e| ScraperError::InvalidUrl {
            reason: e.to_string(),
        })
    }

    /// Checks a normalized URL against the SSRF rules.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::DisallowedUrl`] for non-HTTPS schemes,
    /// loopback/private/link-local/unique-local addresses, cloud metadata
    /// hosts, and internal-only domain suffixes.
    pub fn validate(&self, url: &Url) -> Result<(), ScraperError> {
        let Some(host) = url.host() else {
            return Err(ScraperError::DisallowedUrl {
                reason: "URL has no host".to_string(),
            });
        };

        if self.allow_insecure {
            return Ok(());
        }

        if url.scheme() != "https" {
            return Err(ScraperError::DisallowedUrl {
                reason: "only HTTPS URLs are allowed".to_string(),
            });
        }

        match host {
            Host::Ipv4(addr) => check_ipv4(addr),
            Host::Ipv6(addr) => check_ipv6(addr),
            Host::Domain(domain) => check_domain(domain),
        }
    }
}

fn disallowed(reason: &str) -> ScraperError {
    ScraperError::DisallowedUrl {
        reason: reason.to_string(),
    }
}

fn check_ipv4(addr: Ipv4Addr) -> Result<(), ScraperError> {
    let octets = addr.octets();

    if addr.is_loopback() || octets[0] == 0 {
        return Err(disallowed("loopback addresses are not allowed"));
    }
    if addr.is_private() {
        return Err(disallowed("private or internal addresses are not allowed"));
    }
    // 169.254.0.0/16 covers the cloud metadata endpoint 169.254.169.254.
    if addr.is_link_local() {
        return Err(disallowed(
            "link-local and metadata addresses are not allowed",
        ));
    }

    Ok(())
}

fn check_ipv6(addr: Ipv6Addr) -> Result<(), ScraperError> {
    let segments = addr.segments();

    if addr.is_loopback() {
        return Err(disallowed("loopback addresses are not allowed"));
    }
    // fe80::/10 link-local.
    if segments[0] & 0xffc0 == 0xfe80 {
        return Err(disallowed(
            "link-local and metadata addresses are not allowed",
        ));
    }
    // fc00::/7 unique-local.
    if segments[0] & 0xfe00 == 0xfc00 {
        return Err(disallowed("private or internal addresses are not allowed"));
    }

    Ok(())
}

fn check_domain(domain: &str) -> Result<(), ScraperError> {
    let lowered = domain.to_lowercase();
    let lowered = lowered.trim_end_matches('.');

    if lowered == "localhost" {
        return Err(disallowed("loopback addresses are not allowed"));
    }
    if METADATA_HOSTS.contains(&lowered) {
        return Err(disallowed(
            "link-local and metadata addresses are not allowed",
        ));
    }
    if INTERNAL_SUFFIXES.iter().any(|s| lowered.ends_with(s)) {
        return Err(disallowed("private or internal addresses are not allowed"));
    }

    Ok(())
}
