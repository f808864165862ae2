use crate::app_config::EngineConfig;
use crate::ConfigError;

/// Load engine configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid. Every variable
/// has a default, so a bare environment is valid.
pub fn load_engine_config() -> Result<EngineConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_engine_config_from_env()
}

/// Load engine configuration from environment variables already in the process.
///
/// Unlike [`load_engine_config`], this does NOT load `.env` files — useful for
/// testing or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_engine_config_from_env() -> Result<EngineConfig, ConfigError> {
    build_engine_config(|key| std::env::var(key))
}

/// Build engine configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual
/// environment so it can be tested with a pure `HashMap` lookup — no
/// `set_var`/`remove_var` needed.
fn build_engine_config<F>(lookup: F) -> Result<EngineConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<bool>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let max_products_fetch = parse_usize("PRICEWATCH_MAX_PRODUCTS_FETCH", "500")?;
    let request_timeout_secs = parse_u64("PRICEWATCH_REQUEST_TIMEOUT_SECS", "30")?;
    let browser_timeout_secs = parse_u64("PRICEWATCH_BROWSER_TIMEOUT_SECS", "30")?;
    let browser_settle_ms = parse_u64("PRICEWATCH_BROWSER_SETTLE_MS", "2000")?;
    let scrape_delay_min_ms = parse_u64("PRICEWATCH_SCRAPE_DELAY_MIN_MS", "2000")?;
    let scrape_delay_max_ms = parse_u64("PRICEWATCH_SCRAPE_DELAY_MAX_MS", "5000")?;
    let proxy_api_key = lookup("PRICEWATCH_PROXY_API_KEY").ok();
    let allow_insecure_urls = parse_bool("PRICEWATCH_ALLOW_INSECURE_URLS", "false")?;

    if scrape_delay_min_ms > scrape_delay_max_ms {
        return Err(ConfigError::InvalidEnvVar {
            var: "PRICEWATCH_SCRAPE_DELAY_MIN_MS".to_string(),
            reason: format!(
                "minimum delay {scrape_delay_min_ms}ms exceeds maximum {scrape_delay_max_ms}ms"
            ),
        });
    }

    Ok(EngineConfig {
        max_products_fetch,
        request_timeout_secs,
        browser_timeout_secs,
        browser_settle_ms,
        scrape_delay_min_ms,
        scrape_delay_max_ms,
        proxy_api_key,
        allow_insecure_urls,
    })
}
