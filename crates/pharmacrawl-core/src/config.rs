use std::env::VarError;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Chrome 120 on Windows; matches what the storefront serves to ordinary visitors.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value cannot be parsed.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value cannot be parsed.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
        }
    };

    let env = parse_environment(&or_default("PHARMACRAWL_ENV", "development"))?;

    let bind_addr = or_default("PHARMACRAWL_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("PHARMACRAWL_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("PHARMACRAWL_LOG_LEVEL", "info");

    let catalog_path = PathBuf::from(or_default(
        "PHARMACRAWL_CATALOG_PATH",
        "./config/catalog.yaml",
    ));
    let data_dir = PathBuf::from(or_default("PHARMACRAWL_DATA_DIR", "./data"));
    let scratch_dir = PathBuf::from(or_default("PHARMACRAWL_SCRATCH_DIR", "./temp"));
    let debug_dir = PathBuf::from(or_default("PHARMACRAWL_DEBUG_DIR", "./debug"));

    let chrome_path = lookup("PHARMACRAWL_CHROME_PATH")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from);
    let headless = parse_bool("PHARMACRAWL_HEADLESS", "true")?;
    let user_agent = or_default("PHARMACRAWL_USER_AGENT", DEFAULT_USER_AGENT);

    let navigation_timeout_ms = parse_u64("PHARMACRAWL_NAVIGATION_TIMEOUT_MS", "60000")?;
    let challenge_timeout_ms = parse_u64("PHARMACRAWL_CHALLENGE_TIMEOUT_MS", "30000")?;
    let challenge_settle_ms = parse_u64("PHARMACRAWL_CHALLENGE_SETTLE_MS", "3000")?;
    let legacy_post_load_delay_ms = parse_u64("PHARMACRAWL_LEGACY_POST_LOAD_DELAY_MS", "2000")?;
    let current_post_load_delay_ms =
        parse_u64("PHARMACRAWL_CURRENT_POST_LOAD_DELAY_MS", "3000")?;
    let inter_request_delay_ms = parse_u64("PHARMACRAWL_INTER_REQUEST_DELAY_MS", "3000")?;
    let max_retries = parse_u32("PHARMACRAWL_MAX_RETRIES", "0")?;
    let retry_backoff_base_ms = parse_u64("PHARMACRAWL_RETRY_BACKOFF_BASE_MS", "5000")?;

    let crawl_schedule = lookup("PHARMACRAWL_CRAWL_SCHEDULE")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        catalog_path,
        data_dir,
        scratch_dir,
        debug_dir,
        chrome_path,
        headless,
        user_agent,
        navigation_timeout_ms,
        challenge_timeout_ms,
        challenge_settle_ms,
        legacy_post_load_delay_ms,
        current_post_load_delay_ms,
        inter_request_delay_ms,
        max_retries,
        retry_backoff_base_ms,
        crawl_schedule,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PHARMACRAWL_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
