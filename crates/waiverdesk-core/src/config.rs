use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
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
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Upstream settings are optional here: an absent base URL or credential
/// becomes an empty string. Whether that is acceptable is decided by the
/// server at startup, based on the environment.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let env = parse_environment(&or_default("WAIVERDESK_ENV", "development"))?;

    let bind_addr = or_default("WAIVERDESK_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("WAIVERDESK_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("WAIVERDESK_LOG_LEVEL", "info");

    let tax_api_base_url = or_default("TAX_API_BASE_URL", "").trim().to_string();
    let tax_api_key = or_default("TAX_API_KEY", "");
    let tax_api_key_header = or_default("TAX_API_KEY_HEADER", "x-api-key");
    if tax_api_key_header.trim().is_empty() {
        return Err(invalid(
            "TAX_API_KEY_HEADER",
            "header name must not be empty".to_string(),
        ));
    }

    let upstream_timeout_secs = or_default("WAIVERDESK_UPSTREAM_TIMEOUT_SECS", "30")
        .parse::<u64>()
        .map_err(|e| invalid("WAIVERDESK_UPSTREAM_TIMEOUT_SECS", e.to_string()))?;
    if upstream_timeout_secs == 0 {
        return Err(invalid(
            "WAIVERDESK_UPSTREAM_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }

    let seed_path = lookup("WAIVERDESK_SEED_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);
    let proxy_url = or_default("WAIVERDESK_PROXY_URL", "http://127.0.0.1:3000");

    let rate_limit_per_minute = or_default("WAIVERDESK_RATE_LIMIT_PER_MINUTE", "120")
        .parse::<usize>()
        .map_err(|e| invalid("WAIVERDESK_RATE_LIMIT_PER_MINUTE", e.to_string()))?;
    if rate_limit_per_minute == 0 {
        return Err(invalid(
            "WAIVERDESK_RATE_LIMIT_PER_MINUTE",
            "must be greater than zero".to_string(),
        ));
    }

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        tax_api_base_url,
        tax_api_key,
        tax_api_key_header,
        upstream_timeout_secs,
        seed_path,
        proxy_url,
        rate_limit_per_minute,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "development" | "dev" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" | "prod" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "WAIVERDESK_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
