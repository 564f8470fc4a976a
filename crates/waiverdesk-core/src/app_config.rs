use std::net::SocketAddr;
use std::path::PathBuf;

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Base address of the tax-authority TIN endpoint. Empty when unset.
    pub tax_api_base_url: String,
    /// Service credential for the tax authority. Empty when unset.
    pub tax_api_key: String,
    pub tax_api_key_header: String,
    pub upstream_timeout_secs: u64,
    pub seed_path: Option<PathBuf>,
    pub proxy_url: String,
    pub rate_limit_per_minute: usize,
}

impl AppConfig {
    /// Returns `true` when both the upstream base URL and credential are set.
    #[must_use]
    pub fn upstream_configured(&self) -> bool {
        !self.tax_api_base_url.trim().is_empty() && !self.tax_api_key.trim().is_empty()
    }

    /// Fails when an upstream setting is missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] naming the first unset variable.
    pub fn require_upstream(&self) -> Result<(), ConfigError> {
        if self.tax_api_base_url.trim().is_empty() {
            return Err(ConfigError::MissingEnvVar("TAX_API_BASE_URL".to_string()));
        }
        if self.tax_api_key.trim().is_empty() {
            return Err(ConfigError::MissingEnvVar("TAX_API_KEY".to_string()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("tax_api_base_url", &self.tax_api_base_url)
            .field(
                "tax_api_key",
                &if self.tax_api_key.is_empty() {
                    ""
                } else {
                    "[redacted]"
                },
            )
            .field("tax_api_key_header", &self.tax_api_key_header)
            .field("upstream_timeout_secs", &self.upstream_timeout_secs)
            .field("seed_path", &self.seed_path)
            .field("proxy_url", &self.proxy_url)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .finish()
    }
}
