use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::api::{ListQuery, SortField, SortOrder};
use crate::domain::order::DeliveryScheduler;
use crate::utils::RetryConfig;

// ============================================================================
// Admin Configuration
// ============================================================================
//
// Loaded from a TOML file. Every section and every field has a default, so
// an empty file (or no file at all) gives a working local setup.
//
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.message().to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub retry: RetrySettings,
}

/// Order backend connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub sort_by: SortField,
    #[serde(default)]
    pub sort_order: SortOrder,
}

fn default_page_size() -> u32 {
    20
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

/// Business timezone used to resolve symbolic delivery days
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    5000
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

/// Offsets beyond +/- 14h do not exist anywhere
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

impl AdminConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: AdminConfig = content.parse()?;

        tracing::info!(
            path = %path.as_ref().display(),
            base_url = %config.api.base_url,
            "⚙️  Configuration loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Validation("api.base_url must not be empty".into()));
        }
        if self.api.request_timeout_secs == 0 {
            return Err(ConfigError::Validation("api.request_timeout_secs must be positive".into()));
        }
        if self.listing.page_size == 0 {
            return Err(ConfigError::Validation("listing.page_size must be positive".into()));
        }
        if self.delivery.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(ConfigError::Validation(format!(
                "delivery.utc_offset_minutes {} is out of range",
                self.delivery.utc_offset_minutes
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Validation("retry.max_attempts must be at least 1".into()));
        }
        if self.retry.multiplier < 1.0 {
            return Err(ConfigError::Validation("retry.multiplier must be >= 1.0".into()));
        }
        Ok(())
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry.max_attempts,
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            multiplier: self.retry.multiplier,
        }
    }

    pub fn scheduler(&self) -> Result<DeliveryScheduler, ConfigError> {
        DeliveryScheduler::with_offset_minutes(self.delivery.utc_offset_minutes).ok_or_else(|| {
            ConfigError::Validation(format!(
                "delivery.utc_offset_minutes {} is out of range",
                self.delivery.utc_offset_minutes
            ))
        })
    }

    /// First-page query with the configured page size and sort
    pub fn default_query(&self) -> ListQuery {
        ListQuery {
            limit: self.listing.page_size,
            ..ListQuery::default()
        }
        .sorted_by(self.listing.sort_by, self.listing.sort_order)
    }
}

impl FromStr for AdminConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: AdminConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: AdminConfig = "".parse().unwrap();
        assert_eq!(config, AdminConfig::default());
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.listing.page_size, 20);
        assert_eq!(config.retry_config(), RetryConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config: AdminConfig = r#"
            [api]
            base_url = "https://admin.example.com/api"
            api_token = "secret"

            [listing]
            page_size = 50
            sort_by = "totalAmount"
            sort_order = "asc"

            [delivery]
            utc_offset_minutes = 120
        "#
        .parse()
        .unwrap();

        assert_eq!(config.api.api_token.as_deref(), Some("secret"));
        assert_eq!(config.api.request_timeout_secs, 30);

        let query = config.default_query();
        assert_eq!(query.limit, 50);
        assert_eq!(query.sort_by, SortField::TotalAmount);
        assert_eq!(query.sort_order, SortOrder::Asc);

        assert_eq!(config.scheduler().unwrap().offset().local_minus_utc(), 7200);
    }

    #[test]
    fn test_validation_errors() {
        let result: Result<AdminConfig, _> = "[listing]\npage_size = 0".parse();
        assert!(matches!(result, Err(ConfigError::Validation(_))));

        let result: Result<AdminConfig, _> = "[delivery]\nutc_offset_minutes = 2000".parse();
        assert!(matches!(result, Err(ConfigError::Validation(_))));

        let result: Result<AdminConfig, _> = "[retry]\nmax_attempts = 0".parse();
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_parse_error() {
        let result: Result<AdminConfig, _> = "[api\nbase_url = ".parse();
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[retry]\nmax_attempts = 5\ninitial_delay_ms = 10").unwrap();

        let config = AdminConfig::load(file.path()).unwrap();
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry_config().initial_delay, Duration::from_millis(10));
    }

    #[test]
    fn test_missing_file() {
        let result = AdminConfig::load("/nonexistent/order_desk.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
