//! Configuration for accounting-service.

use serde::Deserialize;
use service_core::config::Config as CommonConfig;
use service_core::error::AppError;

/// Database pool settings.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    2
}

/// Top-level service configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AccountingConfig {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    pub database: DatabaseConfig,
    /// TTL for cached `app_settings` reads, in seconds.
    #[serde(default = "default_settings_ttl_secs")]
    pub settings_ttl_secs: u64,
}

fn default_service_name() -> String {
    "accounting-service".to_string()
}

fn default_settings_ttl_secs() -> u64 {
    60
}

impl AccountingConfig {
    pub fn load() -> Result<Self, AppError> {
        service_core::config::load_from_env()
    }
}
