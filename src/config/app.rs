//! Main application configuration
//!
//! This module defines the primary configuration structures for the
//! padel-rating service, including environment variable and file loading
//! and validation.

use crate::config::rating::{RatingConfig, TrialFormula};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub rating: RatingConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "padel-rating".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; environment variables still override it
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }

        // Rating settings
        if let Ok(min) = env::var("RATING_MIN") {
            self.rating.min_rating = min
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_MIN value: {}", min))?;
        }
        if let Ok(max) = env::var("RATING_MAX") {
            self.rating.max_rating = max
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_MAX value: {}", max))?;
        }
        if let Ok(limit) = env::var("RATING_DAILY_CHANGE_LIMIT") {
            self.rating.daily_change_limit = limit
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_DAILY_CHANGE_LIMIT value: {}", limit))?;
        }
        if let Ok(days) = env::var("RATING_LEDGER_RETENTION_DAYS") {
            self.rating.ledger_retention_days = days
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_LEDGER_RETENTION_DAYS value: {}", days))?;
        }
        if let Ok(formula) = env::var("RATING_TRIAL_FORMULA") {
            self.rating.trial.formula = formula
                .parse::<TrialFormula>()
                .map_err(|_| anyhow!("Invalid RATING_TRIAL_FORMULA value: {}", formula))?;
        }

        Ok(())
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.name.is_empty() {
        return Err(anyhow!("Service name cannot be empty"));
    }

    config.rating.validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.service.name, "padel-rating");
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = AppConfig::default();
        config.service.log_level = "verbose".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_rating_section_fails_app_validation() {
        let mut config = AppConfig::default();
        config.rating.daily_change_limit = 0.0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_from_toml_str() {
        let config = AppConfig::from_toml_str(
            r#"
            [service]
            log_level = "debug"

            [rating]
            ledger_retention_days = 3

            [rating.change_table]
            win_vs_equal = 0.12
            "#,
        )
        .unwrap();

        assert_eq!(config.service.log_level, "debug");
        assert_eq!(config.service.name, "padel-rating");
        assert_eq!(config.rating.ledger_retention_days, 3);
        assert_eq!(config.rating.change_table.win_vs_equal, 0.12);
        assert_eq!(config.rating.change_table.win_vs_weaker, 0.05);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_from_toml_str_rejects_garbage() {
        assert!(AppConfig::from_toml_str("[rating\nmax_rating = ").is_err());
    }
}
