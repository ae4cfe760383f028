//! Configuration management for Tarifa
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files with support for environment variable overrides.

mod defaults;

use crate::aggregate::MonthKey;
use crate::error::{Result, TarifaError};
use crate::gateway::{ConsumptionQuery, ContractQuery};
use crate::logging::parse_log_level;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Longest cache lifetime accepted from configuration (one leap year)
pub const MAX_TTL_HOURS: u32 = 24 * 366;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Local response cache
    pub cache: CacheConfig,

    /// Supply point to summarize
    pub supply: SupplyConfig,

    /// Upstream API access
    pub api: ApiConfig,

    /// Zone used to decide the current calendar month
    pub timezone: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional override for the console layer
    pub console_level: Option<String>,

    /// Optional override for the file layer
    pub file_level: Option<String>,

    /// Path to log file (its directory receives the rolling files)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// JSON file backing the cache
    pub path: String,

    /// Storage budget in bytes (keys plus values)
    pub max_bytes: usize,

    /// Lifetime of cached consumption series
    pub consumption_ttl_hours: u32,

    /// Lifetime of cached contract details
    pub contract_ttl_hours: u32,
}

/// Supply point identity and series selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplyConfig {
    /// CUPS identifier
    pub cups: String,

    /// Distributor code as reported by the provider
    pub distributor_code: String,

    /// Measurement type code (0 = hourly)
    pub measurement_type: u8,

    /// Point type code
    pub point_type: u8,

    /// First month to request, `YYYY/MM`; defaults to eleven months before `end_month`
    pub start_month: Option<String>,

    /// Last month to request, `YYYY/MM`; defaults to the current month
    pub end_month: Option<String>,
}

/// Upstream API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the private API
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Bearer token obtained by the login flow
    #[serde(skip_serializing)]
    pub token: String,
}

impl SupplyConfig {
    fn require_identity(&self) -> Result<()> {
        if self.cups.trim().is_empty() {
            return Err(TarifaError::validation("supply.cups", "CUPS is required"));
        }
        if self.distributor_code.trim().is_empty() {
            return Err(TarifaError::validation(
                "supply.distributor_code",
                "Distributor code is required",
            ));
        }
        Ok(())
    }

    /// Contract lookup for the configured supply
    pub fn contract_query(&self) -> Result<ContractQuery> {
        self.require_identity()?;
        Ok(ContractQuery::new(&self.cups, &self.distributor_code))
    }

    /// Consumption series for the configured range, ending at `current`
    /// unless `end_month` says otherwise
    pub fn consumption_query(&self, current: MonthKey) -> Result<ConsumptionQuery> {
        self.require_identity()?;
        let end = match &self.end_month {
            Some(m) => m.parse::<MonthKey>()?,
            None => current,
        };
        let start = match &self.start_month {
            Some(m) => m.parse::<MonthKey>()?,
            None => end.add_months(-11),
        };
        if start > end {
            return Err(TarifaError::validation(
                "supply.start_month",
                "Must not be after end_month",
            ));
        }
        Ok(ConsumptionQuery {
            cups: self.cups.clone(),
            distributor_code: self.distributor_code.clone(),
            start,
            end,
            measurement_type: self.measurement_type,
            point_type: self.point_type,
        })
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the first default location that exists
    pub fn load() -> Result<Self> {
        let default_paths = [
            "tarifa_config.yaml",
            "/data/tarifa_config.yaml",
            "/etc/tarifa/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Fall back to default configuration
        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Apply `TARIFA_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup
    pub fn apply_env_overrides_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get("TARIFA_TOKEN") {
            self.api.token = v;
        }
        if let Some(v) = get("TARIFA_CUPS") {
            self.supply.cups = v;
        }
        if let Some(v) = get("TARIFA_DISTRIBUTOR_CODE") {
            self.supply.distributor_code = v;
        }
        if let Some(v) = get("TARIFA_CACHE_PATH") {
            self.cache.path = v;
        }
        if let Some(v) = get("TARIFA_LOG_LEVEL") {
            self.logging.level = v;
        }
    }

    /// Configured zone
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|_| {
            TarifaError::validation("timezone".to_string(), format!("Unknown zone {}", self.timezone))
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        parse_log_level(&self.logging.level)
            .map_err(|e| TarifaError::validation("logging.level".to_string(), e.to_string()))?;

        if self.cache.path.trim().is_empty() {
            return Err(TarifaError::validation("cache.path", "Cannot be empty"));
        }
        if self.cache.max_bytes == 0 {
            return Err(TarifaError::validation(
                "cache.max_bytes",
                "Must be greater than 0",
            ));
        }
        for (field, hours) in [
            ("cache.consumption_ttl_hours", self.cache.consumption_ttl_hours),
            ("cache.contract_ttl_hours", self.cache.contract_ttl_hours),
        ] {
            if hours == 0 || hours > MAX_TTL_HOURS {
                return Err(TarifaError::validation(
                    field.to_string(),
                    format!("Must be between 1 and {}", MAX_TTL_HOURS),
                ));
            }
        }

        if self.api.base_url.trim().is_empty() {
            return Err(TarifaError::validation("api.base_url", "Cannot be empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(TarifaError::validation(
                "api.timeout_secs",
                "Must be greater than 0",
            ));
        }

        for (field, value) in [
            ("supply.start_month", &self.supply.start_month),
            ("supply.end_month", &self.supply.end_month),
        ] {
            if let Some(m) = value {
                m.parse::<MonthKey>()
                    .map_err(|_| TarifaError::validation(field, "Expected YYYY/MM"))?;
            }
        }

        self.timezone()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.cache.consumption_ttl_hours, 24);
        assert_eq!(config.cache.contract_ttl_hours, 48);
        assert_eq!(config.supply.point_type, 5);
        assert_eq!(config.timezone, "Europe/Madrid");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.cache.max_bytes = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.cache.contract_ttl_hours = MAX_TTL_HOURS;
        assert!(config.validate().is_ok());
        config.cache.contract_ttl_hours = u32::MAX;
        assert!(config.validate().is_err());

        config = Config::default();
        config.timezone = "Mars/Olympus".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.supply.end_month = Some("2024-05".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides_from_lookup() {
        let mut config = Config::default();
        config.apply_env_overrides_with(|key| match key {
            "TARIFA_TOKEN" => Some("abc".to_string()),
            "TARIFA_CUPS" => Some("ES001".to_string()),
            "TARIFA_LOG_LEVEL" => Some("   ".to_string()),
            _ => None,
        });
        assert_eq!(config.api.token, "abc");
        assert_eq!(config.supply.cups, "ES001");
        assert_eq!(config.logging.level, "INFO");
    }

    #[test]
    fn test_consumption_query_defaults_to_last_year() {
        let mut config = Config::default();
        assert!(config.supply.contract_query().is_err());
        config.supply.cups = "ES001".to_string();
        config.supply.distributor_code = "2".to_string();

        let current = MonthKey::new(2024, 5).unwrap();
        let q = config.supply.consumption_query(current).unwrap();
        assert_eq!(q.start, MonthKey::new(2023, 6).unwrap());
        assert_eq!(q.end, current);

        config.supply.start_month = Some("2024/06".to_string());
        assert!(config.supply.consumption_query(current).is_err());
    }
}
