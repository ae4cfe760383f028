use super::*;

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/tarifa.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: "/tmp/tarifa_cache.json".to_string(),
            max_bytes: 5 * 1024 * 1024,
            consumption_ttl_hours: 24,
            contract_ttl_hours: 48,
        }
    }
}

impl Default for SupplyConfig {
    fn default() -> Self {
        Self {
            cups: String::new(),
            distributor_code: String::new(),
            measurement_type: 0,
            point_type: 5,
            start_month: None,
            end_month: None,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://datadis.es/api-private/api".to_string(),
            timeout_secs: 30,
            token: String::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            cache: CacheConfig::default(),
            supply: SupplyConfig::default(),
            api: ApiConfig::default(),
            timezone: "Europe/Madrid".to_string(),
        }
    }
}
