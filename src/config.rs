// Runtime configuration loaded from the environment
// Values may come from a .env file (loaded in main) or the process environment

use std::str::FromStr;

/// Which `LedgerStore` implementation backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::Invalid {
                key: "STORE_BACKEND",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub backend: StoreBackend,
    /// Only required for the postgres backend
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    /// Attempts per ledger workflow before a version conflict is reported
    pub ledger_max_attempts: u32,
    /// Offset of the shop's local day from UTC, used for date filters and dashboard periods
    pub business_utc_offset_hours: i32,
    pub listing_limit: i64,
    pub member_page_size: i64,
}

impl AppConfig {
    /// Build the configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = match std::env::var("STORE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StoreBackend::Postgres,
        };

        let database_url = std::env::var("DATABASE_URL").ok();
        if backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let jwt_secret =
            std::env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        let config = Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", 8080)?,
            backend,
            database_url,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,
            jwt_secret,
            ledger_max_attempts: parse_var("LEDGER_MAX_ATTEMPTS", 3)?,
            business_utc_offset_hours: parse_var("BUSINESS_UTC_OFFSET_HOURS", 8)?,
            listing_limit: parse_var("LISTING_LIMIT", 100)?,
            member_page_size: parse_var("MEMBER_PAGE_SIZE", 15)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Configuration suitable for tests: memory backend, fixed secret
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            backend: StoreBackend::Memory,
            database_url: None,
            db_max_connections: 1,
            jwt_secret: "test_secret_key_for_testing_purposes".to_string(),
            ledger_max_attempts: 3,
            business_utc_offset_hours: 8,
            listing_limit: 100,
            member_page_size: 15,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger_max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "LEDGER_MAX_ATTEMPTS",
                value: "0".to_string(),
            });
        }
        if !(-12..=14).contains(&self.business_utc_offset_hours) {
            return Err(ConfigError::Invalid {
                key: "BUSINESS_UTC_OFFSET_HOURS",
                value: self.business_utc_offset_hours.to_string(),
            });
        }
        if self.listing_limit <= 0 {
            return Err(ConfigError::Invalid {
                key: "LISTING_LIMIT",
                value: self.listing_limit.to_string(),
            });
        }
        if self.member_page_size <= 0 {
            return Err(ConfigError::Invalid {
                key: "MEMBER_PAGE_SIZE",
                value: self.member_page_size.to_string(),
            });
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_backend_parsing() {
        assert_eq!("postgres".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert_eq!("PostgreSQL".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert_eq!(" memory ".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("redis".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_test_config_is_valid() {
        let config = AppConfig::for_tests();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_addr(), "127.0.0.1:0");
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = AppConfig::for_tests();
        config.ledger_max_attempts = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "LEDGER_MAX_ATTEMPTS", .. })
        ));
    }

    #[test]
    fn test_out_of_range_offset_rejected() {
        let mut config = AppConfig::for_tests();
        config.business_utc_offset_hours = 20;
        assert!(config.validate().is_err());
    }
}
