use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use thiserror::Error;

use crate::governor::{GovernorConfig, GovernorConfigError, DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW_LENGTH_MS};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid governor settings: {0}")]
    Governor(#[from] GovernorConfigError),

    #[error("JWT_SECRET must be set outside development")]
    MissingJwtSecret,

    #[error("SECURITY_JWT_EXPIRY_HOURS must be between 1 and {max}, got {got}")]
    JwtExpiry { got: u64, max: u64 },
}

/// Longest session token lifetime accepted, in hours
pub const MAX_JWT_EXPIRY_HOURS: u64 = 24 * 366;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub governor: GovernorSettings,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub fixture_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Use the first `X-Forwarded-For` hop as the client address
    pub trust_forwarded_for: bool,
}

/// How login attempts are bucketed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStrategy {
    /// One window per client network address
    Peer,
    /// One window per account identifier
    Account,
}

impl FromStr for KeyStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "peer" | "ip" => Ok(KeyStrategy::Peer),
            "account" | "identifier" => Ok(KeyStrategy::Account),
            other => Err(format!("unknown key strategy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorSettings {
    pub window_length_ms: u64,
    pub max_attempts: u32,
    pub key_strategy: KeyStrategy,
    pub reset_on_success: bool,
    /// Background eviction interval; lazy eviction only when unset
    pub sweep_interval_secs: Option<u64>,
}

impl GovernorSettings {
    pub fn governor_config(&self) -> Result<GovernorConfig, GovernorConfigError> {
        GovernorConfig::from_millis(self.window_length_ms, self.max_attempts)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(skip_serializing)]
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    /// Reject settings the server cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.governor.governor_config()?;
        if self.security.jwt_secret.is_empty() {
            return Err(ConfigError::MissingJwtSecret);
        }
        let hours = self.security.jwt_expiry_hours;
        if hours == 0 || hours > MAX_JWT_EXPIRY_HOURS {
            return Err(ConfigError::JwtExpiry {
                got: hours,
                max: MAX_JWT_EXPIRY_HOURS,
            });
        }
        Ok(())
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(v) = env::var("CAREGATE_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("CAREGATE_TRUST_FORWARDED_FOR") {
            self.server.trust_forwarded_for = v.parse().unwrap_or(self.server.trust_forwarded_for);
        }

        // Governor overrides
        if let Ok(v) = env::var("GOVERNOR_WINDOW_LENGTH_MS") {
            self.governor.window_length_ms = v.parse().unwrap_or(self.governor.window_length_ms);
        }
        if let Ok(v) = env::var("GOVERNOR_MAX_ATTEMPTS") {
            self.governor.max_attempts = v.parse().unwrap_or(self.governor.max_attempts);
        }
        if let Ok(v) = env::var("GOVERNOR_KEY_STRATEGY") {
            self.governor.key_strategy = v.parse().unwrap_or(self.governor.key_strategy);
        }
        if let Ok(v) = env::var("GOVERNOR_RESET_ON_SUCCESS") {
            self.governor.reset_on_success = v.parse().unwrap_or(self.governor.reset_on_success);
        }
        if let Ok(v) = env::var("GOVERNOR_SWEEP_INTERVAL_SECS") {
            self.governor.sweep_interval_secs = v.parse().ok().filter(|secs| *secs > 0);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|url| !url.is_empty());
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        if let Ok(v) = env::var("CAREGATE_FIXTURE") {
            self.fixture_path = Some(v).filter(|path| !path.is_empty());
        }

        self
    }

    fn default_governor() -> GovernorSettings {
        GovernorSettings {
            window_length_ms: DEFAULT_WINDOW_LENGTH_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            key_strategy: KeyStrategy::Peer,
            reset_on_success: false,
            sweep_interval_secs: None,
        }
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                trust_forwarded_for: false,
            },
            governor: Self::default_governor(),
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                jwt_secret: "caregate-development-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            fixture_path: None,
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 3000,
                trust_forwarded_for: false,
            },
            governor: GovernorSettings {
                sweep_interval_secs: Some(300),
                ..Self::default_governor()
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            fixture_path: None,
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 3000,
                trust_forwarded_for: false,
            },
            governor: GovernorSettings {
                sweep_interval_secs: Some(60),
                ..Self::default_governor()
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            fixture_path: None,
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.governor.window_length_ms, 900_000);
        assert_eq!(config.governor.max_attempts, 10);
        assert_eq!(config.governor.key_strategy, KeyStrategy::Peer);
        assert!(!config.server.trust_forwarded_for);
        assert!(config.governor.sweep_interval_secs.is_none());
        assert!(!config.security.jwt_secret.is_empty());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.server.trust_forwarded_for);
        assert!(config.security.jwt_secret.is_empty());
        assert_eq!(config.governor.sweep_interval_secs, Some(60));
        assert_eq!(config.governor.max_attempts, 10);
    }

    #[test]
    fn test_governor_settings_convert() {
        let settings = AppConfig::development().governor;
        let config = settings.governor_config().unwrap();
        assert_eq!(config.max_attempts(), 10);

        let broken = GovernorSettings {
            max_attempts: 0,
            ..settings
        };
        assert!(broken.governor_config().is_err());
    }

    #[test]
    fn test_validate_requires_jwt_secret() {
        assert_eq!(AppConfig::development().validate(), Ok(()));
        assert_eq!(AppConfig::production().validate(), Err(ConfigError::MissingJwtSecret));

        let mut config = AppConfig::development();
        config.governor.window_length_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Governor(_))));
    }

    #[test]
    fn test_validate_bounds_jwt_expiry() {
        let mut config = AppConfig::development();
        config.security.jwt_expiry_hours = u64::MAX / 2;
        assert!(matches!(config.validate(), Err(ConfigError::JwtExpiry { .. })));

        config.security.jwt_expiry_hours = 0;
        assert!(matches!(config.validate(), Err(ConfigError::JwtExpiry { .. })));

        config.security.jwt_expiry_hours = MAX_JWT_EXPIRY_HOURS;
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_key_strategy_parses_aliases() {
        assert_eq!("ip".parse::<KeyStrategy>(), Ok(KeyStrategy::Peer));
        assert_eq!("Account".parse::<KeyStrategy>(), Ok(KeyStrategy::Account));
        assert!("cookie".parse::<KeyStrategy>().is_err());
    }

    #[test]
    fn test_serialized_config_omits_secrets() {
        let mut config = AppConfig::development();
        config.database.url = Some("postgres://u:p@localhost/caregate".to_string());
        let value = serde_json::to_value(&config).unwrap();
        assert!(value["security"].get("jwt_secret").is_none());
        assert!(value["database"].get("url").is_none());
    }
}
