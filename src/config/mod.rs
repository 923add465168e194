use std::env;
use std::fmt;

use jsonwebtoken::Algorithm;
use thiserror::Error;
use url::Url;

use crate::flags::LogLevel;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("Unsupported JWT algorithm {0}; expected one of HS256, HS384, HS512")]
    UnsupportedAlgorithm(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub log_level: LogLevel,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub flags: FlagsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub request_timeout_secs: u64,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Clone)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_algorithm: Algorithm,
    pub admin_role: String,
    pub jwt_expiry_hours: u64,
}

// Keep the shared secret out of logs and panic messages.
impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("admin_role", &self.admin_role)
            .field("jwt_expiry_hours", &self.jwt_expiry_hours)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct FlagsConfig {
    /// Remote flag endpoint. Without one the service runs on defaults.
    pub url: Option<Url>,
    pub poll_interval_secs: u64,
    pub timeout_secs: u64,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;
        Url::parse(&database_url).map_err(|_| ConfigError::Invalid {
            key: "DATABASE_URL",
            value: "<unparseable url>".to_string(),
        })?;

        let security = SecurityConfig::from_lookup(&lookup)?;

        // Set defaults based on environment, then override with specific env vars
        let mut config = match environment {
            Environment::Production => Self::production(database_url, security),
            Environment::Staging => Self::staging(database_url, security),
            Environment::Development => Self::development(database_url, security),
        };
        config.apply_overrides(&lookup)?;
        Ok(config)
    }

    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = lookup("LOG_LEVEL") {
            self.log_level = v.parse().map_err(|_| ConfigError::Invalid { key: "LOG_LEVEL", value: v })?;
        }

        // Server overrides
        if let Some(v) = lookup("CATALOG_API_PORT").or_else(|| lookup("PORT")) {
            self.server.port = parse_value("PORT", v)?;
        }
        if let Some(v) = lookup("REQUEST_TIMEOUT_SECS") {
            self.server.request_timeout_secs = parse_value("REQUEST_TIMEOUT_SECS", v)?;
        }
        if let Some(v) = lookup("SECURITY_CORS_ORIGINS") {
            self.server.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Database overrides
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_value("DATABASE_MAX_CONNECTIONS", v)?;
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = parse_value("DATABASE_CONNECTION_TIMEOUT", v)?;
        }

        // Flag source overrides
        if let Some(v) = lookup("FLAGS_URL").filter(|v| !v.trim().is_empty()) {
            let url = Url::parse(&v).map_err(|_| ConfigError::Invalid { key: "FLAGS_URL", value: v })?;
            self.flags.url = Some(url);
        }
        if let Some(v) = lookup("FLAGS_POLL_INTERVAL_SECS") {
            self.flags.poll_interval_secs = parse_value("FLAGS_POLL_INTERVAL_SECS", v)?;
        }
        if let Some(v) = lookup("FLAGS_TIMEOUT_SECS") {
            self.flags.timeout_secs = parse_value("FLAGS_TIMEOUT_SECS", v)?;
        }

        Ok(())
    }

    fn development(database_url: String, security: SecurityConfig) -> Self {
        Self {
            environment: Environment::Development,
            log_level: LogLevel::Debug,
            server: ServerConfig {
                port: 8080,
                request_timeout_secs: 30,
                cors_origins: vec!["*".to_string()],
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: 10,
                connection_timeout: 30,
            },
            security,
            flags: FlagsConfig {
                url: None,
                poll_interval_secs: 5,
                timeout_secs: 20,
            },
        }
    }

    fn staging(database_url: String, security: SecurityConfig) -> Self {
        Self {
            environment: Environment::Staging,
            log_level: LogLevel::Info,
            server: ServerConfig {
                port: 8080,
                request_timeout_secs: 15,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: 20,
                connection_timeout: 10,
            },
            security,
            flags: FlagsConfig {
                url: None,
                poll_interval_secs: 5,
                timeout_secs: 10,
            },
        }
    }

    fn production(database_url: String, security: SecurityConfig) -> Self {
        Self {
            environment: Environment::Production,
            log_level: LogLevel::Info,
            server: ServerConfig {
                port: 8080,
                request_timeout_secs: 10,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: 50,
                connection_timeout: 5,
            },
            security,
            flags: FlagsConfig {
                url: None,
                poll_interval_secs: 5,
                timeout_secs: 5,
            },
        }
    }
}

impl SecurityConfig {
    /// Token settings only; used by tooling that has no database.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let jwt_algorithm = match lookup("JWT_ALGORITHM") {
            Some(v) => parse_hmac_algorithm(&v)?,
            None => Algorithm::HS256,
        };

        let admin_role = lookup("ADMIN_ROLE")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "admin".to_string());

        let jwt_expiry_hours = match lookup("JWT_EXPIRY_HOURS") {
            Some(v) => parse_value("JWT_EXPIRY_HOURS", v)?,
            None => 1,
        };

        Ok(Self {
            jwt_secret,
            jwt_algorithm,
            admin_role,
            jwt_expiry_hours,
        })
    }
}

/// Only the HMAC family is accepted; anything else would let a token pick its own key type.
pub fn parse_hmac_algorithm(value: &str) -> Result<Algorithm, ConfigError> {
    match value.trim().to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        _ => Err(ConfigError::UnsupportedAlgorithm(value.to_string())),
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid { key, value })
}
