//! Configuration module for the study scheduler backend.

use serde::Deserialize;
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// JWT secret for token signing
    pub jwt_secret: String,
    /// Minutes until an access token expires
    pub jwt_expiry_minutes: i64,
    /// Address to bind the server to
    pub bind_address: String,
    /// Base URL for API (used in calendar feed links)
    pub base_url: String,
    /// Default IANA timezone used when a user has not set one
    pub default_timezone: String,
    /// Seconds the public calendar feed asks clients to cache for (X-PUBLISHED-TTL)
    pub calendar_feed_ttl_seconds: u32,
    /// Assumed completion rate used by the workload analyzer when a user
    /// has no history yet (spec default: 0.65)
    pub default_completion_rate: f64,
    /// Shared admin key for observability endpoints. Empty disables admin endpoints.
    pub admin_api_key: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env_var("DATABASE_URL")?,
            jwt_secret: env_var("JWT_SECRET")?,
            jwt_expiry_minutes: env_var_or("JWT_EXPIRY_MINUTES", "10080")
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue(
                        "JWT_EXPIRY_MINUTES".to_string(),
                        "expected an integer".to_string(),
                    )
                })?,
            bind_address: env_var_or("BIND_ADDRESS", "0.0.0.0:8080"),
            base_url: env_var_or("BASE_URL", "http://localhost:8080"),
            default_timezone: env_var_or("DEFAULT_TIMEZONE", "UTC"),
            calendar_feed_ttl_seconds: env_var_or("CALENDAR_FEED_TTL_SECONDS", "3600")
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue(
                        "CALENDAR_FEED_TTL_SECONDS".to_string(),
                        "expected an integer".to_string(),
                    )
                })?,
            default_completion_rate: env_var_or("DEFAULT_COMPLETION_RATE", "0.65")
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue(
                        "DEFAULT_COMPLETION_RATE".to_string(),
                        "expected a float".to_string(),
                    )
                })?,
            admin_api_key: env_var_or("ADMIN_API_KEY", ""),
        })
    }
}

fn env_var(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

fn env_var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_or_uses_default() {
        let val = env_var_or("NON_EXISTENT_VAR_12345", "default_value");
        assert_eq!(val, "default_value");
    }

    #[test]
    fn test_env_var_missing_errors() {
        let err = env_var("NON_EXISTENT_VAR_67890").unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(_)));
    }
}
