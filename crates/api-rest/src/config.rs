//! REST server configuration.
//!
//! Resolved once at startup from environment variables; handlers only ever see the resolved
//! [`ApiConfig`] through the application state.

use api_shared::auth::DEFAULT_TOKEN_LIFETIME_DAYS;

pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const PRODUCTION_ENVIRONMENT: &str = "production";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set")]
    MissingJwtSecret,
    #[error("JWT_EXPIRES_IN_DAYS must be a positive number of days, got {0:?}")]
    InvalidTokenLifetime(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    rest_addr: String,
    jwt_secret: String,
    token_lifetime_days: i64,
    environment: String,
}

impl ApiConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingJwtSecret`] if `jwt_secret` is blank.
    pub fn new(
        rest_addr: String,
        jwt_secret: String,
        token_lifetime_days: i64,
        environment: String,
    ) -> Result<Self, ConfigError> {
        if jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingJwtSecret);
        }
        Ok(Self {
            rest_addr,
            jwt_secret,
            token_lifetime_days,
            environment,
        })
    }

    /// Reads `SEPSHIELD_REST_ADDR`, `JWT_SECRET`, `JWT_EXPIRES_IN_DAYS` and `SEPSHIELD_ENV`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(
            rest_addr_from_env_value(std::env::var("SEPSHIELD_REST_ADDR").ok()),
            std::env::var("JWT_SECRET").unwrap_or_default(),
            token_lifetime_from_env_value(std::env::var("JWT_EXPIRES_IN_DAYS").ok())?,
            environment_from_env_value(std::env::var("SEPSHIELD_ENV").ok()),
        )
    }

    pub fn rest_addr(&self) -> &str {
        &self.rest_addr
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    pub fn token_lifetime_days(&self) -> i64 {
        self.token_lifetime_days
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Production hides internal error detail and marks the session cookie `Secure`.
    pub fn is_production(&self) -> bool {
        self.environment == PRODUCTION_ENVIRONMENT
    }
}

pub fn rest_addr_from_env_value(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_REST_ADDR.into())
}

pub fn token_lifetime_from_env_value(value: Option<String>) -> Result<i64, ConfigError> {
    let Some(raw) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
        return Ok(DEFAULT_TOKEN_LIFETIME_DAYS);
    };
    match raw.parse::<i64>() {
        Ok(days) if days > 0 => Ok(days),
        _ => Err(ConfigError::InvalidTokenLifetime(raw)),
    }
}

pub fn environment_from_env_value(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.into())
}
