use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Auth salt cannot be empty")]
    EmptySalt,

    #[error("Admin login cannot be empty")]
    EmptyAdminLogin,

    #[error("Store configuration error: {0}")]
    Store(#[from] store::config::ValidationError),
}

/// API service configuration
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for method requests
    #[serde(default)]
    pub listener: Listener,
    /// Token verification settings
    #[serde(default)]
    pub auth: AuthConfig,
    /// Resilient store settings
    #[serde(default)]
    pub store: store::config::Config,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.auth.validate()?;
        self.store.validate()?;
        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 8080,
        }
    }
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Salts and the administrator identity used to verify tokens
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    /// Mixed into ordinary callers' tokens
    pub salt: String,
    /// Login that is treated as the administrator
    pub admin_login: String,
    /// Mixed into the administrator's hourly token
    pub admin_salt: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            salt: "Otus".into(),
            admin_login: "admin".into(),
            admin_salt: "42".into(),
        }
    }
}

impl AuthConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.salt.is_empty() || self.admin_salt.is_empty() {
            return Err(ValidationError::EmptySalt);
        }
        if self.admin_login.is_empty() {
            return Err(ValidationError::EmptyAdminLogin);
        }
        Ok(())
    }
}
