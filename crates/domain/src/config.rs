//! Broker configuration structures
//!
//! Plain serde structs. Loading (environment, TOML/JSON files) lives in the
//! infra crate; this module only defines shape, defaults and validation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AUTHORIZE_PATH, DEFAULT_CLEANUP_INTERVAL_SECS, DEFAULT_COOKIE_NAME,
    DEFAULT_EXCHANGE_TIMEOUT_SECS, DEFAULT_JWT_LEEWAY_SECS, DEFAULT_PROVIDER_NAME, DEFAULT_SCOPE,
    DEFAULT_SESSION_TTL_SECS, DEFAULT_TOKEN_PATH,
};
use crate::errors::{BrokerError, Result};
use crate::impl_domain_status_conversions;

/// Top-level broker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub identity_provider: IdentityProviderConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub cookie: CookieConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BrokerConfig {
    /// Reject configurations the broker cannot run with
    ///
    /// # Errors
    /// Returns [`BrokerError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.session.ttl_secs == 0 {
            return Err(config_error("session.ttl_secs must be greater than zero"));
        }
        if self.session.cleanup_interval_secs == 0 {
            return Err(config_error("session.cleanup_interval_secs must be greater than zero"));
        }
        if self.store.backend == StoreBackend::Sqlite && self.store.sqlite_path.is_none() {
            return Err(config_error("store.sqlite_path is required for the sqlite backend"));
        }
        if self.store.pool_size == 0 {
            return Err(config_error("store.pool_size must be greater than zero"));
        }
        if self.cookie.name.trim().is_empty() {
            return Err(config_error("cookie.name must not be empty"));
        }
        self.identity_provider.validate()
    }
}

fn config_error(message: &str) -> BrokerError {
    BrokerError::Config(message.to_string())
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Origins allowed to call the API with credentials. Empty disables CORS.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: default_bind_address(), allowed_origins: Vec::new() }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

/// Registration of this broker with the OAuth2 identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityProviderConfig {
    /// Label reported in audit events
    #[serde(default = "default_provider_name")]
    pub name: String,
    /// Provider origin, e.g. `https://auth.example.com`
    pub base_url: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// Absolute authorization endpoint; defaults to `base_url` + Casdoor path
    #[serde(default)]
    pub authorization_endpoint: Option<String>,
    /// Absolute token endpoint; defaults to `base_url` + Casdoor path
    #[serde(default)]
    pub token_endpoint: Option<String>,
    #[serde(default = "default_exchange_timeout_secs")]
    pub exchange_timeout_secs: u64,
    #[serde(default)]
    pub token: TokenVerificationConfig,
}

impl IdentityProviderConfig {
    /// Resolved authorization endpoint
    #[must_use]
    pub fn authorization_url(&self) -> String {
        self.authorization_endpoint
            .clone()
            .unwrap_or_else(|| join_url(&self.base_url, DEFAULT_AUTHORIZE_PATH))
    }

    /// Resolved token endpoint
    #[must_use]
    pub fn token_url(&self) -> String {
        self.token_endpoint.clone().unwrap_or_else(|| join_url(&self.base_url, DEFAULT_TOKEN_PATH))
    }

    #[must_use]
    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_secs(self.exchange_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty()
            && (self.authorization_endpoint.is_none() || self.token_endpoint.is_none())
        {
            return Err(config_error(
                "identity_provider.base_url is required unless both endpoints are set",
            ));
        }
        if self.client_id.trim().is_empty() {
            return Err(config_error("identity_provider.client_id must not be empty"));
        }
        if self.redirect_uri.trim().is_empty() {
            return Err(config_error("identity_provider.redirect_uri must not be empty"));
        }
        if self.exchange_timeout_secs == 0 {
            return Err(config_error(
                "identity_provider.exchange_timeout_secs must be greater than zero",
            ));
        }
        self.token.validate()
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

fn default_provider_name() -> String {
    DEFAULT_PROVIDER_NAME.to_string()
}

fn default_scopes() -> Vec<String> {
    vec![DEFAULT_SCOPE.to_string()]
}

fn default_exchange_timeout_secs() -> u64 {
    DEFAULT_EXCHANGE_TIMEOUT_SECS
}

/// How access tokens issued by the provider are verified
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenVerificationConfig {
    /// JWS algorithm name: `RS256`, `RS384`, `RS512`, `HS256`, `HS384`, `HS512`
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Inline PEM public key (the provider's certificate public key)
    #[serde(default)]
    pub public_key_pem: Option<String>,
    #[serde(default)]
    pub public_key_path: Option<String>,
    /// Shared secret for HMAC algorithms
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default = "default_leeway_secs")]
    pub leeway_secs: u64,
}

impl Default for TokenVerificationConfig {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            public_key_pem: None,
            public_key_path: None,
            secret: None,
            issuer: None,
            audience: None,
            leeway_secs: default_leeway_secs(),
        }
    }
}

impl TokenVerificationConfig {
    /// Whether the configured algorithm is an HMAC family one
    #[must_use]
    pub fn is_hmac(&self) -> bool {
        self.algorithm.to_ascii_uppercase().starts_with("HS")
    }

    fn validate(&self) -> Result<()> {
        let algorithm = self.algorithm.to_ascii_uppercase();
        if !matches!(
            algorithm.as_str(),
            "RS256" | "RS384" | "RS512" | "HS256" | "HS384" | "HS512"
        ) {
            return Err(BrokerError::Config(format!(
                "identity_provider.token.algorithm not supported: {}",
                self.algorithm
            )));
        }
        if self.is_hmac() {
            if self.secret.as_deref().map_or(true, str::is_empty) {
                return Err(config_error("identity_provider.token.secret is required for HS*"));
            }
        } else if self.public_key_pem.is_none() && self.public_key_path.is_none() {
            return Err(config_error(
                "identity_provider.token.public_key_pem or public_key_path is required for RS*",
            ));
        }
        Ok(())
    }
}

fn default_algorithm() -> String {
    "RS256".to_string()
}

fn default_leeway_secs() -> u64 {
    DEFAULT_JWT_LEEWAY_SECS
}

/// Authorization session lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Period of the expired-entry sweep
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl SessionConfig {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    #[must_use]
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_cleanup_interval_secs() -> u64 {
    DEFAULT_CLEANUP_INTERVAL_SECS
}

/// Session store backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local map; single instance deployments and tests
    #[default]
    Memory,
    /// SQLite file shared by every broker instance on the host
    Sqlite,
}

impl_domain_status_conversions!(StoreBackend {
    Memory => "memory",
    Sqlite => "sqlite",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub sqlite_path: Option<String>,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { backend: StoreBackend::Memory, sqlite_path: None, pool_size: default_pool_size() }
    }
}

fn default_pool_size() -> u32 {
    4
}

/// Attributes of the browser cookie that binds a login attempt to a browser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieConfig {
    #[serde(default = "default_cookie_name")]
    pub name: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default = "default_same_site")]
    pub same_site: String,
    #[serde(default = "default_http_only")]
    pub http_only: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: default_cookie_name(),
            secure: false,
            same_site: default_same_site(),
            http_only: default_http_only(),
        }
    }
}

fn default_cookie_name() -> String {
    DEFAULT_COOKIE_NAME.to_string()
}

fn default_same_site() -> String {
    "Strict".to_string()
}

fn default_http_only() -> bool {
    true
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl_domain_status_conversions!(LogFormat {
    Pretty => "pretty",
    Json => "json",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive; `RUST_LOG` wins when set
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: LogFormat::Pretty }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
