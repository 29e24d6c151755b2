//! Configuration loader
//!
//! Loads broker configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the required ones are missing, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//! 5. Validates the result before returning it
//!
//! ## Environment Variables
//! Required:
//! - `AUTHBROKER_IDP_BASE_URL`: Identity provider origin
//! - `AUTHBROKER_IDP_CLIENT_ID`: OAuth2 client id
//! - `AUTHBROKER_IDP_REDIRECT_URI`: Callback URL registered with the provider
//!
//! Optional:
//! - `AUTHBROKER_IDP_NAME`, `AUTHBROKER_IDP_CLIENT_SECRET`,
//!   `AUTHBROKER_IDP_SCOPES` (comma or space separated),
//!   `AUTHBROKER_IDP_AUTHORIZE_URL`, `AUTHBROKER_IDP_TOKEN_URL`,
//!   `AUTHBROKER_IDP_EXCHANGE_TIMEOUT_SECS`
//! - `AUTHBROKER_JWT_ALGORITHM`, `AUTHBROKER_JWT_PUBLIC_KEY`,
//!   `AUTHBROKER_JWT_PUBLIC_KEY_PATH`, `AUTHBROKER_JWT_SECRET`,
//!   `AUTHBROKER_JWT_ISSUER`, `AUTHBROKER_JWT_AUDIENCE`,
//!   `AUTHBROKER_JWT_LEEWAY_SECS`
//! - `AUTHBROKER_SESSION_TTL_SECS`, `AUTHBROKER_SESSION_CLEANUP_INTERVAL_SECS`
//! - `AUTHBROKER_STORE_BACKEND` (`memory`/`sqlite`), `AUTHBROKER_SQLITE_PATH`,
//!   `AUTHBROKER_STORE_POOL_SIZE`
//! - `AUTHBROKER_COOKIE_NAME`, `AUTHBROKER_COOKIE_SECURE`,
//!   `AUTHBROKER_COOKIE_SAME_SITE`, `AUTHBROKER_COOKIE_HTTP_ONLY`
//! - `AUTHBROKER_BIND_ADDRESS`, `AUTHBROKER_ALLOWED_ORIGINS` (comma separated)
//! - `AUTHBROKER_LOG_LEVEL`, `AUTHBROKER_LOG_FORMAT` (`pretty`/`json`)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./authbroker.{json,toml}` or `./config.{json,toml}` (current working
//!    directory)
//! 2. `../config.{json,toml}` and `../../config.{json,toml}`
//! 3. The same names relative to the executable location

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use authbroker_domain::constants::{
    DEFAULT_EXCHANGE_TIMEOUT_SECS, DEFAULT_PROVIDER_NAME, DEFAULT_SCOPE,
};
use authbroker_domain::{
    BrokerConfig, BrokerError, CookieConfig, IdentityProviderConfig, LoggingConfig, Result,
    ServerConfig, SessionConfig, StoreConfig, TokenVerificationConfig,
};

const CONFIG_FILE_NAMES: [&str; 4] =
    ["authbroker.json", "authbroker.toml", "config.json", "config.toml"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `BrokerError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The loaded configuration fails validation
pub fn load() -> Result<BrokerConfig> {
    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)?
        }
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// The three identity provider variables are required; everything else
/// falls back to the serde defaults.
///
/// # Errors
/// Returns `BrokerError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<BrokerConfig> {
    let base_url = env_var("AUTHBROKER_IDP_BASE_URL")?;
    let client_id = env_var("AUTHBROKER_IDP_CLIENT_ID")?;
    let redirect_uri = env_var("AUTHBROKER_IDP_REDIRECT_URI")?;

    let token_defaults = TokenVerificationConfig::default();
    let token = TokenVerificationConfig {
        algorithm: env_opt("AUTHBROKER_JWT_ALGORITHM").unwrap_or(token_defaults.algorithm),
        public_key_pem: env_opt("AUTHBROKER_JWT_PUBLIC_KEY"),
        public_key_path: env_opt("AUTHBROKER_JWT_PUBLIC_KEY_PATH"),
        secret: env_opt("AUTHBROKER_JWT_SECRET"),
        issuer: env_opt("AUTHBROKER_JWT_ISSUER"),
        audience: env_opt("AUTHBROKER_JWT_AUDIENCE"),
        leeway_secs: env_parse("AUTHBROKER_JWT_LEEWAY_SECS")?
            .unwrap_or(token_defaults.leeway_secs),
    };

    let mut identity_provider = IdentityProviderConfig {
        name: env_opt("AUTHBROKER_IDP_NAME").unwrap_or_else(|| DEFAULT_PROVIDER_NAME.to_string()),
        base_url,
        client_id,
        client_secret: env_opt("AUTHBROKER_IDP_CLIENT_SECRET"),
        redirect_uri,
        scopes: vec![DEFAULT_SCOPE.to_string()],
        authorization_endpoint: env_opt("AUTHBROKER_IDP_AUTHORIZE_URL"),
        token_endpoint: env_opt("AUTHBROKER_IDP_TOKEN_URL"),
        exchange_timeout_secs: env_parse("AUTHBROKER_IDP_EXCHANGE_TIMEOUT_SECS")?
            .unwrap_or(DEFAULT_EXCHANGE_TIMEOUT_SECS),
        token,
    };
    if let Some(scopes) = env_list("AUTHBROKER_IDP_SCOPES", &[',', ' ']) {
        identity_provider.scopes = scopes;
    }

    let mut session = SessionConfig::default();
    if let Some(secs) = env_parse("AUTHBROKER_SESSION_TTL_SECS")? {
        session.ttl_secs = secs;
    }
    if let Some(secs) = env_parse("AUTHBROKER_SESSION_CLEANUP_INTERVAL_SECS")? {
        session.cleanup_interval_secs = secs;
    }

    let mut store = StoreConfig::default();
    if let Some(backend) = env_parse("AUTHBROKER_STORE_BACKEND")? {
        store.backend = backend;
    }
    store.sqlite_path = env_opt("AUTHBROKER_SQLITE_PATH");
    if let Some(size) = env_parse("AUTHBROKER_STORE_POOL_SIZE")? {
        store.pool_size = size;
    }

    let cookie_defaults = CookieConfig::default();
    let cookie = CookieConfig {
        name: env_opt("AUTHBROKER_COOKIE_NAME").unwrap_or(cookie_defaults.name),
        secure: env_bool("AUTHBROKER_COOKIE_SECURE", cookie_defaults.secure),
        same_site: env_opt("AUTHBROKER_COOKIE_SAME_SITE").unwrap_or(cookie_defaults.same_site),
        http_only: env_bool("AUTHBROKER_COOKIE_HTTP_ONLY", cookie_defaults.http_only),
    };

    let mut server = ServerConfig::default();
    if let Some(bind_address) = env_opt("AUTHBROKER_BIND_ADDRESS") {
        server.bind_address = bind_address;
    }
    if let Some(origins) = env_list("AUTHBROKER_ALLOWED_ORIGINS", &[',']) {
        server.allowed_origins = origins;
    }

    let mut logging = LoggingConfig::default();
    if let Some(level) = env_opt("AUTHBROKER_LOG_LEVEL") {
        logging.level = level;
    }
    if let Some(format) = env_parse("AUTHBROKER_LOG_FORMAT")? {
        logging.format = format;
    }

    Ok(BrokerConfig { server, identity_provider, session, store, cookie, logging })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `BrokerError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<BrokerConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(BrokerError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            BrokerError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| BrokerError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `BrokerError::Config` if format is invalid or parsing fails.
pub fn parse_config(contents: &str, path: &Path) -> Result<BrokerConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| BrokerError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| BrokerError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(BrokerError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory, its two parents, and the same
/// spots relative to the executable.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots
        .iter()
        .flat_map(|root| {
            let own = CONFIG_FILE_NAMES.iter().map(move |name| root.join(name));
            let parents = ["..", "../.."].into_iter().flat_map(move |up| {
                ["config.json", "config.toml"].into_iter().map(move |name| root.join(up).join(name))
            });
            own.chain(parents)
        })
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `BrokerError::Config` if the variable is not set or empty.
fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        BrokerError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Optional environment variable; empty values count as unset
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse an optional environment variable with `FromStr`
///
/// # Errors
/// Returns `BrokerError::Config` if the variable is set but does not parse.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    env_opt(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| BrokerError::Config(format!("Invalid {key}: {e}")))
        })
        .transpose()
}

/// Split an optional environment variable into a list
fn env_list(key: &str, separators: &[char]) -> Option<Vec<String>> {
    let items: Vec<String> = env_opt(key)?
        .split(separators)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();
    (!items.is_empty()).then_some(items)
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
