//! Broker constants
//!
//! Centralized defaults. Configuration overrides most of these at runtime.

/// Key namespace for authorization session entries
pub const SESSION_KEY_PREFIX: &str = "pkce:session:";

// Session lifecycle
pub const DEFAULT_SESSION_TTL_SECS: u64 = 600;
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;

// Identity provider
pub const DEFAULT_PROVIDER_NAME: &str = "casdoor";
pub const DEFAULT_EXCHANGE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SCOPE: &str = "read";
pub const DEFAULT_AUTHORIZE_PATH: &str = "/api/login/oauth/authorize";
pub const DEFAULT_TOKEN_PATH: &str = "/api/login/oauth/access_token";
pub const DEFAULT_JWT_LEEWAY_SECS: u64 = 60;

// Cookie binding
pub const DEFAULT_COOKIE_NAME: &str = "session_id";

// Event envelope
pub const EVENT_SCHEMA_VERSION: &str = "1.0";
pub const EVENT_USER_LOGIN: &str = "auth.user.login";
pub const EVENT_USER_LOGOUT: &str = "auth.user.logout";
pub const EVENT_TOKEN_REFRESHED: &str = "auth.token.refreshed";

/// Login method reported in login events
pub const LOGIN_METHOD_OAUTH_PKCE: &str = "oauth2_pkce";
