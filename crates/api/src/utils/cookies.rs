//! Session binding cookie
//!
//! The cookie value is the login attempt's session id. It is the only
//! thing tying a provider callback to the browser that started the login.

use std::time::Duration;

use authbroker_domain::CookieConfig;
use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};

use crate::error::ApiError;

/// Cookie attributes resolved from configuration
#[derive(Debug, Clone)]
pub struct SessionCookie {
    name: String,
    secure: bool,
    http_only: bool,
    same_site: String,
}

impl SessionCookie {
    pub fn new(config: &CookieConfig) -> Self {
        Self {
            name: config.name.clone(),
            secure: config.secure,
            http_only: config.http_only,
            same_site: config.same_site.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `Set-Cookie` value binding `session_id` for `max_age`
    ///
    /// # Errors
    /// Returns an internal error if the value is not a valid header.
    pub fn issue(&self, session_id: &str, max_age: Duration) -> Result<HeaderValue, ApiError> {
        self.render(session_id, max_age.as_secs())
    }

    /// `Set-Cookie` value that removes the binding
    ///
    /// # Errors
    /// Returns an internal error if the value is not a valid header.
    pub fn clear(&self) -> Result<HeaderValue, ApiError> {
        self.render("", 0)
    }

    fn render(&self, value: &str, max_age_secs: u64) -> Result<HeaderValue, ApiError> {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; SameSite={}",
            self.name, value, max_age_secs, self.same_site
        );
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).map_err(|e| {
            ApiError::Broker(authbroker_domain::BrokerError::Internal(format!(
                "invalid cookie header: {e}"
            )))
        })
    }

    /// Value of the binding cookie in the request, if present and non-empty
    pub fn read(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|raw| raw.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.name)
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}
