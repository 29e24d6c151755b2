//! OAuth2 authorization-code client for the configured identity provider
//!
//! Builds the browser redirect URL and redeems authorization codes at the
//! token endpoint with the PKCE verifier. Endpoint paths default to Casdoor's
//! but any RFC 6749 provider works when both endpoints are configured.

use std::time::Duration;

use async_trait::async_trait;
use authbroker_core::{AuthorizationRequest, IdentityProvider};
use authbroker_domain::{BrokerError, IdentityProviderConfig, Result, TokenGrant, UserClaims};
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::token_verifier::JwtTokenVerifier;
use crate::errors::InfraError;

/// Token endpoint response body
///
/// Some providers answer `200 OK` with an `error` member, so every field is
/// optional and the body is inspected before it is trusted.
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<i64>,
    error: Option<String>,
    error_description: Option<String>,
}

impl TokenEndpointResponse {
    fn error_message(&self) -> Option<String> {
        let error = self.error.as_deref().filter(|error| !error.is_empty())?;
        Some(match self.error_description.as_deref().filter(|d| !d.is_empty()) {
            Some(description) => format!("{error}: {description}"),
            None => error.to_string(),
        })
    }
}

/// [`IdentityProvider`] backed by a remote OAuth2 server
pub struct OAuthIdentityProvider {
    config: IdentityProviderConfig,
    client: Client,
    verifier: JwtTokenVerifier,
}

impl OAuthIdentityProvider {
    /// Create a provider client from configuration
    ///
    /// # Errors
    /// Returns `Config` if the token verifier or HTTP client cannot be built.
    pub fn new(config: IdentityProviderConfig) -> Result<Self> {
        let verifier = JwtTokenVerifier::from_config(&config.token)?;
        Self::with_verifier(config, verifier)
    }

    /// Create a provider client with an explicit token verifier
    ///
    /// # Errors
    /// Returns `Config` if the HTTP client cannot be built.
    pub fn with_verifier(
        config: IdentityProviderConfig,
        verifier: JwtTokenVerifier,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.exchange_timeout())
            .build()
            .map_err(|e| BrokerError::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self { config, client, verifier })
    }

    #[must_use]
    pub fn config(&self) -> &IdentityProviderConfig {
        &self.config
    }

    fn exchange_timeout(&self) -> Duration {
        self.config.exchange_timeout()
    }
}

#[async_trait]
impl IdentityProvider for OAuthIdentityProvider {
    fn authorization_url(&self, request: &AuthorizationRequest) -> Result<String> {
        let endpoint = self.config.authorization_url();
        if endpoint.trim().is_empty() {
            return Err(BrokerError::Config("authorization endpoint is not configured".into()));
        }

        let params = [
            ("response_type", "code".to_string()),
            ("client_id", self.config.client_id.clone()),
            ("redirect_uri", self.config.redirect_uri.clone()),
            ("scope", self.config.scopes.join(" ")),
            ("state", request.state.clone()),
            ("code_challenge", request.code_challenge.clone()),
            ("code_challenge_method", request.code_challenge_method.to_string()),
        ];

        let query_string = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let separator = if endpoint.contains('?') { '&' } else { '?' };
        Ok(format!("{endpoint}{separator}{query_string}"))
    }

    async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<TokenGrant> {
        let mut form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("client_id", self.config.client_id.clone()),
            ("code", code.to_string()),
            ("redirect_uri", self.config.redirect_uri.clone()),
            ("code_verifier", code_verifier.to_string()),
        ];
        if let Some(secret) = &self.config.client_secret {
            form.push(("client_secret", secret.clone()));
        }

        let token_url = self.config.token_url();
        debug!(%token_url, "Exchanging authorization code");

        let response = match self.client.post(&token_url).form(&form).send().await {
            Ok(response) => response,
            Err(err) if err.is_timeout() => {
                return Err(BrokerError::ExchangeTimeout(self.exchange_timeout()));
            }
            Err(err) => return Err(InfraError::from(err).into()),
        };

        let status = response.status();
        let body: Option<TokenEndpointResponse> = match response.json().await {
            Ok(body) => Some(body),
            Err(err) if err.is_timeout() => {
                return Err(BrokerError::ExchangeTimeout(self.exchange_timeout()));
            }
            Err(_) => None,
        };

        if let Some(message) = body.as_ref().and_then(TokenEndpointResponse::error_message) {
            warn!(status = status.as_u16(), error = %message, "Token endpoint returned an error");
            return Err(BrokerError::ExchangeFailed(message));
        }
        if !status.is_success() {
            warn!(status = status.as_u16(), "Token endpoint rejected the exchange");
            return Err(BrokerError::ExchangeFailed(format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown status")
            )));
        }

        let body = body.ok_or_else(|| {
            BrokerError::ExchangeFailed("unreadable token endpoint response".into())
        })?;
        let access_token = body
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| BrokerError::ExchangeFailed("response has no access_token".into()))?;

        // Lifetimes outside chrono's range leave the expiry unknown
        let expires_at = body
            .expires_in
            .filter(|secs| *secs > 0)
            .and_then(chrono::Duration::try_seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime));
        if expires_at.is_none() && body.expires_in.is_some_and(|secs| secs > 0) {
            warn!(expires_in = body.expires_in, "Ignoring out-of-range token lifetime");
        }

        Ok(TokenGrant {
            access_token,
            refresh_token: body.refresh_token.filter(|token| !token.is_empty()),
            expires_at,
            token_type: body.token_type.unwrap_or_else(|| "Bearer".to_string()),
        })
    }

    async fn parse_access_token(&self, access_token: &str) -> Result<UserClaims> {
        self.verifier.verify(access_token)
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}
