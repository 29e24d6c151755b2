//! Local verification of provider-issued access tokens
//!
//! The provider signs its access tokens as JWTs; verifying them locally
//! avoids a userinfo round trip per request.

use std::fmt;
use std::str::FromStr;

use authbroker_domain::{BrokerError, Result, TokenVerificationConfig, UserClaims};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::errors::InfraError;

/// Verifies access token signatures and standard claims
#[derive(Clone)]
pub struct JwtTokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtTokenVerifier {
    /// Build a verifier from configuration
    ///
    /// HMAC algorithms use `secret`; RSA algorithms use `public_key_pem`,
    /// falling back to reading `public_key_path`.
    ///
    /// # Errors
    /// Returns `Config` for an unknown algorithm, missing key material or a
    /// key that does not parse.
    pub fn from_config(config: &TokenVerificationConfig) -> Result<Self> {
        let algorithm = parse_algorithm(&config.algorithm)?;

        let verifier = if config.is_hmac() {
            let secret = config
                .secret
                .as_deref()
                .filter(|secret| !secret.is_empty())
                .ok_or_else(|| BrokerError::Config("token secret is not configured".into()))?;
            Self::hmac(secret.as_bytes(), algorithm)
        } else {
            let pem = match (&config.public_key_pem, &config.public_key_path) {
                (Some(pem), _) => pem.clone(),
                (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                    BrokerError::Config(format!("cannot read token public key {path}: {e}"))
                })?,
                (None, None) => {
                    return Err(BrokerError::Config("token public key is not configured".into()))
                }
            };
            Self::rsa_pem(pem.as_bytes(), algorithm)?
        };

        let mut verifier = verifier.with_leeway(config.leeway_secs);
        if let Some(issuer) = &config.issuer {
            verifier = verifier.with_issuer(issuer);
        }
        if let Some(audience) = &config.audience {
            verifier = verifier.with_audience(audience);
        }
        Ok(verifier)
    }

    /// Verifier for a shared-secret algorithm
    pub fn hmac(secret: &[u8], algorithm: Algorithm) -> Self {
        Self::new(DecodingKey::from_secret(secret), algorithm)
    }

    /// Verifier for an RSA public key in PEM form
    ///
    /// # Errors
    /// Returns `Config` if the key does not parse.
    pub fn rsa_pem(pem: &[u8], algorithm: Algorithm) -> Result<Self> {
        let key = DecodingKey::from_rsa_pem(pem).map_err(InfraError::from)?;
        Ok(Self::new(key, algorithm))
    }

    fn new(key: DecodingKey, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_aud = false;
        Self { key, validation }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }

    #[must_use]
    pub fn with_audience(mut self, audience: &str) -> Self {
        self.validation.set_audience(&[audience]);
        self.validation.validate_aud = true;
        self
    }

    /// Clock skew tolerated on `exp`/`nbf`, in seconds
    #[must_use]
    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.validation.leeway = leeway_secs;
        self
    }

    /// Verify `token` and return its claims
    ///
    /// # Errors
    /// Returns `InvalidToken` for a malformed, expired, wrongly-signed or
    /// wrongly-issued token.
    pub fn verify(&self, token: &str) -> Result<UserClaims> {
        let data = decode::<UserClaims>(token, &self.key, &self.validation)
            .map_err(InfraError::from)?;
        Ok(data.claims)
    }
}

impl fmt::Debug for JwtTokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtTokenVerifier")
            .field("algorithms", &self.validation.algorithms)
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}

fn parse_algorithm(name: &str) -> Result<Algorithm> {
    Algorithm::from_str(&name.to_ascii_uppercase())
        .map_err(|_| BrokerError::Config(format!("unsupported token algorithm: {name}")))
}
