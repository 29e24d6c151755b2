//! PKCE (Proof Key for Code Exchange) implementation for OAuth 2.0
//!
//! Implements the `S256` method of RFC 7636. The plain method is never
//! emitted: a broker that stores the verifier server-side has no reason to
//! downgrade.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Number of random bytes behind every code verifier (encodes to 43 chars).
pub const VERIFIER_ENTROPY_BYTES: usize = 32;

/// Generate a cryptographically secure code verifier
///
/// Returns a URL-safe base64-encoded random string of 32 bytes (43
/// characters). Per RFC 7636, verifiers must be 43-128 characters long.
///
/// # Panics
/// Panics if the operating system entropy source is unavailable. That is a
/// process-level fault, not something a single login attempt can recover from.
#[must_use]
pub fn generate_code_verifier() -> String {
    let mut random_bytes = [0u8; VERIFIER_ENTROPY_BYTES];
    OsRng.fill_bytes(&mut random_bytes);
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Generate code challenge from verifier using SHA256
///
/// Per RFC 7636, the challenge is BASE64URL(SHA256(ASCII(code_verifier))).
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Check that `challenge` is the `S256` transform of `verifier`
#[must_use]
pub fn verify_challenge(verifier: &str, challenge: &str) -> bool {
    let expected = generate_code_challenge(verifier);
    expected.as_bytes().ct_eq(challenge.as_bytes()).into()
}

/// Validate that the state token matches
///
/// The comparison runs in constant time with respect to the contents so the
/// callback endpoint cannot be used as a timing oracle for live session ids.
///
/// # Arguments
/// * `expected` - The value the caller holds independently (session cookie)
/// * `actual` - The state received in the callback
#[must_use]
pub fn validate_state(expected: &str, actual: &str) -> bool {
    expected.as_bytes().ct_eq(actual.as_bytes()).into()
}

/// Code challenge method sent alongside the challenge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChallengeMethod {
    /// SHA-256 based PKCE (RFC 7636 `S256`)
    #[default]
    S256,
}

impl ChallengeMethod {
    /// RFC 7636 identifier for the method
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::S256 => "S256",
        }
    }
}

impl fmt::Display for ChallengeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// PKCE challenge pair for one login attempt
///
/// Contains the code verifier (sent during token exchange) and the code
/// challenge (sent during the authorization request). Immutable once
/// generated; the session store owns it until the callback consumes it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkceChallenge {
    /// Random string (43 chars, base64url encoded)
    /// Kept secret until token exchange
    pub verifier: String,

    /// SHA256 hash of `verifier` (base64url encoded)
    pub challenge: String,

    /// Always `S256`
    pub method: ChallengeMethod,
}

impl PkceChallenge {
    /// Generate a new PKCE challenge from the OS random source
    ///
    /// # Examples
    /// ```
    /// use authbroker_common::auth::pkce::PkceChallenge;
    ///
    /// let challenge = PkceChallenge::generate();
    /// assert_eq!(challenge.verifier.len(), 43);
    /// assert!(!challenge.challenge.contains('='));
    /// ```
    #[must_use]
    pub fn generate() -> Self {
        Self::from_verifier(generate_code_verifier())
    }

    /// Derive the challenge for an existing verifier
    #[must_use]
    pub fn from_verifier(verifier: String) -> Self {
        let challenge = generate_code_challenge(&verifier);
        Self { verifier, challenge, method: ChallengeMethod::S256 }
    }

    /// Whether `challenge` still matches `verifier`
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        verify_challenge(&self.verifier, &self.challenge)
    }
}

// The verifier is a secret; keep it out of logs and panic messages.
impl fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("verifier", &"<redacted>")
            .field("challenge", &self.challenge)
            .field("method", &self.method)
            .finish()
    }
}
