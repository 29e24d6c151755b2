//! PKCE primitives for the relying-party side of an OAuth 2.0 login
//!
//! The broker never talks to the identity provider from here; this module only
//! produces and checks the secrets that bind an authorization code to the
//! login attempt that requested it.
//!
//! # Usage Example
//!
//! ```
//! use authbroker_common::auth::pkce::{verify_challenge, PkceChallenge};
//!
//! let pkce = PkceChallenge::generate();
//! assert_eq!(pkce.method.as_str(), "S256");
//! assert!(verify_challenge(&pkce.verifier, &pkce.challenge));
//! ```
//!
//! # Module Organization
//!
//! - **[`pkce`]**: verifier/challenge generation (RFC 7636 `S256` only) and
//!   constant-time state comparison

pub mod pkce;

// Re-export PKCE utility functions
pub use pkce::{
    generate_code_challenge, generate_code_verifier, validate_state, verify_challenge,
    ChallengeMethod, PkceChallenge,
};
