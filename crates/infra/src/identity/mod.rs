//! Identity provider adapters

pub mod oauth_provider;
pub mod token_verifier;

pub use oauth_provider::OAuthIdentityProvider;
pub use token_verifier::JwtTokenVerifier;
