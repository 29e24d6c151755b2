//! Relying-party side of the OAuth2 authorization code flow with PKCE

pub mod ports;
pub mod service;
