//! Caller details recorded on login events

use authbroker_domain::ClientContext;
use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;

/// Build a [`ClientContext`] from proxy and browser headers
///
/// The first `X-Forwarded-For` hop wins over `X-Real-IP`.
pub fn client_context(headers: &HeaderMap) -> ClientContext {
    let forwarded = header_str(headers, "x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());
    let ip_address = forwarded.or_else(|| header_str(headers, "x-real-ip")).map(str::to_string);

    ClientContext {
        ip_address,
        user_agent: header_str(headers, USER_AGENT.as_str()).map(str::to_string),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim).filter(|v| !v.is_empty())
}
