//! User identity extracted from a verified access token

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claims carried by a provider-issued access token
///
/// Registered claims are typed; provider-specific ones (Casdoor puts the
/// whole user record in the token) land in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserClaims {
    /// Best human-readable name: display name, then name, then subject
    #[must_use]
    pub fn username(&self) -> &str {
        self.display_name.as_deref().or(self.name.as_deref()).unwrap_or(&self.sub)
    }

    /// Role claim if the provider sends one (`role`, or first of `roles`)
    #[must_use]
    pub fn role(&self) -> Option<String> {
        match self.extra.get("role") {
            Some(Value::String(role)) => Some(role.clone()),
            _ => match self.extra.get("roles") {
                Some(Value::Array(roles)) => roles.iter().find_map(|r| match r {
                    Value::String(name) => Some(name.clone()),
                    Value::Object(obj) => {
                        obj.get("name").and_then(Value::as_str).map(str::to_string)
                    }
                    _ => None,
                }),
                _ => None,
            },
        }
    }
}
