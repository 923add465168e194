pub mod token;

use std::collections::HashSet;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

pub use token::{generate_token, verify, TokenError, TokenVerifier};

/// Verified token payload: role set plus registered claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
}

impl Claims {
    pub fn new(sub: impl Into<String>, roles: Vec<String>, expiry_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            roles,
            sub: Some(sub.into()),
            exp: (now + Duration::hours(expiry_hours)).timestamp(),
            iat: Some(now.timestamp()),
            nbf: None,
        }
    }

    pub fn has_role(&self, required: &str) -> bool {
        has_role(&self.roles, required)
    }

    pub fn has_any_role(&self, allowed: &[&str]) -> bool {
        has_any_role(&self.roles, allowed)
    }
}

pub fn has_role(roles: &[String], required: &str) -> bool {
    roles.iter().any(|r| r == required)
}

pub fn has_any_role(roles: &[String], allowed: &[&str]) -> bool {
    let set: HashSet<&str> = roles.iter().map(String::as_str).collect();
    allowed.iter().any(|a| set.contains(a))
}
