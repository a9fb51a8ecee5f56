//! Credential and user types shared between the suite and fixture stores.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FixtureError, FixtureResult};

/// A user submitted once at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Login email.
    pub email: String,
    /// Plain-text password.
    pub password: String,
}

/// An opaque bearer credential issued at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// The bearer token.
    pub access_token: String,
}

/// The registration response persisted as a fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser {
    /// The bearer token.
    pub access_token: String,
    /// The user as echoed by the service.
    #[serde(default)]
    pub user: Value,
}

impl Credential {
    /// Creates a credential from a token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    /// Returns the `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Extracts a credential from a fixture value.
    ///
    /// Accepts `{"token": ..}`, `{"accessToken": ..}` (optionally with a
    /// `user`), or a bare token string. Empty tokens are rejected.
    pub fn from_fixture(name: &str, value: &Value) -> FixtureResult<Self> {
        let token = match value {
            Value::String(token) => Some(token.as_str()),
            Value::Object(map) => map
                .get("accessToken")
                .or_else(|| map.get("token"))
                .and_then(Value::as_str),
            _ => None,
        };

        match token {
            Some(token) if !token.trim().is_empty() => Ok(Self::new(token)),
            Some(_) => Err(FixtureError::EmptyCredential {
                name: name.to_string(),
            }),
            None => Err(FixtureError::InvalidShape {
                name: name.to_string(),
                message: "expected `token` or `accessToken` string".to_string(),
            }),
        }
    }
}
