//! Session management
//!
//! This module contains the session issued by the identity service after a successful login
//! or registration. The core session struct is defined as follows:
//!
//! | Field         | Type           | Description                                            |
//! | ------------- | -------------- | ------------------------------------------------------ |
//! | `token`       | `SessionToken` | The opaque token issued by the identity service.       |
//! | `user`        | `UserProfile`  | The user payload returned alongside the token.         |
//! | `received_at` | `DateTime`     | When this client received the session.                 |
//!
//! Only the token is persisted (see [`crate::token_store`]); the rest lives for the duration
//! of the flow that produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, error::ValidationError};

/// Opaque token identifying an authenticated session
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: &str) -> Self {
        SessionToken(token.to_string())
    }

    /// Get the inner token string
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Get a reference to the token string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionToken {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Keep tokens out of debug output and logs.
impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

/// The user identity returned by the identity service.
///
/// The payload is not interpreted by the workflow; accessors are provided for the fields
/// most services return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(Value);

impl UserProfile {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn email(&self) -> Option<&str> {
        self.get_str("email")
    }

    pub fn full_name(&self) -> Option<&str> {
        self.get_str("fullName")
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl From<Value> for UserProfile {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The token issued by the identity service.
    pub token: SessionToken,

    /// The user payload returned with the token.
    pub user: UserProfile,

    /// The timestamp when this client received the session.
    pub received_at: DateTime<Utc>,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }
}

#[derive(Default)]
pub struct SessionBuilder {
    token: Option<SessionToken>,
    user: Option<UserProfile>,
}

impl SessionBuilder {
    pub fn token(mut self, token: SessionToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn user(mut self, user: UserProfile) -> Self {
        self.user = Some(user);
        self
    }

    pub fn build(self) -> Result<Session, Error> {
        let token = self
            .token
            .filter(|token| !token.as_str().is_empty())
            .ok_or(ValidationError::MissingField(
                "Session token is required".to_string(),
            ))?;

        Ok(Session {
            token,
            user: self.user.unwrap_or_default(),
            received_at: Utc::now(),
        })
    }
}
