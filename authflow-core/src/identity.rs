//! Identity service contract
//!
//! This module defines the [`IdentityService`] trait, the boundary between the form flows and
//! the remote service that owns user accounts. The flows depend on this trait only; the HTTP
//! implementation lives in `authflow-http`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    Error,
    error::ServiceError,
    session::{Session, SessionToken, UserProfile},
};

/// Body of an email uniqueness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateEmailRequest {
    pub email: String,
}

/// Answer to an email uniqueness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniqueEmailResponse {
    pub is_unique: bool,
}

/// Body of a registration call.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Body of a login call.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Token and user returned by a successful login or registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(default)]
    pub user: Value,
}

impl AuthResponse {
    /// Turn the service response into a [`Session`].
    ///
    /// An empty token is treated as a malformed response.
    pub fn into_session(self) -> Result<Session, Error> {
        if self.token.is_empty() {
            return Err(ServiceError::Decode("response did not contain a token".to_string()).into());
        }

        Session::builder()
            .token(SessionToken::from(self.token))
            .user(UserProfile::new(self.user))
            .build()
    }
}

/// Remote operations offered by the identity service
///
/// Each call may suspend the caller but must not block other tasks. Implementations do not
/// retry; a failed call is reported once and the caller decides what to show.
#[async_trait]
pub trait IdentityService: Send + Sync + 'static {
    /// Ask whether an email address is still free to register
    ///
    /// # Returns
    /// `true` when no account uses the address
    async fn check_email_unique(&self, email: &str) -> Result<bool, ServiceError>;

    /// Create an account and open a session for it
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ServiceError>;

    /// Open a session for an existing account
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ServiceError>;
}

/// Implementation of IdentityService for Box<dyn IdentityService>
/// This allows for dynamic dispatch of identity services
#[async_trait]
impl IdentityService for Box<dyn IdentityService> {
    async fn check_email_unique(&self, email: &str) -> Result<bool, ServiceError> {
        (**self).check_email_unique(email).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ServiceError> {
        (**self).register(request).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ServiceError> {
        (**self).login(request).await
    }
}

#[async_trait]
impl<T: IdentityService + ?Sized> IdentityService for Arc<T> {
    async fn check_email_unique(&self, email: &str) -> Result<bool, ServiceError> {
        (**self).check_email_unique(email).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ServiceError> {
        (**self).register(request).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ServiceError> {
        (**self).login(request).await
    }
}
