//! HTTP transport for the authflow identity service
//!
//! [`HttpIdentityService`] talks JSON to three endpoints under a base URL:
//!
//! | Operation            | Endpoint                           | Success body            |
//! |----------------------|------------------------------------|-------------------------|
//! | `check_email_unique` | `POST {base}/users/validate-unique-email` | `{ "isUnique": bool }` |
//! | `register`           | `POST {base}/users/register`       | `{ "token", "user" }`   |
//! | `login`              | `POST {base}/users/login`          | `{ "token", "user" }`   |
//!
//! A 4xx answer whose body is a JSON object of messages becomes
//! [`ServiceError::Rejected`], keyed the way the server keyed it. Any other failure status is
//! [`ServiceError::Upstream`].
use std::time::Duration;

use async_trait::async_trait;
use authflow_core::{
    error::{ServiceError, ServiceFieldErrors},
    identity::{
        AuthResponse, IdentityService, LoginRequest, RegisterRequest, UniqueEmailResponse,
        ValidateEmailRequest,
    },
};
use reqwest::StatusCode;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

const VALIDATE_EMAIL_PATH: &str = "users/validate-unique-email";
const REGISTER_PATH: &str = "users/register";
const LOGIN_PATH: &str = "users/login";

/// Identity service reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpIdentityService {
    http: reqwest::Client,
    base_url: String,
}

impl HttpIdentityService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Build a client whose requests give up after `timeout`
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ServiceError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %url, error = %e, "Identity service unreachable");
                ServiceError::Transport(e.to_string())
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        tracing::debug!(url = %url, status = status.as_u16(), "Identity service answered");

        if status.is_success() {
            return serde_json::from_slice(&bytes).map_err(|e| {
                tracing::warn!(url = %url, error = %e, "Unreadable identity service response");
                ServiceError::Decode(e.to_string())
            });
        }

        Err(error_from_response(status, &bytes))
    }
}

/// Classify a failure status and its body
fn error_from_response(status: StatusCode, body: &[u8]) -> ServiceError {
    let parsed = serde_json::from_slice::<Value>(body).ok();

    if status.is_client_error() {
        if let Some(Value::Object(object)) = &parsed {
            let messages: ServiceFieldErrors = object
                .iter()
                .filter_map(|(key, value)| value.as_str().map(|m| (key.clone(), m.to_string())))
                .collect();
            if !messages.is_empty() {
                return ServiceError::Rejected(messages);
            }
        }
    }

    let message = parsed
        .as_ref()
        .and_then(|value| value.get("message"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    ServiceError::Upstream {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl IdentityService for HttpIdentityService {
    #[tracing::instrument(skip_all)]
    async fn check_email_unique(&self, email: &str) -> Result<bool, ServiceError> {
        let response: UniqueEmailResponse = self
            .post(
                VALIDATE_EMAIL_PATH,
                &ValidateEmailRequest {
                    email: email.to_string(),
                },
            )
            .await?;
        Ok(response.is_unique)
    }

    #[tracing::instrument(skip_all)]
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ServiceError> {
        self.post(REGISTER_PATH, request).await
    }

    #[tracing::instrument(skip_all)]
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ServiceError> {
        self.post(LOGIN_PATH, request).await
    }
}
