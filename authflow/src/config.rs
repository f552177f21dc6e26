use std::time::Duration;

use authflow_core::token_store::DEFAULT_TOKEN_KEY;
use serde::{Deserialize, Serialize};

use crate::AuthflowError;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_TOKEN_DB: &str = "sqlite://authflow.db?mode=rwc";

/// Settings for the default HTTP + SQLite wiring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthflowConfig {
    /// Base URL of the identity service, without a trailing slash
    pub api_url: String,
    /// SQLite connection URL for the token database
    pub token_db: String,
    /// Slot name the session token is stored under
    pub token_key: String,
    /// Request timeout for identity service calls
    pub http_timeout_secs: Option<u64>,
}

impl Default for AuthflowConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token_db: DEFAULT_TOKEN_DB.to_string(),
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            http_timeout_secs: None,
        }
    }
}

impl AuthflowConfig {
    /// Read the configuration from `AUTHFLOW_*` environment variables
    ///
    /// Unset variables fall back to the defaults.
    pub fn from_env() -> Result<Self, AuthflowError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AuthflowError> {
        let http_timeout_secs = match lookup("AUTHFLOW_HTTP_TIMEOUT_SECS") {
            Some(secs) => Some(secs.trim().parse().map_err(|_| {
                AuthflowError::Config(format!("AUTHFLOW_HTTP_TIMEOUT_SECS is not a number: {secs}"))
            })?),
            None => None,
        };

        Ok(Self {
            api_url: lookup("AUTHFLOW_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            token_db: lookup("AUTHFLOW_TOKEN_DB").unwrap_or_else(|| DEFAULT_TOKEN_DB.to_string()),
            token_key: lookup("AUTHFLOW_TOKEN_KEY")
                .unwrap_or_else(|| DEFAULT_TOKEN_KEY.to_string()),
            http_timeout_secs,
        })
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(Duration::from_secs)
    }
}
