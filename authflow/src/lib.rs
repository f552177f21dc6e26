//! # Authflow
//!
//! Authflow is the client side of an account system: it runs the login and registration
//! forms, validates what the user typed, talks to the identity service and keeps the
//! resulting session token on disk so the user stays signed in across restarts.
//!
//! The UI layer drives a [`LoginFlow`] or [`RegistrationFlow`] with plain calls
//! (`set_field`, `on_field_focus`, `on_field_blur`, `submit`) and renders the
//! [`FormSnapshot`] it publishes. Everything else, from the advisory email check to persisting
//! the token, happens inside the flow.
//!
//! ## Backends
//!
//! | Concern          | Default                     | Feature  |
//! |------------------|-----------------------------|----------|
//! | Identity service | [`HttpIdentityService`]     | `http`   |
//! | Token storage    | [`SqliteStorageProvider`]   | `sqlite` |
//!
//! Any [`IdentityService`] and [`StorageProvider`] can be plugged in with
//! [`Authflow::with_parts`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use authflow::{Authflow, Field};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let authflow = Authflow::from_env()?;
//!
//!     let login = authflow.login_flow();
//!     login.set_field(Field::Email, "user@test.com").await?;
//!     login.set_field(Field::Password, "pw12345").await?;
//!
//!     let resolution = login.submit().await?;
//!     println!("Signed in: {}", resolution.is_success());
//!     Ok(())
//! }
//! ```
use std::sync::Arc;

pub mod config;

pub use config::AuthflowConfig;

/// Re-export core types from authflow_core
pub use authflow_core::{
    AuthEvent, AuthResponse, Error, EventBus, EventHandler, Field, FieldErrors, FormKind,
    FormPhase, FormSnapshot, IdentityService, LoginFlow, LoginRequest, RegisterRequest,
    RegistrationFlow, Resolution, Session, SessionToken, StorageProvider, TokenStorage,
    TokenStore, UserProfile,
    error::{EventError, ServiceError, StateError, StorageError, ValidationError},
    flow::{EMAIL_IN_USE, SESSION_NOT_SAVED},
    storage::{MemoryStorage, MemoryStorageProvider},
};

#[cfg(feature = "sqlite")]
pub use authflow_storage_sqlite::{SqliteStorage, SqliteStorageProvider};

#[cfg(feature = "http")]
pub use authflow_http::HttpIdentityService;

/// Errors that can occur when setting up or using Authflow.
#[derive(Debug, thiserror::Error)]
pub enum AuthflowError {
    /// The configuration could not be read
    #[error("Configuration error: {0}")]
    Config(String),
    /// The identity service transport could not be built
    #[error("Transport error: {0}")]
    Transport(String),
    #[error(transparent)]
    Core(#[from] Error),
}

/// Wires an identity service, a token store and an event bus together and hands out forms.
///
/// Every flow created by one `Authflow` shares its token store, so a login on one form is
/// visible through [`Authflow::current_token`] immediately.
pub struct Authflow<S: IdentityService, P: StorageProvider> {
    service: Arc<S>,
    tokens: Arc<TokenStore<P>>,
    events: EventBus,
}

impl<S: IdentityService, P: StorageProvider> Authflow<S, P> {
    /// Create an instance storing the token under the default slot
    pub fn new(service: S, provider: P) -> Self {
        Self::with_parts(
            Arc::new(service),
            Arc::new(TokenStore::new(provider)),
            EventBus::new(),
        )
    }

    pub fn with_parts(service: Arc<S>, tokens: Arc<TokenStore<P>>, events: EventBus) -> Self {
        Self {
            service,
            tokens,
            events,
        }
    }

    /// A fresh login form
    pub fn login_flow(&self) -> LoginFlow<S, P> {
        LoginFlow::new(
            self.service.clone(),
            self.tokens.clone(),
            self.events.clone(),
        )
    }

    /// A fresh registration form
    pub fn registration_flow(&self) -> RegistrationFlow<S, P> {
        RegistrationFlow::new(
            self.service.clone(),
            self.tokens.clone(),
            self.events.clone(),
        )
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    pub fn tokens(&self) -> &Arc<TokenStore<P>> {
        &self.tokens
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Register a handler for [`AuthEvent`]s emitted by every flow of this instance
    pub async fn on_event(&self, handler: Arc<dyn EventHandler>) {
        self.events.register(handler).await;
    }

    /// The persisted session token, if the user is signed in
    pub async fn current_token(&self) -> Result<Option<SessionToken>, AuthflowError> {
        Ok(self.tokens.get().await?.map(SessionToken::from))
    }

    pub async fn is_authenticated(&self) -> Result<bool, AuthflowError> {
        Ok(self.tokens.is_authenticated().await?)
    }
}

#[cfg(all(feature = "sqlite", feature = "http"))]
impl Authflow<HttpIdentityService, SqliteStorageProvider> {
    /// Build the default HTTP + SQLite wiring
    ///
    /// Nothing is opened here; the token database is opened on first token access.
    pub fn from_config(config: &AuthflowConfig) -> Result<Self, AuthflowError> {
        tracing::debug!(api_url = %config.api_url, "Configuring authflow");

        let service = match config.http_timeout() {
            Some(timeout) => HttpIdentityService::with_timeout(&config.api_url, timeout)
                .map_err(|e| AuthflowError::Transport(e.to_string()))?,
            None => HttpIdentityService::new(&config.api_url),
        };
        let tokens = TokenStore::with_key(
            SqliteStorageProvider::new(&config.token_db),
            &config.token_key,
        );

        Ok(Self::with_parts(
            Arc::new(service),
            Arc::new(tokens),
            EventBus::new(),
        ))
    }

    /// Build the default wiring from `AUTHFLOW_*` environment variables
    pub fn from_env() -> Result<Self, AuthflowError> {
        Self::from_config(&AuthflowConfig::from_env()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(all(feature = "sqlite", feature = "http"))]
    #[tokio::test]
    async fn test_from_config_is_lazy() {
        let dir = tempfile::tempdir().unwrap();
        let config = AuthflowConfig {
            token_db: format!("sqlite://{}", dir.path().join("tokens.db").display()),
            token_key: "session".to_string(),
            http_timeout_secs: Some(5),
            ..Default::default()
        };

        let authflow = Authflow::from_config(&config).unwrap();
        assert!(!authflow.tokens().is_initialized());
        assert_eq!(authflow.tokens().key(), "session");

        assert!(!authflow.is_authenticated().await.unwrap());
        assert!(authflow.tokens().is_initialized());
    }

    #[tokio::test]
    async fn test_current_token_reads_shared_store() {
        let storage = MemoryStorage::new();
        storage.store("TOKEN_VALUE", "tok-1").await.unwrap();
        let service = offline::NoService;

        let authflow = Authflow::new(service, MemoryStorageProvider::new(storage));

        assert_eq!(
            authflow.current_token().await.unwrap().map(SessionToken::into_inner),
            Some("tok-1".to_string())
        );
    }

    mod offline {
        use super::super::*;
        use async_trait::async_trait;

        /// Fails every call; enough for tests that never reach the network
        pub struct NoService;

        #[async_trait]
        impl IdentityService for NoService {
            async fn check_email_unique(&self, _email: &str) -> Result<bool, ServiceError> {
                Err(ServiceError::Transport("offline".to_string()))
            }

            async fn register(
                &self,
                _request: &RegisterRequest,
            ) -> Result<AuthResponse, ServiceError> {
                Err(ServiceError::Transport("offline".to_string()))
            }

            async fn login(&self, _request: &LoginRequest) -> Result<AuthResponse, ServiceError> {
                Err(ServiceError::Transport("offline".to_string()))
            }
        }
    }
}
