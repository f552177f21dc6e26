use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use super::{FlowCore, FormSnapshot, Resolution};
use crate::{
    Error,
    events::EventBus,
    form::{Field, FormKind},
    identity::{IdentityService, LoginRequest},
    storage::StorageProvider,
    token_store::TokenStore,
    validation::{LoginForm, validate_email, validate_password},
};

/// Coordinates the login form
///
/// Cloning is cheap; clones drive the same form.
pub struct LoginFlow<S: IdentityService, P: StorageProvider> {
    inner: Arc<LoginInner<S, P>>,
}

struct LoginInner<S: IdentityService, P: StorageProvider> {
    core: FlowCore<S, P>,
    values: RwLock<LoginForm>,
}

impl<S: IdentityService, P: StorageProvider> Clone for LoginFlow<S, P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: IdentityService, P: StorageProvider> LoginFlow<S, P> {
    pub fn new(service: Arc<S>, tokens: Arc<TokenStore<P>>, events: EventBus) -> Self {
        Self {
            inner: Arc::new(LoginInner {
                core: FlowCore::new(FormKind::Login, service, tokens, events),
                values: RwLock::new(LoginForm::default()),
            }),
        }
    }

    /// Observe the form state
    pub fn subscribe(&self) -> watch::Receiver<FormSnapshot> {
        self.inner.core.subscribe()
    }

    pub fn snapshot(&self) -> FormSnapshot {
        self.inner.core.snapshot()
    }

    /// The values entered so far
    pub async fn values(&self) -> LoginForm {
        self.inner.values.read().await.clone()
    }

    /// Record the current value of a field
    pub async fn set_field(&self, field: Field, value: impl Into<String>) -> Result<(), Error> {
        self.inner.core.ensure_field(field)?;
        let mut values = self.inner.values.write().await;
        match field {
            Field::Email => values.email = value.into(),
            _ => values.password = value.into(),
        }
        Ok(())
    }

    /// The user entered a field: hide its error while they edit
    pub fn on_field_focus(&self, field: Field) -> Result<(), Error> {
        self.inner.core.ensure_field(field)?;
        self.inner.core.clear_error(field);
        Ok(())
    }

    /// The user left a field: check it and show its error, if any
    pub async fn on_field_blur(&self, field: Field) -> Result<bool, Error> {
        self.inner.core.ensure_field(field)?;
        let values = self.inner.values.read().await;
        let result = match field {
            Field::Email => validate_email(&values.email),
            _ => validate_password(&values.password),
        };
        Ok(self.inner.core.show_field_result(field, result))
    }

    /// Validate the form and, when it passes, log in
    ///
    /// Local failures resolve without a remote call. On success the token is persisted
    /// before the session is published.
    #[tracing::instrument(name = "login_submit", skip_all)]
    pub async fn submit(&self) -> Result<Resolution, Error> {
        let core = &self.inner.core;
        core.begin_submit()?;

        let form = self.values().await;
        if let Err(errors) = form.validate() {
            return Ok(core.fail(errors).await);
        }

        core.start_request();
        let request = LoginRequest {
            email: form.email,
            password: form.password,
        };
        let response = core.service.login(&request).await;
        Ok(core.finish(response).await)
    }
}
