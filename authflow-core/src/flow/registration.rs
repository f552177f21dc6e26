use std::sync::Arc;

use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;

use super::{EMAIL_IN_USE, FlowCore, FormPhase, FormSnapshot, Resolution};
use crate::{
    Error,
    events::{AuthEvent, EventBus},
    form::{Field, FormKind},
    identity::{IdentityService, RegisterRequest},
    storage::StorageProvider,
    token_store::TokenStore,
    validation::{
        RegistrationForm, passwords_confirmed, validate_confirm_password, validate_email,
        validate_full_name, validate_password, validate_passwords_match,
    },
};

/// Coordinates the registration form
///
/// Besides the local rules, leaving the email field runs an advisory uniqueness check in the
/// background. Its answer is applied only if the email on the form has not changed since the
/// check started, and it never blocks [`RegistrationFlow::submit`].
pub struct RegistrationFlow<S: IdentityService, P: StorageProvider> {
    inner: Arc<RegistrationInner<S, P>>,
}

struct RegistrationInner<S: IdentityService, P: StorageProvider> {
    core: FlowCore<S, P>,
    values: RwLock<RegistrationForm>,
}

impl<S: IdentityService, P: StorageProvider> Clone for RegistrationFlow<S, P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: IdentityService, P: StorageProvider> RegistrationFlow<S, P> {
    pub fn new(service: Arc<S>, tokens: Arc<TokenStore<P>>, events: EventBus) -> Self {
        Self {
            inner: Arc::new(RegistrationInner {
                core: FlowCore::new(FormKind::Registration, service, tokens, events),
                values: RwLock::new(RegistrationForm::default()),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FormSnapshot> {
        self.inner.core.subscribe()
    }

    pub fn snapshot(&self) -> FormSnapshot {
        self.inner.core.snapshot()
    }

    pub async fn values(&self) -> RegistrationForm {
        self.inner.values.read().await.clone()
    }

    /// Record the current value of a field
    ///
    /// Changing the email forgets the previous uniqueness answer. Changing either password
    /// recomputes `password_confirmed` without showing any error.
    pub async fn set_field(&self, field: Field, value: impl Into<String>) -> Result<(), Error> {
        let value = value.into();
        let mut values = self.inner.values.write().await;

        if field == Field::Email && values.email != value {
            self.inner.core.state.send_if_modified(|s| {
                let mut modified = s.email_unique.take().is_some();
                if s.errors.get(Field::Email) == Some(EMAIL_IN_USE) {
                    s.errors.clear(Field::Email);
                    modified = true;
                }
                if s.phase == FormPhase::AwaitingUniqueness {
                    s.phase = FormPhase::Idle;
                    modified = true;
                }
                modified
            });
        }

        values.set(field, value);

        if matches!(field, Field::Password | Field::ConfirmPassword) {
            self.sync_confirmed(&values);
        }
        Ok(())
    }

    pub fn on_field_focus(&self, field: Field) -> Result<(), Error> {
        self.inner.core.clear_error(field);
        Ok(())
    }

    /// The user left a field: check it and show its error, if any
    ///
    /// Leaving a valid email starts the uniqueness check and returns its task handle.
    /// Callers may await it or drop it.
    pub async fn on_field_blur(&self, field: Field) -> Result<Option<JoinHandle<()>>, Error> {
        let core = &self.inner.core;
        let values = self.inner.values.read().await;

        match field {
            Field::FullName => {
                core.show_field_result(field, validate_full_name(&values.full_name));
            }
            Field::Email => {
                if core.show_field_result(field, validate_email(&values.email)) {
                    return Ok(Some(self.spawn_uniqueness_check(values.email.clone())));
                }
            }
            Field::Password => {
                if core.show_field_result(field, validate_password(&values.password))
                    && !values.confirm_password.is_empty()
                    && self.check_pair(&values)
                {
                    core.clear_error(Field::ConfirmPassword);
                }
                self.sync_confirmed(&values);
            }
            Field::ConfirmPassword => {
                if core.show_field_result(Field::Password, validate_password(&values.password))
                    && self.check_pair(&values)
                {
                    core.clear_error(Field::Password);
                }
                self.sync_confirmed(&values);
            }
        }

        Ok(None)
    }

    /// Show the confirmation's own rule, then the match rule, on `ConfirmPassword`
    fn check_pair(&self, values: &RegistrationForm) -> bool {
        let core = &self.inner.core;
        core.show_field_result(
            Field::ConfirmPassword,
            validate_confirm_password(&values.confirm_password),
        ) && core.show_field_result(
            Field::ConfirmPassword,
            validate_passwords_match(&values.password, &values.confirm_password),
        )
    }

    fn sync_confirmed(&self, values: &RegistrationForm) {
        let confirmed = passwords_confirmed(&values.password, &values.confirm_password);
        self.inner.core.state.send_if_modified(|s| {
            let modified = s.password_confirmed != confirmed;
            s.password_confirmed = confirmed;
            modified
        });
    }

    fn spawn_uniqueness_check(&self, email: String) -> JoinHandle<()> {
        self.inner.core.state.send_if_modified(|s| {
            let idle = s.phase == FormPhase::Idle;
            if idle {
                s.phase = FormPhase::AwaitingUniqueness;
            }
            idle
        });

        let flow = self.clone();
        tokio::spawn(async move { flow.check_uniqueness(email).await })
    }

    #[tracing::instrument(skip(self))]
    async fn check_uniqueness(&self, email: String) {
        let answer = self.inner.core.service.check_email_unique(&email).await;

        // Holding the values lock keeps set_field from changing the email mid-update
        let values = self.inner.values.read().await;
        if values.email != email {
            tracing::debug!("Discarding uniqueness answer for a stale email");
            return;
        }

        let unique = match answer {
            Ok(unique) => unique,
            Err(e) => {
                tracing::warn!(error = %e, "Email uniqueness check failed");
                self.inner.core.state.send_if_modified(|s| {
                    let waiting = s.phase == FormPhase::AwaitingUniqueness;
                    if waiting {
                        s.phase = FormPhase::Idle;
                    }
                    waiting
                });
                return;
            }
        };

        self.inner.core.state.send_modify(|s| {
            s.email_unique = Some(unique);
            if unique {
                if s.errors.get(Field::Email) == Some(EMAIL_IN_USE) {
                    s.errors.clear(Field::Email);
                }
            } else {
                s.errors.replace(Field::Email, EMAIL_IN_USE);
            }
            if s.phase == FormPhase::AwaitingUniqueness {
                s.phase = FormPhase::Idle;
            }
        });
        drop(values);

        tracing::debug!(unique, "Email uniqueness resolved");
        self.inner
            .core
            .events
            .publish(AuthEvent::EmailAvailability { email, unique })
            .await;
    }

    /// Validate the form and, when it passes, register
    ///
    /// A pending or negative uniqueness answer does not stop the request; the service is
    /// the authority on whether the email is free.
    #[tracing::instrument(name = "registration_submit", skip_all)]
    pub async fn submit(&self) -> Result<Resolution, Error> {
        let core = &self.inner.core;
        core.begin_submit()?;

        let form = self.values().await;
        if let Err(errors) = form.validate() {
            return Ok(core.fail(errors).await);
        }

        core.start_request();
        let request = RegisterRequest {
            full_name: form.full_name,
            email: form.email,
            password: form.password,
        };
        let response = core.service.register(&request).await;
        Ok(core.finish(response).await)
    }
}
