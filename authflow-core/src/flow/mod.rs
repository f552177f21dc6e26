//! Form flows
//!
//! A flow coordinates one form instance: it holds the values typed so far, runs the local
//! rules when the user leaves a field or submits, calls the [`IdentityService`] and turns the
//! answer into what the UI shows. The UI drives a flow through plain calls
//! (`set_field`, `on_field_focus`, `on_field_blur`, `submit`) and observes it through a
//! [`FormSnapshot`] published on a `watch` channel.
//!
//! A submission moves through these phases:
//!
//! ```text
//! Idle -> Validating -> Submitting -> Resolved(Success | Failed)
//!                    \-> Resolved(Failed)            (local rules failed, no remote call)
//! ```
//!
//! On the registration form, leaving a valid email field moves an otherwise idle form to
//! `AwaitingUniqueness` until the advisory check answers. The check never gates submission.
mod login;
mod registration;

pub use login::LoginFlow;
pub use registration::RegistrationFlow;

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::watch;

use crate::{
    Error, Session,
    error::{ServiceError, StateError, ValidationError},
    events::{AuthEvent, EventBus},
    form::{Field, FieldErrors, FormKind},
    identity::{AuthResponse, IdentityService},
    storage::StorageProvider,
    token_store::TokenStore,
};

/// Shown on the email field when the advisory check reports the address as taken.
pub const EMAIL_IN_USE: &str = "Email is already in use";

/// Shown when the identity service accepted the credentials but the token could not be saved.
pub const SESSION_NOT_SAVED: &str = "Unable to save your session. Please try again.";

/// Where a form currently is in its lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub enum FormPhase {
    #[default]
    Idle,
    Validating,
    AwaitingUniqueness,
    Submitting,
    Resolved(Resolution),
}

impl FormPhase {
    fn is_busy(&self) -> bool {
        matches!(self, FormPhase::Validating | FormPhase::Submitting)
    }
}

/// Final outcome of one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Resolution {
    Success(Session),
    Failed(FieldErrors),
}

impl Resolution {
    pub fn is_success(&self) -> bool {
        matches!(self, Resolution::Success(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            Resolution::Success(session) => Some(session),
            Resolution::Failed(_) => None,
        }
    }

    pub fn errors(&self) -> Option<&FieldErrors> {
        match self {
            Resolution::Success(_) => None,
            Resolution::Failed(errors) => Some(errors),
        }
    }
}

/// Everything the UI needs to render a form.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormSnapshot {
    pub phase: FormPhase,
    /// A remote submission is in flight.
    pub loading: bool,
    pub errors: FieldErrors,
    /// Answer of the advisory uniqueness check for the email currently on the form.
    pub email_unique: Option<bool>,
    /// Password and confirmation both pass and match (registration only).
    pub password_confirmed: bool,
    /// The authenticated session once a submission succeeded.
    pub session: Option<Session>,
}

/// State and collaborators shared by both flows.
pub(crate) struct FlowCore<S: IdentityService, P: StorageProvider> {
    kind: FormKind,
    service: Arc<S>,
    tokens: Arc<TokenStore<P>>,
    events: EventBus,
    state: watch::Sender<FormSnapshot>,
}

impl<S: IdentityService, P: StorageProvider> FlowCore<S, P> {
    fn new(kind: FormKind, service: Arc<S>, tokens: Arc<TokenStore<P>>, events: EventBus) -> Self {
        let (state, _) = watch::channel(FormSnapshot::default());
        Self {
            kind,
            service,
            tokens,
            events,
            state,
        }
    }

    fn subscribe(&self) -> watch::Receiver<FormSnapshot> {
        self.state.subscribe()
    }

    fn snapshot(&self) -> FormSnapshot {
        self.state.borrow().clone()
    }

    fn ensure_field(&self, field: Field) -> Result<(), Error> {
        if self.kind.has_field(field) {
            Ok(())
        } else {
            Err(StateError::UnknownField(field.key(), self.kind.name()).into())
        }
    }

    fn clear_error(&self, field: Field) {
        self.state
            .send_if_modified(|s| s.errors.clear(field).is_some());
    }

    /// Show the outcome of a single-field rule without touching other fields.
    fn show_field_result(&self, field: Field, result: Result<(), ValidationError>) -> bool {
        match result {
            Ok(()) => true,
            Err(err) => {
                self.state
                    .send_modify(|s| s.errors.replace(field, err.message()));
                false
            }
        }
    }

    /// Claim the form for a submission, refusing if one is already running.
    fn begin_submit(&self) -> Result<(), Error> {
        let mut busy = false;
        self.state.send_if_modified(|s| {
            if s.phase.is_busy() {
                busy = true;
                return false;
            }
            s.phase = FormPhase::Validating;
            true
        });

        if busy {
            tracing::warn!(form = self.kind.name(), "Submit ignored, submission in flight");
            return Err(StateError::SubmissionInProgress.into());
        }
        tracing::debug!(form = self.kind.name(), "Validating form");
        Ok(())
    }

    fn start_request(&self) {
        tracing::debug!(form = self.kind.name(), "Submitting form");
        self.state.send_modify(|s| {
            s.phase = FormPhase::Submitting;
            s.loading = true;
            s.errors = FieldErrors::new();
            keep_uniqueness_error(s);
        });
    }

    async fn fail(&self, mut errors: FieldErrors) -> Resolution {
        self.state.send_modify(|s| {
            s.errors = errors.clone();
            keep_uniqueness_error(s);
            errors = s.errors.clone();
            s.phase = FormPhase::Resolved(Resolution::Failed(errors.clone()));
            s.loading = false;
        });

        tracing::debug!(
            form = self.kind.name(),
            errors = errors.len(),
            "Submission failed"
        );
        self.events
            .publish(AuthEvent::SubmissionFailed {
                form: self.kind,
                errors: errors.clone(),
                timestamp: Utc::now(),
            })
            .await;
        Resolution::Failed(errors)
    }

    /// Map the service answer onto the form and persist the token on success.
    async fn finish(&self, response: Result<AuthResponse, ServiceError>) -> Resolution {
        let session = match response.map_err(Error::from).and_then(AuthResponse::into_session) {
            Ok(session) => session,
            Err(Error::Service(e)) => {
                tracing::warn!(form = self.kind.name(), error = %e, "Identity service call failed");
                return self
                    .fail(FieldErrors::from_service_error(self.kind, &e))
                    .await;
            }
            Err(e) => {
                tracing::warn!(form = self.kind.name(), error = %e, "Malformed session");
                let mut errors = FieldErrors::new();
                errors.push_global(e.to_string());
                return self.fail(errors).await;
            }
        };

        if let Err(e) = self
            .tokens
            .set(Some(session.token.as_str().to_string()))
            .await
        {
            tracing::error!(form = self.kind.name(), error = %e, "Session token not persisted");
            let mut errors = FieldErrors::new();
            errors.push_global(SESSION_NOT_SAVED);
            return self.fail(errors).await;
        }

        self.state.send_modify(|s| {
            s.phase = FormPhase::Resolved(Resolution::Success(session.clone()));
            s.loading = false;
            s.errors = FieldErrors::new();
            s.session = Some(session.clone());
        });

        tracing::info!(form = self.kind.name(), "Authenticated");
        let event = match self.kind {
            FormKind::Login => AuthEvent::SignedIn(session.clone()),
            FormKind::Registration => AuthEvent::Registered(session.clone()),
        };
        self.events.publish(event).await;
        Resolution::Success(session)
    }
}

/// A taken email stays flagged until the email changes.
fn keep_uniqueness_error(s: &mut FormSnapshot) {
    if s.email_unique == Some(false) {
        s.errors.insert(Field::Email, EMAIL_IN_USE);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::error::ServiceFieldErrors;
    use crate::identity::{LoginRequest, RegisterRequest};
    use crate::storage::MemoryStorageProvider;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    pub(crate) type TestTokens = Arc<TokenStore<MemoryStorageProvider>>;

    /// Scripted identity service recording every call it receives.
    #[derive(Default)]
    pub(crate) struct MockIdentityService {
        pub login_result: Mutex<Option<Result<AuthResponse, ServiceError>>>,
        pub register_result: Mutex<Option<Result<AuthResponse, ServiceError>>>,
        pub taken_emails: Mutex<Vec<String>>,
        pub gates: Mutex<HashMap<String, Arc<Notify>>>,
        pub login_calls: Mutex<Vec<LoginRequest>>,
        pub register_calls: Mutex<Vec<RegisterRequest>>,
        pub checked_emails: Mutex<Vec<String>>,
    }

    impl MockIdentityService {
        pub fn with_login(result: Result<AuthResponse, ServiceError>) -> Self {
            let service = Self::default();
            *service.login_result.lock().unwrap() = Some(result);
            service
        }

        pub fn with_register(result: Result<AuthResponse, ServiceError>) -> Self {
            let service = Self::default();
            *service.register_result.lock().unwrap() = Some(result);
            service
        }

        pub fn take_email(&self, email: &str) {
            self.taken_emails.lock().unwrap().push(email.to_string());
        }

        /// Hold uniqueness answers for `email` until the returned handle is notified.
        pub fn gate(&self, email: &str) -> Arc<Notify> {
            let notify = Arc::new(Notify::new());
            self.gates
                .lock()
                .unwrap()
                .insert(email.to_string(), notify.clone());
            notify
        }

        pub fn login_count(&self) -> usize {
            self.login_calls.lock().unwrap().len()
        }

        pub fn register_count(&self) -> usize {
            self.register_calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl IdentityService for MockIdentityService {
        async fn check_email_unique(&self, email: &str) -> Result<bool, ServiceError> {
            self.checked_emails.lock().unwrap().push(email.to_string());
            let gate = self.gates.lock().unwrap().get(email).cloned();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            Ok(!self.taken_emails.lock().unwrap().iter().any(|e| e == email))
        }

        async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ServiceError> {
            self.register_calls.lock().unwrap().push(request.clone());
            self.register_result
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Ok(auth_response("tok-register")))
        }

        async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ServiceError> {
            self.login_calls.lock().unwrap().push(request.clone());
            self.login_result
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Ok(auth_response("tok-login")))
        }
    }

    pub(crate) fn auth_response(token: &str) -> AuthResponse {
        AuthResponse {
            token: token.to_string(),
            user: json!({"email": "user@test.com"}),
        }
    }

    pub(crate) fn rejection(entries: &[(&str, &str)]) -> ServiceError {
        ServiceError::Rejected(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<ServiceFieldErrors>(),
        )
    }

    pub(crate) fn memory_tokens() -> TestTokens {
        Arc::new(TokenStore::new(MemoryStorageProvider::default()))
    }
}
