use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    Session,
    error::EventError,
    form::{FieldErrors, FormKind},
};

/// Represents events that can be emitted by the event bus
///
/// Events notify interested parties (analytics, navigation, audit logging) about the outcome
/// of the authentication forms. Every event carries the data needed to act on it.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    /// A login succeeded and its token was persisted.
    SignedIn(Session),

    /// A registration succeeded and its token was persisted.
    Registered(Session),

    /// A submission ended without a session.
    SubmissionFailed {
        /// The form that was submitted
        form: FormKind,
        /// The messages shown to the user
        errors: FieldErrors,
        /// When the submission resolved
        timestamp: DateTime<Utc>,
    },

    /// An advisory uniqueness check answered for the email currently on the form.
    EmailAvailability {
        /// The email that was checked
        email: String,
        /// Whether the email is free to register
        unique: bool,
    },
}

/// Receives [`AuthEvent`]s from an [`EventBus`]
///
/// A typical handler moves the UI to the signed-in area or feeds an analytics pipeline.
///
/// ```
/// # use authflow_core::events::{AuthEvent, EventHandler};
/// # use authflow_core::error::EventError;
/// # use async_trait::async_trait;
/// struct Navigator;
///
/// #[async_trait]
/// impl EventHandler for Navigator {
///     async fn handle_event(&self, event: &AuthEvent) -> Result<(), EventError> {
///         if let AuthEvent::SignedIn(session) | AuthEvent::Registered(session) = event {
///             println!("show home screen for {:?}", session.user.email());
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle_event(&self, event: &AuthEvent) -> Result<(), EventError>;
}

/// Event bus that can emit events and register event handlers
///
/// Handlers run in registration order. The first failing handler stops delivery and its
/// error is returned from [`EventBus::emit`].
#[derive(Clone)]
pub struct EventBus {
    handlers: Arc<RwLock<Vec<Arc<dyn EventHandler>>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register an event handler with the event bus
    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.write().await.push(handler);
    }

    /// Emit an event to all registered handlers
    pub async fn emit(&self, event: &AuthEvent) -> Result<(), EventError> {
        for handler in self.handlers.read().await.iter() {
            handler.handle_event(event).await?;
        }

        Ok(())
    }

    /// Emit an event, logging rather than returning a handler failure
    pub(crate) async fn publish(&self, event: AuthEvent) {
        if let Err(e) = self.emit(&event).await {
            tracing::warn!(error = %e, "Event handler failed");
        }
    }
}
