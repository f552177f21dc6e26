use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Event error: {0}")]
    Event(#[from] EventError),

    #[error("State error: {0}")]
    State(#[from] StateError),
}

/// A locally detected problem with a single field.
///
/// The payload is the user-facing message and is displayed verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0}")]
    MissingField(String),

    #[error("{0}")]
    InvalidEmail(String),

    #[error("{0}")]
    InvalidPassword(String),

    #[error("{0}")]
    PasswordMismatch(String),
}

impl ValidationError {
    /// The message shown next to the offending field.
    pub fn message(&self) -> &str {
        match self {
            ValidationError::MissingField(msg)
            | ValidationError::InvalidEmail(msg)
            | ValidationError::InvalidPassword(msg)
            | ValidationError::PasswordMismatch(msg) => msg,
        }
    }
}

/// Messages returned by the identity service, keyed by the field name it reported.
pub type ServiceFieldErrors = BTreeMap<String, String>;

/// Failure of a call to the identity service.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// The service refused the request and explained why, usually per field.
    #[error("Request rejected: {}", join_messages(.0))]
    Rejected(ServiceFieldErrors),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Upstream error {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),
}

fn join_messages(errors: &ServiceFieldErrors) -> String {
    errors.values().cloned().collect::<Vec<_>>().join("; ")
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Event handler error: {0}")]
    HandlerError(String),
}

/// Conditions that only arise from incorrect wiring of the form flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("A submission is already in progress")]
    SubmissionInProgress,

    #[error("Field {0} is not part of the {1} form")]
    UnknownField(&'static str, &'static str),
}

impl Error {
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Field-scoped errors reported by the identity service.
    pub fn is_remote_validation_error(&self) -> bool {
        matches!(self, Error::Service(ServiceError::Rejected(_)))
    }

    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Error::Service(
                ServiceError::Transport(_)
                    | ServiceError::Upstream { .. }
                    | ServiceError::Decode(_)
            )
        )
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    pub fn is_state_error(&self) -> bool {
        matches!(self, Error::State(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let validation_error =
            Error::Validation(ValidationError::InvalidEmail("Email ID is invalid".to_string()));
        assert_eq!(
            validation_error.to_string(),
            "Validation error: Email ID is invalid"
        );

        let storage_error = Error::Storage(StorageError::Database("disk full".to_string()));
        assert_eq!(
            storage_error.to_string(),
            "Storage error: Database error: disk full"
        );

        let state_error = Error::State(StateError::SubmissionInProgress);
        assert_eq!(
            state_error.to_string(),
            "State error: A submission is already in progress"
        );
    }

    #[test]
    fn test_validation_error_message_is_verbatim() {
        let err = ValidationError::MissingField("Password is required".to_string());
        assert_eq!(err.message(), "Password is required");
        assert_eq!(err.to_string(), "Password is required");
    }

    #[test]
    fn test_service_error_display() {
        let mut errors = ServiceFieldErrors::new();
        errors.insert("email".to_string(), "Email already exists".to_string());
        errors.insert("message".to_string(), "Try again".to_string());
        let rejected = ServiceError::Rejected(errors);
        assert_eq!(
            rejected.to_string(),
            "Request rejected: Email already exists; Try again"
        );

        let upstream = ServiceError::Upstream {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(upstream.to_string(), "Upstream error 503: unavailable");
    }

    #[test]
    fn test_error_classification() {
        let rejected: Error = ServiceError::Rejected(ServiceFieldErrors::new()).into();
        assert!(rejected.is_remote_validation_error());
        assert!(!rejected.is_transport_error());

        let transport: Error = ServiceError::Transport("connection refused".to_string()).into();
        assert!(transport.is_transport_error());
        assert!(!transport.is_remote_validation_error());

        let local: Error = ValidationError::PasswordMismatch("mismatch".to_string()).into();
        assert!(local.is_validation_error());

        let state: Error = StateError::UnknownField("fullName", "login").into();
        assert!(state.is_state_error());
        assert!(!state.is_storage_error());
    }
}
