//! Form fields and error aggregation
//!
//! A form is a fixed set of [`Field`]s. Validation failures and service rejections are
//! collected into [`FieldErrors`], which holds at most one message per field plus any number
//! of global messages that are not attributable to a single field.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceFieldErrors, ValidationError};

/// An input field known to the authentication forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    FullName,
    Email,
    Password,
    ConfirmPassword,
}

impl Field {
    /// The key the identity service uses for this field.
    pub fn key(&self) -> &'static str {
        match self {
            Field::FullName => "fullName",
            Field::Email => "email",
            Field::Password => "password",
            Field::ConfirmPassword => "confirmPassword",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "fullName" => Some(Field::FullName),
            "email" => Some(Field::Email),
            "password" => Some(Field::Password),
            "confirmPassword" => Some(Field::ConfirmPassword),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Which form a flow belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormKind {
    Login,
    Registration,
}

impl FormKind {
    /// Fields shown on this form.
    pub fn fields(&self) -> &'static [Field] {
        match self {
            FormKind::Login => &[Field::Email, Field::Password],
            FormKind::Registration => &[
                Field::FullName,
                Field::Email,
                Field::Password,
                Field::ConfirmPassword,
            ],
        }
    }

    pub fn has_field(&self, field: Field) -> bool {
        self.fields().contains(&field)
    }

    /// Fields the identity service may report against. Rejections under any other key are
    /// shown as global messages.
    pub fn service_fields(&self) -> &'static [Field] {
        match self {
            FormKind::Login => &[Field::Email, Field::Password],
            FormKind::Registration => &[Field::FullName, Field::Email, Field::Password],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FormKind::Login => "login",
            FormKind::Registration => "registration",
        }
    }
}

/// Field-scoped and global messages produced by one validation pass or submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors {
    fields: BTreeMap<Field, String>,
    global: Vec<String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the user-visible errors for a failed service call on the given form.
    ///
    /// Keys in [`FormKind::service_fields`] land on their field. Every other key and every
    /// generic failure becomes a global message. Nothing is dropped.
    pub fn from_service_error(form: FormKind, error: &ServiceError) -> Self {
        let mut errors = Self::new();
        match error {
            ServiceError::Rejected(reported) => errors.absorb_rejection(form, reported),
            ServiceError::Transport(_) => {
                errors.push_global("Unable to reach the server. Please check your connection.")
            }
            ServiceError::Upstream { message, .. } if !message.trim().is_empty() => {
                errors.push_global(message.clone())
            }
            ServiceError::Upstream { status, .. } => {
                errors.push_global(format!("The server responded with status {status}"))
            }
            ServiceError::Decode(_) => {
                errors.push_global("The server sent a response that could not be read")
            }
        }
        errors
    }

    fn absorb_rejection(&mut self, form: FormKind, reported: &ServiceFieldErrors) {
        for (key, message) in reported {
            match Field::from_key(key).filter(|field| form.service_fields().contains(field)) {
                Some(field) => self.insert(field, message.clone()),
                None => self.push_global(message.clone()),
            }
        }
        if self.is_empty() {
            self.push_global("The request was rejected by the server");
        }
    }

    /// Record a message for a field. The first message for a field wins.
    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.fields.entry(field).or_insert_with(|| message.into());
    }

    /// Record a message for a field, replacing any earlier one.
    pub fn replace(&mut self, field: Field, message: impl Into<String>) {
        self.fields.insert(field, message.into());
    }

    pub fn record(&mut self, field: Field, result: Result<(), ValidationError>) -> bool {
        match result {
            Ok(()) => true,
            Err(err) => {
                self.insert(field, err.message());
                false
            }
        }
    }

    pub fn push_global(&mut self, message: impl Into<String>) {
        self.global.push(message.into());
    }

    pub fn clear(&mut self, field: Field) -> Option<String> {
        self.fields.remove(&field)
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (Field, &str)> {
        self.fields.iter().map(|(field, msg)| (*field, msg.as_str()))
    }

    pub fn global(&self) -> &[String] {
        &self.global
    }

    /// Global messages joined one per line, as shown in an informational dialog.
    pub fn global_message(&self) -> Option<String> {
        if self.global.is_empty() {
            None
        } else {
            Some(self.global.join("\n"))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.global.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len() + self.global.len()
    }
}
