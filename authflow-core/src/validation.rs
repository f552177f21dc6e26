//! Local validation rules for the login and registration forms
//!
//! Every rule is a pure function of the raw field value(s). Messages are the exact text
//! shown to the user next to the field.
use crate::error::ValidationError;
use crate::form::{Field, FieldErrors};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Lazy-loaded email validation regex
///
/// Mirrors the platform email-address pattern used by mobile clients: a local part of up to
/// 256 characters, a domain label, and at least one dotted label. The whole value must match.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9+._%\-]{1,256}@[a-zA-Z0-9][a-zA-Z0-9\-]{0,64}(\.[a-zA-Z0-9][a-zA-Z0-9\-]{0,25})+$",
    )
    .expect("Invalid email regex pattern")
});

/// Values shorter than this many characters are rejected.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Validates the full name on the registration form
///
/// # Examples
///
/// ```rust
/// use authflow_core::validation::validate_full_name;
///
/// assert!(validate_full_name("Ada Lovelace").is_ok());
/// assert!(validate_full_name("").is_err());
/// ```
pub fn validate_full_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::MissingField(
            "Full name is required".to_string(),
        ));
    }

    Ok(())
}

/// Validates an email address
///
/// # Returns
///
/// `ValidationError::MissingField` for an empty value, `ValidationError::InvalidEmail` when
/// the value does not match the email pattern.
///
/// # Examples
///
/// ```rust
/// use authflow_core::validation::validate_email;
///
/// assert!(validate_email("user@example.com").is_ok());
/// assert!(validate_email("invalid-email").is_err());
/// ```
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::MissingField(
            "Email ID is required".to_string(),
        ));
    }

    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(
            "Email ID is invalid".to_string(),
        ))
    }
}

/// Validates a password
///
/// # Password Requirements
///
/// - Cannot be empty
/// - At least [`MIN_PASSWORD_LENGTH`] characters
///
/// # Examples
///
/// ```rust
/// use authflow_core::validation::validate_password;
///
/// assert!(validate_password("abcdef").is_ok());
/// assert!(validate_password("abcde").is_err());
/// ```
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    check_secret(password, "Password")
}

/// Validates the confirmation copy of the password on the registration form
pub fn validate_confirm_password(confirm_password: &str) -> Result<(), ValidationError> {
    check_secret(confirm_password, "Confirm Password")
}

fn check_secret(value: &str, label: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::MissingField(format!("{label} is required")));
    }

    if value.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::InvalidPassword(format!(
            "{label} must be longer than 6 characters"
        )));
    }

    Ok(())
}

/// Cross-field rule: the confirmation must equal the password
pub fn validate_passwords_match(
    password: &str,
    confirm_password: &str,
) -> Result<(), ValidationError> {
    if password != confirm_password {
        return Err(ValidationError::PasswordMismatch(
            "Confirm password doesn't match with Password".to_string(),
        ));
    }

    Ok(())
}

/// True when both passwords pass their own rules and match each other.
pub fn passwords_confirmed(password: &str, confirm_password: &str) -> bool {
    validate_password(password).is_ok()
        && validate_confirm_password(confirm_password).is_ok()
        && validate_passwords_match(password, confirm_password).is_ok()
}

/// Credentials entered on the login form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Run every login rule, reporting all failures together.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.record(Field::Email, validate_email(&self.email));
        errors.record(Field::Password, validate_password(&self.password));

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    pub fn value(&self, field: Field) -> Option<&str> {
        match field {
            Field::Email => Some(&self.email),
            Field::Password => Some(&self.password),
            Field::FullName | Field::ConfirmPassword => None,
        }
    }
}

/// Credentials entered on the registration form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    pub fn new(
        full_name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            email: email.into(),
            password: password.into(),
            confirm_password: confirm_password.into(),
        }
    }

    /// Run every registration rule, reporting all failures together.
    ///
    /// The password match is only checked once all four fields pass on their own.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut valid = errors.record(Field::FullName, validate_full_name(&self.full_name));
        valid &= errors.record(Field::Email, validate_email(&self.email));
        valid &= errors.record(Field::Password, validate_password(&self.password));
        valid &= errors.record(
            Field::ConfirmPassword,
            validate_confirm_password(&self.confirm_password),
        );

        if valid {
            errors.record(
                Field::ConfirmPassword,
                validate_passwords_match(&self.password, &self.confirm_password),
            );
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::FullName => &self.full_name,
            Field::Email => &self.email,
            Field::Password => &self.password,
            Field::ConfirmPassword => &self.confirm_password,
        }
    }

    pub fn set(&mut self, field: Field, value: String) {
        match field {
            Field::FullName => self.full_name = value,
            Field::Email => self.email = value,
            Field::Password => self.password = value,
            Field::ConfirmPassword => self.confirm_password = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email_valid() {
        assert!(validate_email("user@test.com").is_ok());
        assert!(validate_email("test.email+tag@domain.co.uk").is_ok());
        assert!(validate_email("user123@test-domain.com").is_ok());
        assert!(validate_email("a@b.c").is_ok());
    }

    #[test]
    fn test_validate_email_required() {
        assert_eq!(
            validate_email(""),
            Err(ValidationError::MissingField("Email ID is required".to_string()))
        );
    }

    #[test]
    fn test_validate_email_invalid() {
        for email in [
            "invalid-email",
            "@domain.com",
            "user@",
            "user@domain",
            "user@-domain.com",
            "user name@domain.com",
            " user@domain.com",
        ] {
            assert_eq!(
                validate_email(email),
                Err(ValidationError::InvalidEmail("Email ID is invalid".to_string())),
                "{email} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_password_boundary() {
        assert!(validate_password("abcdef").is_ok()); // Minimum length
        assert!(validate_password("pw12345").is_ok());
        assert_eq!(
            validate_password("abcde"),
            Err(ValidationError::InvalidPassword(
                "Password must be longer than 6 characters".to_string()
            ))
        );
        assert_eq!(
            validate_password(""),
            Err(ValidationError::MissingField("Password is required".to_string()))
        );
    }

    #[test]
    fn test_validate_password_counts_characters() {
        // Five multi-byte characters are still five characters
        assert!(validate_password("ééééé").is_err());
        assert!(validate_password("éééééé").is_ok());
    }

    #[test]
    fn test_validate_confirm_password_messages() {
        assert_eq!(
            validate_confirm_password("").unwrap_err().message(),
            "Confirm Password is required"
        );
        assert_eq!(
            validate_confirm_password("123").unwrap_err().message(),
            "Confirm Password must be longer than 6 characters"
        );
        assert!(validate_confirm_password("123456").is_ok());
    }

    #[test]
    fn test_validate_passwords_match() {
        assert_eq!(
            validate_passwords_match("secret1", "secret2")
                .unwrap_err()
                .message(),
            "Confirm password doesn't match with Password"
        );
        assert!(validate_passwords_match("secret1", "secret1").is_ok());
    }

    #[test]
    fn test_validate_full_name() {
        assert!(validate_full_name("Ada").is_ok());
        assert_eq!(
            validate_full_name("").unwrap_err().message(),
            "Full name is required"
        );
    }

    #[test]
    fn test_login_form_accumulates_all_errors() {
        let errors = LoginForm::new("", "abc").validate().unwrap_err();
        assert_eq!(errors.get(Field::Email), Some("Email ID is required"));
        assert_eq!(
            errors.get(Field::Password),
            Some("Password must be longer than 6 characters")
        );
        assert_eq!(errors.len(), 2);

        assert!(LoginForm::new("user@test.com", "pw12345").validate().is_ok());
    }

    #[test]
    fn test_registration_form_accumulates_all_errors() {
        let errors = RegistrationForm::new("", "bad", "", "12")
            .validate()
            .unwrap_err();
        assert_eq!(errors.get(Field::FullName), Some("Full name is required"));
        assert_eq!(errors.get(Field::Email), Some("Email ID is invalid"));
        assert_eq!(errors.get(Field::Password), Some("Password is required"));
        assert_eq!(
            errors.get(Field::ConfirmPassword),
            Some("Confirm Password must be longer than 6 characters")
        );
    }

    #[test]
    fn test_registration_mismatch_only_after_individual_checks() {
        // Name missing: the mismatch is not evaluated
        let errors = RegistrationForm::new("", "a@b.co", "secret1", "secret2")
            .validate()
            .unwrap_err();
        assert!(!errors.contains(Field::ConfirmPassword));

        let errors = RegistrationForm::new("Ada", "a@b.co", "secret1", "secret2")
            .validate()
            .unwrap_err();
        assert_eq!(
            errors.get(Field::ConfirmPassword),
            Some("Confirm password doesn't match with Password")
        );
        assert_eq!(errors.len(), 1);

        assert!(
            RegistrationForm::new("Ada", "a@b.co", "secret1", "secret1")
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_passwords_confirmed() {
        assert!(passwords_confirmed("secret1", "secret1"));
        assert!(!passwords_confirmed("secret1", "secret2"));
        assert!(!passwords_confirmed("abc", "abc"));
    }
}
