//! Registration rules (pure, deterministic).

use serde::Deserialize;
use thiserror::Error;

/// Shortest password accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Registration form input. Missing fields read as empty and fail
/// validation like blank ones.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password should be at least 6 characters")]
    PasswordTooShort,

    #[error("Please enter your full name")]
    MissingName,

    #[error("Please enter a valid email address")]
    InvalidEmail,
}

/// Lower-cased, trimmed email used for lookups and uniqueness.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate registration input.
///
/// The confirmation check runs first, then password length, then the
/// name/email shape checks. Email uniqueness needs storage and is checked by
/// the caller.
pub fn validate_registration(input: &Registration) -> Result<(), RegistrationError> {
    if input.password != input.confirm_password {
        return Err(RegistrationError::PasswordMismatch);
    }
    if input.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(RegistrationError::PasswordTooShort);
    }
    if input.full_name.trim().is_empty() {
        return Err(RegistrationError::MissingName);
    }

    let email = input.email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(RegistrationError::InvalidEmail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn form(password: &str, confirm: &str) -> Registration {
        Registration {
            full_name: "Ada Obi".to_string(),
            email: "ada@example.com".to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert_eq!(validate_registration(&form("secret", "secret")), Ok(()));
    }

    #[test]
    fn missing_fields_fail_validation() {
        let partial: Registration = serde_json::from_str(r#"{"email": "ada@example.com"}"#).unwrap();
        assert_eq!(
            validate_registration(&partial),
            Err(RegistrationError::PasswordTooShort)
        );
    }

    #[test]
    fn mismatch_is_reported_before_length() {
        assert_eq!(
            validate_registration(&form("abc", "abd")),
            Err(RegistrationError::PasswordMismatch)
        );
    }

    #[test]
    fn blank_name_and_bad_email_are_rejected() {
        let mut f = form("secret", "secret");
        f.full_name = "   ".to_string();
        assert_eq!(validate_registration(&f), Err(RegistrationError::MissingName));

        let mut f = form("secret", "secret");
        f.email = "ada.example.com".to_string();
        assert_eq!(validate_registration(&f), Err(RegistrationError::InvalidEmail));
    }

    #[test]
    fn emails_normalize_case_and_whitespace() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    proptest! {
        #[test]
        fn short_passwords_never_validate(pw in "[a-zA-Z0-9]{0,5}") {
            prop_assert_eq!(
                validate_registration(&form(&pw, &pw)),
                Err(RegistrationError::PasswordTooShort)
            );
        }

        #[test]
        fn mismatched_confirmation_never_validates(pw in "[a-z]{6,12}", suffix in "[0-9]{1,3}") {
            let confirm = format!("{pw}{suffix}");
            prop_assert_eq!(
                validate_registration(&form(&pw, &confirm)),
                Err(RegistrationError::PasswordMismatch)
            );
        }
    }
}
