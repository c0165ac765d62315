// src/validation.rs
//! Field checks for the registration/login forms and the poll composer.
//! All of these are pure and cheap enough to run on every keystroke.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern compiles")
});

pub fn validate_email(value: &str) -> Result<(), ValidationError> {
    if EMAIL_RE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat)
    }
}

/// Length is counted in UTF-16 units, the way browser form fields count it.
pub fn validate_password(value: &str) -> Result<(), ValidationError> {
    if value.encode_utf16().count() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err(ValidationError::TooShort)
    }
}

pub fn validate_confirmation(value: &str, password: &str) -> Result<(), ValidationError> {
    if value == password {
        Ok(())
    } else {
        Err(ValidationError::Mismatch)
    }
}

pub fn validate_question(question: &str) -> Result<(), ValidationError> {
    if question.trim().is_empty() {
        Err(ValidationError::EmptyQuestion)
    } else {
        Ok(())
    }
}

pub fn validate_options<S: AsRef<str>>(options: &[S]) -> Result<(), ValidationError> {
    if options.iter().any(|o| o.as_ref().trim().is_empty()) {
        return Err(ValidationError::EmptyOption);
    }
    if options.len() < 2 {
        return Err(ValidationError::TooFewOptions);
    }
    Ok(())
}

/// Per-field outcome of checking a form, `None` meaning the field is fine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    pub email: Option<ValidationError>,
    pub password: Option<ValidationError>,
    pub confirm_password: Option<ValidationError>,
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none() && self.confirm_password.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub phone_number: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> FormErrors {
        FormErrors {
            email: validate_email(&self.email).err(),
            password: validate_password(&self.password).err(),
            confirm_password: validate_confirmation(&self.confirm_password, &self.password).err(),
        }
    }

    /// Blank phone numbers are treated as not given.
    pub fn phone(&self) -> Option<String> {
        let phone = self.phone_number.trim();
        (!phone.is_empty()).then(|| phone.to_string())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_emails() {
        for ok in ["a@b.co", "first.last+tag@mail.example.org", "x_y%z-1@sub-domain.io"] {
            assert_eq!(validate_email(ok), Ok(()), "{ok}");
        }
    }

    #[test]
    fn rejects_emails_without_at_or_domain_dot() {
        for bad in ["", "plain", "no-at.example.com", "user@localhost", "user@host.c", "sp ace@x.com", "a@b@c.com"] {
            assert_eq!(validate_email(bad), Err(ValidationError::InvalidFormat), "{bad}");
        }
    }

    #[test]
    fn password_length_boundary() {
        for len in 0..6 {
            assert_eq!(validate_password(&"x".repeat(len)), Err(ValidationError::TooShort));
        }
        assert_eq!(validate_password("secret"), Ok(()));
        assert_eq!(validate_password("a much longer password"), Ok(()));
    }

    #[test]
    fn password_length_counts_utf16_units() {
        // each emoji is a surrogate pair
        assert_eq!(validate_password("😀😀😀"), Ok(()));
        assert_eq!(validate_password("😀😀"), Err(ValidationError::TooShort));
        assert_eq!(validate_password("ééééé"), Err(ValidationError::TooShort));
    }

    #[test]
    fn confirmation_must_match_exactly() {
        assert_eq!(validate_confirmation("secret", "secret"), Ok(()));
        assert_eq!(validate_confirmation("Secret", "secret"), Err(ValidationError::Mismatch));
    }

    #[test]
    fn poll_fields_are_checked_after_trimming() {
        assert_eq!(validate_question("   "), Err(ValidationError::EmptyQuestion));
        assert_eq!(validate_question(" Best? "), Ok(()));
        assert_eq!(validate_options(&["A", "  "]), Err(ValidationError::EmptyOption));
        assert_eq!(validate_options(&["A"]), Err(ValidationError::TooFewOptions));
        assert_eq!(validate_options(&["A", "B"]), Ok(()));
    }

    #[test]
    fn registration_form_collects_every_field_error() {
        let form = RegistrationForm {
            email: "nope".into(),
            password: "abc".into(),
            confirm_password: "abd".into(),
            phone_number: "  ".into(),
        };
        let errors = form.validate();
        assert_eq!(errors.email, Some(ValidationError::InvalidFormat));
        assert_eq!(errors.password, Some(ValidationError::TooShort));
        assert_eq!(errors.confirm_password, Some(ValidationError::Mismatch));
        assert!(!errors.is_empty());
        assert_eq!(form.phone(), None);
    }
}
