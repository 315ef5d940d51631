use actix_web::{http::header, HttpResponse};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{FieldErrors, ServiceError};

pub mod account;
pub mod admin;
pub mod application;
pub mod room;

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());
// logins, student numbers and room numbers
static IDENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9][0-9\- ]{4,30}$").unwrap());

/// 303 to `location`, the answer to a successful form post.
pub(crate) fn see_other(location: impl Into<String>) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location.into()))
        .finish()
}

pub(crate) fn found<T>(row: Option<T>) -> Result<T, ServiceError> {
    row.ok_or_else(ServiceError::page_not_found)
}

/// Trims `value` and records blank or over-long input.
pub(crate) fn required(errors: &mut FieldErrors, field: &str, label: &str, value: &str, max_len: usize) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, format!("{} cannot be blank.", label));
    } else if value.chars().count() > max_len {
        errors.add(field, format!("{} should contain at most {} characters.", label, max_len));
    }
    value.to_owned()
}

pub(crate) fn identifier(errors: &mut FieldErrors, field: &str, label: &str, value: &str, max_len: usize) -> String {
    let value = required(errors, field, label, value, max_len);
    if !value.is_empty() && !IDENT_RE.is_match(&value) {
        errors.add(
            field,
            format!("{} may only contain letters, digits, dots, dashes and underscores.", label),
        );
    }
    value
}

pub(crate) fn email(errors: &mut FieldErrors, field: &str, value: &str) -> String {
    let value = required(errors, field, "Email", value, 255);
    if !value.is_empty() && !EMAIL_RE.is_match(&value) {
        errors.add(field, "Email is not a valid email address.");
    }
    value
}

pub(crate) fn phone(errors: &mut FieldErrors, field: &str, value: &str) -> String {
    let value = required(errors, field, "Phone", value, 32);
    if !value.is_empty() && !PHONE_RE.is_match(&value) {
        errors.add(field, "Phone is not a valid phone number.");
    }
    value
}

pub(crate) fn password(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            field,
            format!("Password should contain at least {} characters.", MIN_PASSWORD_LEN),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_fields_trim_and_bound() {
        let mut errors = FieldErrors::new();
        assert_eq!(required(&mut errors, "event", "Event", "  Film night ", 20), "Film night");
        assert!(errors.is_empty());

        required(&mut errors, "organization", "Organization", "   ", 20);
        required(&mut errors, "event", "Event", "a very long event name indeed", 10);
        assert!(errors.has("organization"));
        assert!(errors.has("event"));
    }

    #[test]
    fn format_checks() {
        let mut errors = FieldErrors::new();
        email(&mut errors, "email", "alice@example.com");
        phone(&mut errors, "phone", "+86 138-0000-0000");
        identifier(&mut errors, "admin_id", "Admin ID", "T-001", 32);
        password(&mut errors, "password", "secret1");
        assert!(errors.is_empty());

        email(&mut errors, "email", "not-an-email");
        phone(&mut errors, "phone", "call me");
        identifier(&mut errors, "admin_id", "Admin ID", "bad id!", 32);
        password(&mut errors, "password", "abc");
        for field in ["email", "phone", "admin_id", "password"] {
            assert!(errors.has(field), "{} should fail", field);
        }
    }
}
