//! Local form checks. A failure here means no request is sent.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ClientError, Result};

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("valid email pattern"))
}

/// Trim `value`, rejecting it when nothing is left.
pub fn require_non_empty<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ClientError::Validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed)
}

pub fn validate_email(email: &str) -> Result<&str> {
    let email = email.trim();
    if !email_regex().is_match(email) {
        return Err(ClientError::Validation("Invalid email address".into()));
    }
    Ok(email)
}
