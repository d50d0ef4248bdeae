use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ApiError;

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    if !is_valid_email(email) {
        return Err(ApiError::validation("Invalid email address"));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), ApiError> {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_]{3,30}$").unwrap();
    }
    if !USERNAME_RE.is_match(username) {
        return Err(ApiError::validation(
            "Username must be 3-30 characters of letters, numbers or underscores",
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::validation(
            "Password must be at least 8 characters long",
        ));
    }
    Ok(())
}
