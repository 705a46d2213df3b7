//! Request validation.

use super::models::HttpServerError;

/// Task names: 1..=100 chars of ASCII letters, digits, `_`, `-`, `.` or `:`.
pub fn validate_task_name(name: &str) -> Result<(), HttpServerError> {
    if name.is_empty() {
        return Err(HttpServerError::InvalidRequest(
            "Task name cannot be empty".to_string(),
        ));
    }
    if name.len() > 100 {
        return Err(HttpServerError::InvalidRequest(format!(
            "Task name too long ({} chars, max 100)",
            name.len()
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
    {
        return Err(HttpServerError::InvalidRequest(
            "Task name contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

/// Caps the number of user arguments and their total length.
pub fn validate_arguments(args: &[String]) -> Result<(), HttpServerError> {
    if args.len() > 256 {
        return Err(HttpServerError::InvalidRequest(format!(
            "Too many arguments ({}, max 256)",
            args.len()
        )));
    }
    let total: usize = args.iter().map(String::len).sum();
    if total > 64 * 1024 {
        return Err(HttpServerError::InvalidRequest(format!(
            "Arguments too long ({total} bytes, max 65536)"
        )));
    }
    Ok(())
}
