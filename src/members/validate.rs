use serde_json::Value;
use thiserror::Error;

pub const MIN_IDENTIFIER_LEN: usize = 2;
pub const MAX_IDENTIFIER_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("member_identifier must be a non-empty string")]
    Empty,
    #[error("member_identifier must be between 2 and 100 characters")]
    Length,
}

/// Trim and bound-check a raw lookup key. Returns the trimmed slice.
pub fn validate_identifier(raw: &str) -> Result<&str, IdentifierError> {
    if raw.is_empty() {
        return Err(IdentifierError::Empty);
    }

    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if !(MIN_IDENTIFIER_LEN..=MAX_IDENTIFIER_LEN).contains(&len) {
        return Err(IdentifierError::Length);
    }

    Ok(trimmed)
}

/// Same as [`validate_identifier`] for an untyped tool argument.
pub fn validate_identifier_value(raw: Option<&Value>) -> Result<&str, IdentifierError> {
    match raw.and_then(Value::as_str) {
        Some(text) => validate_identifier(text),
        None => Err(IdentifierError::Empty),
    }
}
