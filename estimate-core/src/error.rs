use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single user-input problem, attributed to the form field that caused it.
///
/// Validation failures are an expected part of filling in the wizard, so they
/// are always returned as values and shown next to the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn required(field: impl Into<String>) -> Self {
        Self::new(field, "is required")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn display_prefixes_field_name() {
        let error = ValidationError::new("floor_area", "must be at least 10");

        assert_eq!(error.to_string(), "floor_area: must be at least 10");
    }

    #[test]
    fn required_uses_standard_message() {
        let error = ValidationError::required("client_type");

        assert_eq!(error.message, "is required");
    }
}
