use std::fmt::Display;

use crate::validation::FieldErrors;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Integer ids and GUIDs alike are reported in their display form.
    pub fn not_found(entity: &'static str, id: impl Display) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<FieldErrors> for CoreError {
    fn from(errors: FieldErrors) -> Self {
        CoreError::Validation(errors.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let id: uuid::Uuid = "0d0c8f3e-7b6a-4b53-8f1e-6a3f0c2b9d10".parse().unwrap();
        assert_eq!(
            CoreError::not_found("bundle", id).to_string(),
            "Entity not found: bundle with id 0d0c8f3e-7b6a-4b53-8f1e-6a3f0c2b9d10"
        );
        assert_eq!(
            CoreError::not_found("row", 7).to_string(),
            "Entity not found: row with id 7"
        );
    }

    #[test]
    fn test_field_errors_become_validation() {
        let mut errors = FieldErrors::new();
        errors.insert("price", "Price is required");
        errors.insert("name", "Name is required");
        let err: CoreError = errors.into();
        assert_eq!(
            err.to_string(),
            "Validation failed: name: Name is required; price: Price is required"
        );
    }
}
