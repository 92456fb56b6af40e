//! Field-level validation results for admin forms.
//!
//! Forms validate a single field on blur and every field on submit. Both
//! paths produce messages keyed by field name so a front end can render
//! them next to the offending input.

use std::collections::BTreeMap;

/// Per-field validation messages. Empty means the form is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: BTreeMap<&'static str, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for `field`, replacing any earlier message.
    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.insert(field, message.into());
    }

    /// Replace the entry for `field` with the outcome of a single-field check.
    pub fn set(&mut self, field: &'static str, outcome: Option<String>) {
        match outcome {
            Some(message) => {
                self.errors.insert(field, message);
            }
            None => {
                self.errors.remove(field);
            }
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.errors.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// One-line rendering, e.g. `price: Price is required; name: ...`.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|(field, msg)| format!("{field}: {msg}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.summary())
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, list) in errors.field_errors() {
            let message = list
                .first()
                .and_then(|e| e.message.as_ref())
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("{field} is invalid"));
            let field: &'static str = match field.as_ref() {
                "name" => "name",
                "name_en" => "name_en",
                "description" => "description",
                "description_en" => "description_en",
                "count" => "count",
                _ => "form",
            };
            out.insert(field, message);
        }
        out
    }
}
