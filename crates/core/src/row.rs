//! Rows: named, ordered groupings of bundles for display.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::CoreError;
use crate::form::has_unsaved_input;
use crate::ordering::{Ordered, Reorderable};
use crate::types::{lenient_timestamp, DbId, Guid, Timestamp};
use crate::validation::FieldErrors;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: DbId,
    pub name: String,
    #[serde(default)]
    pub name_en: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description_en: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient_timestamp::deserialize")]
    pub created_at: Option<Timestamp>,
}

impl Row {
    pub fn display_name(&self) -> &str {
        self.name_en
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.name)
    }

    pub fn ensure_mutable(&self) -> Result<(), CoreError> {
        if self.is_active {
            return Err(CoreError::Conflict(format!(
                "Row '{}' is active; deactivate it before editing",
                self.display_name()
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Create / edit form
// ---------------------------------------------------------------------------

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required").with_message("Name is required".into()));
    }
    Ok(())
}

/// Row create/edit form. `name` is the primary-locale name.
#[derive(Debug, Clone, Default, PartialEq, Validate)]
pub struct RowForm {
    #[validate(
        custom(function = "not_blank"),
        length(max = 255, message = "Name must be at most 255 characters")
    )]
    pub name: String,
    #[validate(length(max = 255, message = "English name must be at most 255 characters"))]
    pub name_en: String,
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: String,
    #[validate(length(
        max = 2000,
        message = "English description must be at most 2000 characters"
    ))]
    pub description_en: String,
}

/// Body of `POST /rows` and `PUT /rows/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowPayload {
    pub name: String,
    pub name_en: String,
    pub description: String,
    pub description_en: String,
}

impl RowForm {
    pub fn from_row(row: &Row) -> Self {
        Self {
            name: row.name.clone(),
            name_en: row.name_en.clone().unwrap_or_default(),
            description: row.description.clone().unwrap_or_default(),
            description_en: row.description_en.clone().unwrap_or_default(),
        }
    }

    pub fn validate_all(&self) -> FieldErrors {
        match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(errors) => errors.into(),
        }
    }

    pub fn has_unsaved_data(&self) -> bool {
        has_unsaved_input(
            &[
                &self.name,
                &self.name_en,
                &self.description,
                &self.description_en,
            ],
            0,
        )
    }

    pub fn to_payload(&self) -> Result<RowPayload, FieldErrors> {
        self.validate_all().into_result()?;
        Ok(RowPayload {
            name: self.name.trim().to_string(),
            name_en: self.name_en.trim().to_string(),
            description: self.description.trim().to_string(),
            description_en: self.description_en.trim().to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Row <-> bundle assignments
// ---------------------------------------------------------------------------

/// A bundle assigned to a row, as listed by `GET /rows/{id}/bundles`.
///
/// The backend exposes the join record's id as `id` and `row_bundle_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowBundle {
    #[serde(default)]
    pub id: Option<DbId>,
    #[serde(default)]
    pub row_bundle_id: Option<DbId>,
    pub bundle_id: Guid,
    pub bundle_order: i32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub name_en: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(rename = "type", default)]
    pub bundle_type: Option<String>,
}

impl Ordered for RowBundle {
    fn order(&self) -> i32 {
        self.bundle_order
    }

    fn set_order(&mut self, order: i32) {
        self.bundle_order = order;
    }
}

impl Reorderable for RowBundle {
    fn assignment_id(&self) -> Result<DbId, CoreError> {
        self.row_bundle_id.or(self.id).ok_or_else(|| {
            CoreError::Internal(format!(
                "Assignment of bundle {} has no row-bundle id",
                self.bundle_id
            ))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleAssignment {
    pub bundle_id: Guid,
    pub bundle_order: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleOrder {
    pub id: DbId,
    pub bundle_order: i32,
}

/// Body of `POST /rows/{id}/bundles`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignBundlesRequest {
    pub bundle_assignments: Vec<BundleAssignment>,
}

/// Body of `PUT /rows/{id}/bundles/reorder`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderBundlesRequest {
    pub bundle_orders: Vec<BundleOrder>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_blank_name_rejected() {
        let form = RowForm {
            name: "   ".into(),
            ..RowForm::default()
        };
        let errors = form.validate_all();
        assert_eq!(errors.get("name"), Some("Name is required"));
        assert!(form.to_payload().is_err());
    }

    #[test]
    fn test_payload_trims_fields() {
        let form = RowForm {
            name: "  Featured ".into(),
            name_en: " Featured EN".into(),
            ..RowForm::default()
        };
        let payload = form.to_payload().unwrap();
        assert_eq!(payload.name, "Featured");
        assert_eq!(payload.name_en, "Featured EN");
        assert_eq!(payload.description, "");
    }

    #[test]
    fn test_unsaved_data() {
        assert!(!RowForm::default().has_unsaved_data());
        let form = RowForm {
            description_en: "x".into(),
            ..RowForm::default()
        };
        assert!(form.has_unsaved_data());
    }

    #[test]
    fn test_row_bundle_assignment_id_prefers_row_bundle_id() {
        let rb: RowBundle = serde_json::from_value(serde_json::json!({
            "id": 3,
            "row_bundle_id": 3,
            "bundle_id": "3f1c1a3e-8b7c-4d7e-9d55-2b3a1b2c3d4e",
            "bundle_order": 1,
            "name": "Pack",
            "price": 10.5,
            "type": "Duration"
        }))
        .unwrap();
        assert_eq!(rb.assignment_id().unwrap(), 3);

        let orphan = RowBundle {
            id: None,
            row_bundle_id: None,
            ..rb
        };
        assert_matches!(orphan.assignment_id(), Err(CoreError::Internal(_)));
    }

    #[test]
    fn test_request_bodies_use_backend_keys() {
        let bundle_id = Guid::new_v4();
        let assign = AssignBundlesRequest {
            bundle_assignments: vec![BundleAssignment {
                bundle_id,
                bundle_order: 4,
            }],
        };
        let json = serde_json::to_value(&assign).unwrap();
        assert_eq!(json["bundleAssignments"][0]["bundleOrder"], 4);
        assert_eq!(json["bundleAssignments"][0]["bundleId"], bundle_id.to_string());

        let reorder = ReorderBundlesRequest {
            bundle_orders: vec![BundleOrder {
                id: 9,
                bundle_order: 1,
            }],
        };
        let json = serde_json::to_value(&reorder).unwrap();
        assert_eq!(json, serde_json::json!({"bundleOrders": [{"id": 9, "bundleOrder": 1}]}));
    }

    #[test]
    fn test_active_row_not_editable() {
        let row = Row {
            id: 1,
            name: "r".into(),
            name_en: None,
            description: None,
            description_en: None,
            is_active: true,
            created_at: None,
        };
        assert!(row.ensure_mutable().is_err());
    }
}
