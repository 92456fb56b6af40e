//! Subject services: which service offerings exist for a subject in a grade.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{lenient_timestamp, DbId, Timestamp};

/// A service offering from `GET /services`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: DbId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectService {
    pub id: DbId,
    pub subject_id: DbId,
    pub service_id: DbId,
    pub grade_id: DbId,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub subject_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp::deserialize")]
    pub created_at: Option<Timestamp>,
}

/// Body of `POST /subject-services`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubjectServices {
    pub subject_id: DbId,
    pub grade_id: DbId,
    pub service_ids: Vec<DbId>,
}

/// Service ids already attached to the subject in `grade_id`.
pub fn existing_service_ids(existing: &[SubjectService], grade_id: DbId) -> HashSet<DbId> {
    existing
        .iter()
        .filter(|ss| ss.grade_id == grade_id)
        .map(|ss| ss.service_id)
        .collect()
}

/// Names used in duplicate messages.
#[derive(Debug, Clone, Copy)]
pub struct CreationContext<'a> {
    pub subject_id: DbId,
    pub subject_name: Option<&'a str>,
    pub grade_id: DbId,
    pub grade_name: &'a str,
}

impl CreationContext<'_> {
    fn subject_label(&self) -> &str {
        self.subject_name.unwrap_or("this subject")
    }
}

/// Reject picking a service that already exists for the subject and grade.
pub fn check_selectable(
    service_id: DbId,
    existing: &HashSet<DbId>,
    ctx: &CreationContext<'_>,
) -> Result<(), CoreError> {
    if existing.contains(&service_id) {
        return Err(CoreError::Conflict(format!(
            "This service already exists for {} in Grade {}",
            ctx.subject_label(),
            ctx.grade_name
        )));
    }
    Ok(())
}

/// Build the create request, refusing any selection that would duplicate
/// an existing (subject, service, grade) triple.
pub fn plan_creation(
    selected: &[DbId],
    existing: &HashSet<DbId>,
    services: &[Service],
    ctx: &CreationContext<'_>,
) -> Result<CreateSubjectServices, CoreError> {
    if selected.is_empty() {
        return Err(CoreError::Validation(
            "Please select at least one service".to_string(),
        ));
    }

    let duplicates: Vec<DbId> = selected
        .iter()
        .copied()
        .filter(|id| existing.contains(id))
        .collect();

    if duplicates.len() == selected.len() && duplicates.len() > 1 {
        return Err(CoreError::Conflict(
            "All selected services already exist for this subject and grade".to_string(),
        ));
    }

    if !duplicates.is_empty() {
        let names = services
            .iter()
            .filter(|s| duplicates.contains(&s.id))
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>();
        let names = if names.is_empty() {
            duplicates
                .iter()
                .map(|id| format!("service #{id}"))
                .collect::<Vec<_>>()
                .join(", ")
        } else {
            names.join(", ")
        };
        let verb = if duplicates.len() == 1 {
            "exists"
        } else {
            "exist"
        };
        return Err(CoreError::Conflict(format!(
            "Cannot create: {names} already {verb} for {} in Grade {}",
            ctx.subject_label(),
            ctx.grade_name
        )));
    }

    Ok(CreateSubjectServices {
        subject_id: ctx.subject_id,
        grade_id: ctx.grade_id,
        service_ids: selected.to_vec(),
    })
}

/// Every service not yet attached, for "select all".
pub fn selectable_services(services: &[Service], existing: &HashSet<DbId>) -> Vec<DbId> {
    services
        .iter()
        .map(|s| s.id)
        .filter(|id| !existing.contains(id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn ctx() -> CreationContext<'static> {
        CreationContext {
            subject_id: 5,
            subject_name: Some("Math"),
            grade_id: 4,
            grade_name: "Grade 4",
        }
    }

    fn services() -> Vec<Service> {
        vec![
            Service {
                id: 9,
                name: "Videos".into(),
                description: None,
            },
            Service {
                id: 10,
                name: "Quizzes".into(),
                description: None,
            },
        ]
    }

    fn existing() -> Vec<SubjectService> {
        vec![
            SubjectService {
                id: 1,
                subject_id: 5,
                service_id: 9,
                grade_id: 4,
                service_name: None,
                subject_name: None,
                created_at: None,
            },
            SubjectService {
                id: 2,
                subject_id: 5,
                service_id: 10,
                grade_id: 7,
                service_name: None,
                subject_name: None,
                created_at: None,
            },
        ]
    }

    #[test]
    fn test_existing_ids_filtered_by_grade() {
        let ids = existing_service_ids(&existing(), 4);
        assert_eq!(ids, HashSet::from([9]));
    }

    #[test]
    fn test_duplicate_blocks_creation_with_names() {
        let ids = existing_service_ids(&existing(), 4);
        let err = plan_creation(&[9], &ids, &services(), &ctx()).unwrap_err();
        assert_matches!(
            err,
            CoreError::Conflict(ref msg)
                if msg == "Cannot create: Videos already exists for Math in Grade 4"
        );
    }

    #[test]
    fn test_mixed_selection_names_only_duplicates() {
        let ids = existing_service_ids(&existing(), 4);
        let err = plan_creation(&[9, 10], &ids, &services(), &ctx()).unwrap_err();
        assert_matches!(err, CoreError::Conflict(ref msg) if msg.starts_with("Cannot create: Videos "));
    }

    #[test]
    fn test_all_duplicates_message() {
        let ids = HashSet::from([9, 10]);
        let err = plan_creation(&[9, 10], &ids, &services(), &ctx()).unwrap_err();
        assert_matches!(
            err,
            CoreError::Conflict(ref msg)
                if msg == "All selected services already exist for this subject and grade"
        );
    }

    #[test]
    fn test_new_services_planned() {
        let ids = existing_service_ids(&existing(), 4);
        let plan = plan_creation(&[10], &ids, &services(), &ctx()).unwrap();
        assert_eq!(
            plan,
            CreateSubjectServices {
                subject_id: 5,
                grade_id: 4,
                service_ids: vec![10],
            }
        );
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["serviceIds"], serde_json::json!([10]));
    }

    #[test]
    fn test_empty_selection_rejected() {
        let err = plan_creation(&[], &HashSet::new(), &services(), &ctx()).unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
    }

    #[test]
    fn test_selectable_and_select_all() {
        let ids = HashSet::from([9]);
        assert!(check_selectable(9, &ids, &ctx()).is_err());
        assert!(check_selectable(10, &ids, &ctx()).is_ok());
        assert_eq!(selectable_services(&services(), &ids), vec![10]);
    }
}
