//! The active filter scope shared by every management screen.

use serde::{Deserialize, Serialize};

use crate::filter::{FilterLevel, FilterNode};
use crate::types::DbId;

/// A contiguous Country → Grade (→ Subject) selection.
///
/// Country through Grade are always present; the subject is only set by
/// the standalone subject selector. "No scope" is modelled as
/// `Option<SelectedScope>::None` by the owner, so a value of this type is
/// never a partial prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedScope {
    pub country: FilterNode,
    pub curriculum: FilterNode,
    pub stage: FilterNode,
    pub grade: FilterNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<FilterNode>,
}

impl SelectedScope {
    pub fn grade_id(&self) -> DbId {
        self.grade.id
    }

    pub fn subject_id(&self) -> Option<DbId> {
        self.subject.as_ref().map(|s| s.id)
    }

    /// The node selected at `level`, if any.
    pub fn node(&self, level: FilterLevel) -> Option<&FilterNode> {
        match level {
            FilterLevel::Country => Some(&self.country),
            FilterLevel::Curriculum => Some(&self.curriculum),
            FilterLevel::Stage => Some(&self.stage),
            FilterLevel::Grade => Some(&self.grade),
            FilterLevel::Subject => self.subject.as_ref(),
        }
    }

    /// Short breadcrumb such as `Egypt / National / Primary / Grade 4`.
    pub fn breadcrumb(&self) -> String {
        FilterLevel::ALL
            .iter()
            .filter_map(|level| self.node(*level))
            .map(|node| node.name.as_str())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

/// Grade id of an optional scope; `0` tells the backend "no grade filter".
pub fn grade_id_or_zero(scope: Option<&SelectedScope>) -> DbId {
    scope.map(SelectedScope::grade_id).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: DbId, name: &str) -> FilterNode {
        FilterNode::new(id, name)
    }

    fn sample() -> SelectedScope {
        SelectedScope {
            country: node(1, "Egypt"),
            curriculum: node(2, "National"),
            stage: node(3, "Primary"),
            grade: node(4, "Grade 4"),
            subject: None,
        }
    }

    #[test]
    fn test_json_round_trip_is_identical() {
        let scope = SelectedScope {
            subject: Some(node(5, "Math")),
            ..sample()
        };
        let json = serde_json::to_string(&scope).unwrap();
        let back: SelectedScope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scope);
    }

    #[test]
    fn test_subject_omitted_when_absent() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("subject").is_none());
        assert_eq!(json["grade"]["id"], 4);
    }

    #[test]
    fn test_breadcrumb_and_ids() {
        let scope = sample();
        assert_eq!(scope.grade_id(), 4);
        assert_eq!(scope.subject_id(), None);
        assert_eq!(scope.breadcrumb(), "Egypt / National / Primary / Grade 4");
    }

    #[test]
    fn test_grade_id_or_zero() {
        assert_eq!(grade_id_or_zero(None), 0);
        assert_eq!(grade_id_or_zero(Some(&sample())), 4);
    }
}
