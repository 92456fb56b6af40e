//! `/filters` endpoints: one option list per cascade level.

use eduadmin_core::filter::{FilterLevel, FilterNode, LoadRequest};
use eduadmin_core::types::DbId;

use super::ApiClient;
use crate::error::ClientError;

impl ApiClient {
    pub async fn countries(&self) -> Result<Vec<FilterNode>, ClientError> {
        self.fetch_list(self.get("/filters/countries")).await
    }

    pub async fn curriculums(&self, country_id: DbId) -> Result<Vec<FilterNode>, ClientError> {
        self.fetch_list(
            self.get("/filters/curriculums")
                .query(&[("countryId", country_id)]),
        )
        .await
    }

    pub async fn stages(&self, curriculum_id: DbId) -> Result<Vec<FilterNode>, ClientError> {
        self.fetch_list(
            self.get("/filters/stages")
                .query(&[("curriculumId", curriculum_id)]),
        )
        .await
    }

    pub async fn grades(&self, stage_id: DbId) -> Result<Vec<FilterNode>, ClientError> {
        self.fetch_list(self.get("/filters/grades").query(&[("stageId", stage_id)]))
            .await
    }

    pub async fn subjects(&self, grade_id: DbId) -> Result<Vec<FilterNode>, ClientError> {
        self.fetch_list(self.get("/filters/subjects").query(&[("gradeId", grade_id)]))
            .await
    }

    /// Options for one cascade load.
    pub async fn filter_options(&self, request: LoadRequest) -> Result<Vec<FilterNode>, ClientError> {
        match (request.level, request.parent_id) {
            (FilterLevel::Country, _) => self.countries().await,
            (FilterLevel::Curriculum, Some(id)) => self.curriculums(id).await,
            (FilterLevel::Stage, Some(id)) => self.stages(id).await,
            (FilterLevel::Grade, Some(id)) => self.grades(id).await,
            (FilterLevel::Subject, Some(id)) => self.subjects(id).await,
            (level, None) => Err(eduadmin_core::error::CoreError::Validation(format!(
                "Loading {} requires a parent selection",
                level.plural()
            ))
            .into()),
        }
    }
}
