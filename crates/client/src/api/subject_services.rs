//! `/subject-services` and `/services` endpoints.

use serde::Deserialize;

use eduadmin_core::subject_service::{CreateSubjectServices, Service, SubjectService};
use eduadmin_core::types::DbId;

use super::ApiClient;
use crate::error::ClientError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedSubjectServices {
    #[serde(default)]
    subject_services: Vec<SubjectService>,
}

impl ApiClient {
    /// Subject services of one subject, across grades.
    pub async fn subject_services(&self, subject_id: DbId) -> Result<Vec<SubjectService>, ClientError> {
        self.fetch_list(self.get(&format!("/subject-services/{subject_id}")))
            .await
    }

    /// Returns the created records when the backend echoes them.
    pub async fn create_subject_services(
        &self,
        request: &CreateSubjectServices,
    ) -> Result<Vec<SubjectService>, ClientError> {
        let created: Option<CreatedSubjectServices> =
            self.fetch(self.post("/subject-services", request)).await?;
        tracing::info!(
            subject_id = request.subject_id,
            grade_id = request.grade_id,
            count = request.service_ids.len(),
            "Subject services created"
        );
        Ok(created.unwrap_or_default().subject_services)
    }

    pub async fn delete_subject_service(&self, id: DbId) -> Result<(), ClientError> {
        self.execute(self.delete(&format!("/subject-services/{id}")))
            .await?;
        tracing::info!(subject_service_id = id, "Subject service deleted");
        Ok(())
    }

    /// The service catalogue.
    pub async fn services(&self) -> Result<Vec<Service>, ClientError> {
        self.fetch_list(self.get("/services")).await
    }
}
