//! `/rows` endpoints, including row-bundle assignments.

use eduadmin_core::row::{
    AssignBundlesRequest, ReorderBundlesRequest, Row, RowBundle, RowPayload,
};
use eduadmin_core::search::{Page, SearchQuery};
use eduadmin_core::types::DbId;

use super::{ApiClient, SetActiveBody};
use crate::error::ClientError;

impl ApiClient {
    pub async fn search_rows(&self, query: &SearchQuery) -> Result<Page<Row>, ClientError> {
        self.fetch_page(self.post("/rows/search", query), query).await
    }

    pub async fn row(&self, id: DbId) -> Result<Row, ClientError> {
        self.fetch_required(self.get(&format!("/rows/{id}"))).await
    }

    pub async fn create_row(&self, payload: &RowPayload) -> Result<(), ClientError> {
        self.execute(self.post("/rows", payload)).await?;
        tracing::info!(name = %payload.name, "Row created");
        Ok(())
    }

    pub async fn update_row(&self, id: DbId, payload: &RowPayload) -> Result<(), ClientError> {
        self.execute(self.put(&format!("/rows/{id}"), payload)).await?;
        tracing::info!(row_id = id, "Row updated");
        Ok(())
    }

    pub async fn delete_row(&self, id: DbId) -> Result<(), ClientError> {
        self.execute(self.delete(&format!("/rows/{id}"))).await?;
        tracing::info!(row_id = id, "Row deleted");
        Ok(())
    }

    pub async fn set_row_active(&self, id: DbId, is_active: bool) -> Result<(), ClientError> {
        self.execute(self.patch(&format!("/rows/{id}"), &SetActiveBody { is_active }))
            .await?;
        tracing::info!(row_id = id, is_active, "Row activation changed");
        Ok(())
    }

    /// Bundles assigned to a row with their `bundle_order`.
    pub async fn row_bundles(&self, row_id: DbId) -> Result<Vec<RowBundle>, ClientError> {
        self.fetch_list(self.get(&format!("/rows/{row_id}/bundles")))
            .await
    }

    pub async fn assign_row_bundles(
        &self,
        row_id: DbId,
        request: &AssignBundlesRequest,
    ) -> Result<(), ClientError> {
        self.execute(self.post(&format!("/rows/{row_id}/bundles"), request))
            .await?;
        tracing::info!(
            row_id,
            count = request.bundle_assignments.len(),
            "Bundles assigned to row"
        );
        Ok(())
    }

    pub async fn reorder_row_bundles(
        &self,
        row_id: DbId,
        request: &ReorderBundlesRequest,
    ) -> Result<(), ClientError> {
        self.execute(self.put(&format!("/rows/{row_id}/bundles/reorder"), request))
            .await?;
        tracing::info!(row_id, "Row bundle order saved");
        Ok(())
    }

    pub async fn remove_row_bundle(
        &self,
        row_id: DbId,
        row_bundle_id: DbId,
    ) -> Result<(), ClientError> {
        self.execute(self.delete(&format!("/rows/{row_id}/bundles/{row_bundle_id}")))
            .await?;
        tracing::info!(row_id, row_bundle_id, "Bundle removed from row");
        Ok(())
    }
}
