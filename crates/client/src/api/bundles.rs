//! `/bundles` endpoints.

use eduadmin_core::bundle::{Bundle, BundlePayload};
use eduadmin_core::search::{Page, SearchQuery};
use eduadmin_core::types::Guid;
use eduadmin_core::voucher::{GenerateVouchers, Voucher};

use super::{ApiClient, SetActiveBody};
use crate::error::ClientError;

impl ApiClient {
    pub async fn search_bundles(&self, query: &SearchQuery) -> Result<Page<Bundle>, ClientError> {
        self.fetch_page(self.post("/bundles/search", query), query)
            .await
    }

    /// Bundle detail including its subject services.
    pub async fn bundle(&self, id: Guid) -> Result<Bundle, ClientError> {
        self.fetch_required(self.get(&format!("/bundles/{id}"))).await
    }

    pub async fn create_bundle(&self, payload: &BundlePayload) -> Result<(), ClientError> {
        self.execute(self.post("/bundles", payload)).await?;
        tracing::info!(name = %payload.name, "Bundle created");
        Ok(())
    }

    pub async fn update_bundle(&self, id: Guid, payload: &BundlePayload) -> Result<(), ClientError> {
        self.execute(self.put(&format!("/bundles/{id}"), payload))
            .await?;
        tracing::info!(bundle_id = %id, "Bundle updated");
        Ok(())
    }

    pub async fn delete_bundle(&self, id: Guid) -> Result<(), ClientError> {
        self.execute(self.delete(&format!("/bundles/{id}"))).await?;
        tracing::info!(bundle_id = %id, "Bundle deleted");
        Ok(())
    }

    pub async fn set_bundle_active(&self, id: Guid, is_active: bool) -> Result<(), ClientError> {
        self.execute(self.patch(&format!("/bundles/{id}"), &SetActiveBody { is_active }))
            .await?;
        tracing::info!(bundle_id = %id, is_active, "Bundle activation changed");
        Ok(())
    }

    pub async fn bundle_vouchers(&self, id: Guid) -> Result<Vec<Voucher>, ClientError> {
        self.fetch_list(self.get(&format!("/bundles/{id}/vouchers")))
            .await
    }

    pub async fn generate_vouchers(
        &self,
        id: Guid,
        request: &GenerateVouchers,
    ) -> Result<(), ClientError> {
        self.execute(self.post(&format!("/bundles/{id}/vouchers"), request))
            .await?;
        tracing::info!(bundle_id = %id, count = request.count, "Vouchers generated");
        Ok(())
    }
}
