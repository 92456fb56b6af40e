//! `/vouchers` endpoints.

use serde::Deserialize;

use eduadmin_core::search::{Page, Pagination, SearchQuery};
use eduadmin_core::types::Guid;
use eduadmin_core::voucher::{
    BulkSetActive, BundleVouchersRequest, ExportVouchersRequest, StatsSource, Voucher,
    VoucherStats,
};

use super::ApiClient;
use crate::error::ClientError;

/// `data` of `POST /vouchers/search`.
#[derive(Debug, Default, Deserialize)]
struct VoucherSearchData {
    #[serde(default)]
    vouchers: Vec<Voucher>,
    #[serde(default)]
    pagination: Pagination,
}

impl ApiClient {
    pub async fn search_vouchers(&self, query: &SearchQuery) -> Result<Page<Voucher>, ClientError> {
        let data: VoucherSearchData = self
            .fetch(self.post("/vouchers/search", query))
            .await?
            .unwrap_or_default();
        Ok(Page {
            items: data.vouchers,
            pagination: data.pagination.or_request(query.page, query.page_size),
        })
    }

    /// Look up (and thereby validate) a voucher by its code.
    pub async fn voucher_by_code(&self, code: &str) -> Result<Voucher, ClientError> {
        self.fetch_required(self.get(&format!("/vouchers/{code}")))
            .await
    }

    /// Aggregated counts; zero without a scope, no request made.
    pub async fn voucher_stats(&self, source: StatsSource) -> Result<VoucherStats, ClientError> {
        let path = match source {
            StatsSource::None => return Ok(VoucherStats::default()),
            StatsSource::Bundle(id) => format!("/vouchers/stats/bundle/{id}"),
            StatsSource::Grade(id) => format!("/vouchers/stats/grade/{id}"),
        };
        Ok(self.fetch(self.get(&path)).await?.unwrap_or_default())
    }

    pub async fn set_voucher_active(&self, id: Guid, is_active: bool) -> Result<(), ClientError> {
        self.execute(
            self.request(reqwest::Method::PATCH, &format!("/vouchers/{id}/set-active"))
                .query(&[("isActive", is_active)]),
        )
        .await?;
        tracing::info!(voucher_id = %id, is_active, "Voucher activation changed");
        Ok(())
    }

    pub async fn bulk_set_vouchers_active(&self, request: &BulkSetActive) -> Result<(), ClientError> {
        self.execute(self.post("/vouchers/bulk/set-active", request))
            .await?;
        tracing::info!(
            count = request.voucher_ids.len(),
            is_active = request.is_active,
            "Voucher activation changed in bulk"
        );
        Ok(())
    }

    pub async fn deactivate_unused_vouchers(&self, bundle_id: Guid) -> Result<(), ClientError> {
        self.execute(self.post(
            "/vouchers/bulk/deactivate-unused",
            &BundleVouchersRequest { bundle_id },
        ))
        .await?;
        tracing::info!(bundle_id = %bundle_id, "Unused vouchers deactivated");
        Ok(())
    }

    pub async fn delete_unused_vouchers(&self, bundle_id: Guid) -> Result<(), ClientError> {
        self.execute(self.post(
            "/vouchers/bulk/delete-unused",
            &BundleVouchersRequest { bundle_id },
        ))
        .await?;
        tracing::info!(bundle_id = %bundle_id, "Unused vouchers deleted");
        Ok(())
    }

    /// Server-side spreadsheet export; the body is passed through untouched.
    pub async fn export_vouchers(&self, request: &ExportVouchersRequest) -> Result<Vec<u8>, ClientError> {
        let response = self.send(self.post("/vouchers/export", request)).await?;
        let bytes = response.bytes().await?;
        tracing::info!(grade_id = request.grade_id, bytes = bytes.len(), "Vouchers exported");
        Ok(bytes.to_vec())
    }
}
