//! Vouchers screen.
//!
//! Needs a selected grade. The grade's bundles are loaded first and every
//! voucher page is joined with them for display names. Unlike bundles
//! and rows, statistics come from the server so they cover the whole
//! filtered set rather than the visible page.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use eduadmin_core::bundle::Bundle;
use eduadmin_core::error::CoreError;
use eduadmin_core::export;
use eduadmin_core::form::Confirmation;
use eduadmin_core::search::{Page, SearchQuery};
use eduadmin_core::types::Guid;
use eduadmin_core::voucher::{
    self, BulkSetActive, ExportVouchersRequest, StatsSource, Voucher, VoucherRow, VoucherStats,
    VoucherStatus,
};

use crate::api::ApiClient;
use crate::collection::{Collection, CollectionBackend, CollectionOptions};
use crate::error::ClientError;
use crate::scope::GradeWatch;

/// Page size used to list the bundles of the grade.
const BUNDLE_LIST_PAGE_SIZE: u32 = 1000;

pub struct VoucherBackend {
    api: ApiClient,
    bundles: Vec<Bundle>,
}

#[async_trait]
impl CollectionBackend for VoucherBackend {
    type Item = VoucherRow;
    type Id = Guid;
    const ENTITY: &'static str = "voucher";

    fn id_of(item: &VoucherRow) -> Guid {
        item.voucher.id
    }

    fn is_active(item: &VoucherRow) -> bool {
        item.voucher.is_active
    }

    fn label(item: &VoucherRow) -> String {
        item.voucher.code.clone()
    }

    fn check_toggle(item: &VoucherRow) -> Result<(), CoreError> {
        item.voucher.ensure_mutable()
    }

    async fn search(&self, query: &SearchQuery) -> Result<Page<VoucherRow>, ClientError> {
        let page = self.api.search_vouchers(query).await?;
        Ok(Page {
            items: voucher::enrich(page.items, &self.bundles),
            pagination: page.pagination,
        })
    }

    async fn set_active(&self, id: Guid, is_active: bool) -> Result<(), ClientError> {
        self.api.set_voucher_active(id, is_active).await
    }
}

/// Bulk operations on the unused vouchers of one bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedAction {
    Deactivate,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnusedRequest {
    pub action: UnusedAction,
    pub bundle_id: Guid,
}

pub struct VouchersScreen {
    api: ApiClient,
    grade: GradeWatch,
    collection: Collection<VoucherBackend>,
    selected_bundle: Option<Guid>,
    status: Option<VoucherStatus>,
    stats: VoucherStats,
    selection: BTreeSet<Guid>,
}

impl VouchersScreen {
    pub fn new(api: ApiClient, options: CollectionOptions) -> Self {
        let grade = api.session().scope().watch_grade();
        let collection = Collection::new(
            VoucherBackend {
                api: api.clone(),
                bundles: Vec::new(),
            },
            CollectionOptions {
                scope_required: true,
                ..options
            },
        );
        Self {
            api,
            grade,
            collection,
            selected_bundle: None,
            status: None,
            stats: VoucherStats::default(),
            selection: BTreeSet::new(),
        }
    }

    pub fn collection(&self) -> &Collection<VoucherBackend> {
        &self.collection
    }

    pub fn collection_mut(&mut self) -> &mut Collection<VoucherBackend> {
        &mut self.collection
    }

    pub fn bundles(&self) -> &[Bundle] {
        &self.collection.backend().bundles
    }

    pub fn selected_bundle(&self) -> Option<Guid> {
        self.selected_bundle
    }

    pub fn status_filter(&self) -> Option<VoucherStatus> {
        self.status
    }

    pub fn stats(&self) -> VoucherStats {
        self.stats
    }

    // ---- loading ----

    /// Load bundles, the first page and the stats for the current grade.
    pub async fn open(&mut self) -> Result<(), ClientError> {
        self.reload_for_grade().await
    }

    /// Reload everything when the scope's grade changed.
    pub async fn sync_scope(&mut self) -> Result<bool, ClientError> {
        if self.grade.poll().is_none() {
            return Ok(false);
        }
        self.selected_bundle = None;
        self.collection.set_fixed("bundleId", None);
        self.selection.clear();
        self.reload_for_grade().await?;
        Ok(true)
    }

    async fn reload_for_grade(&mut self) -> Result<(), ClientError> {
        let grade_id = self.grade.grade_id();
        self.collection.set_grade(grade_id);

        let Some(grade_id) = grade_id else {
            self.clear();
            return Ok(());
        };

        let query = SearchQuery::new(grade_id, 1, BUNDLE_LIST_PAGE_SIZE);
        match self.api.search_bundles(&query).await {
            Ok(page) => self.collection.backend_mut().bundles = page.items,
            Err(e) => {
                tracing::warn!(grade_id, error = %e, "Failed to load bundles");
                self.clear();
                self.collection.set_error(e.user_message("Failed to load bundles"));
                return Err(e);
            }
        }
        self.reload().await
    }

    /// Forget the bundles, the page and the stats of the previous grade.
    fn clear(&mut self) {
        self.collection.backend_mut().bundles.clear();
        self.collection.clear_items();
        self.stats = VoucherStats::default();
    }

    /// Refetch the page and the stats. A grade without bundles shows an
    /// empty page and zero stats without fetching.
    pub async fn reload(&mut self) -> Result<(), ClientError> {
        if self.bundles().is_empty() {
            self.collection.clear_items();
            self.stats = VoucherStats::default();
            return Ok(());
        }
        self.collection.refresh().await?;
        self.refresh_stats().await;
        Ok(())
    }

    /// Stats failures keep the previous counts.
    pub async fn refresh_stats(&mut self) {
        let source = StatsSource::select(self.grade.grade_id(), self.selected_bundle);
        match self.api.voucher_stats(source).await {
            Ok(stats) => self.stats = stats,
            Err(e) => tracing::warn!(source = ?source, error = %e, "Failed to load voucher stats"),
        }
    }

    // ---- sidebar filters ----

    pub async fn select_bundle(&mut self, bundle_id: Option<Guid>) -> Result<(), ClientError> {
        if let Some(id) = bundle_id {
            if !self.bundles().iter().any(|b| b.id == id) {
                return Err(CoreError::not_found("bundle", id).into());
            }
        }
        self.selected_bundle = bundle_id;
        self.collection
            .set_fixed("bundleId", bundle_id.map(|id| Value::String(id.to_string())));
        self.selection.clear();
        self.reload().await
    }

    /// Sidebar status filter; a `status` column filter takes precedence.
    pub async fn filter_status(&mut self, status: Option<VoucherStatus>) -> Result<(), ClientError> {
        self.status = status;
        self.collection
            .set_fixed("status", status.map(|s| Value::String(s.as_str().to_string())));
        self.reload().await
    }

    // ---- single actions ----

    pub async fn toggle_active(&mut self, id: Guid) -> Result<bool, ClientError> {
        let is_active = self.collection.toggle_active(id).await?;
        self.refresh_stats().await;
        Ok(is_active)
    }

    /// Look up a voucher by its code.
    pub async fn lookup(&self, code: &str) -> Result<Voucher, ClientError> {
        self.api.voucher_by_code(code.trim()).await
    }

    // ---- bulk actions ----

    pub fn selection(&self) -> &BTreeSet<Guid> {
        &self.selection
    }

    /// Flip a loaded voucher in the bulk selection. Returns whether it is
    /// now selected.
    pub fn toggle_selection(&mut self, id: Guid) -> Result<bool, CoreError> {
        if self.collection.find(id).is_none() {
            return Err(CoreError::not_found("voucher", id));
        }
        if self.selection.remove(&id) {
            Ok(false)
        } else {
            self.selection.insert(id);
            Ok(true)
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn request_bulk_set_active(
        &self,
        is_active: bool,
    ) -> Result<Confirmation<BulkSetActive>, CoreError> {
        let request = BulkSetActive::new(self.selection.iter().copied().collect(), is_active)?;
        let verb = if is_active { "Activate" } else { "Deactivate" };
        Ok(Confirmation::new(
            format!("{verb} {} selected voucher(s)?", request.voucher_ids.len()),
            request,
        ))
    }

    pub async fn bulk_set_active(
        &mut self,
        confirmation: Confirmation<BulkSetActive>,
    ) -> Result<(), ClientError> {
        let request = confirmation.confirm();
        if let Err(e) = self.api.bulk_set_vouchers_active(&request).await {
            self.collection
                .set_error(e.user_message("Failed to update vouchers"));
            return Err(e);
        }
        self.selection.clear();
        self.reload().await
    }

    /// Ask before touching every unused voucher of the selected bundle.
    pub fn request_unused(&self, action: UnusedAction) -> Result<Confirmation<UnusedRequest>, CoreError> {
        let bundle_id = self.selected_bundle.ok_or_else(|| {
            CoreError::Validation("Select a bundle first".to_string())
        })?;
        let name = self
            .bundles()
            .iter()
            .find(|b| b.id == bundle_id)
            .map(|b| b.display_name().to_string())
            .unwrap_or_else(|| bundle_id.to_string());
        let prompt = match action {
            UnusedAction::Deactivate => {
                format!("Deactivate all unused vouchers of '{name}'?")
            }
            UnusedAction::Delete => format!(
                "Delete all unused vouchers of '{name}'? This action cannot be undone."
            ),
        };
        Ok(Confirmation::new(prompt, UnusedRequest { action, bundle_id }))
    }

    pub async fn run_unused(
        &mut self,
        confirmation: Confirmation<UnusedRequest>,
    ) -> Result<(), ClientError> {
        let UnusedRequest { action, bundle_id } = confirmation.confirm();
        let result = match action {
            UnusedAction::Deactivate => self.api.deactivate_unused_vouchers(bundle_id).await,
            UnusedAction::Delete => self.api.delete_unused_vouchers(bundle_id).await,
        };
        if let Err(e) = result {
            self.collection
                .set_error(e.user_message("Failed to update unused vouchers"));
            return Err(e);
        }
        self.reload().await
    }

    // ---- export ----

    /// Server-side spreadsheet of the grade, or of the selected bundle.
    /// Returns the default file name with the bytes.
    pub async fn export(&self, today: NaiveDate) -> Result<(String, Vec<u8>), ClientError> {
        let grade_id = self.grade.grade_id().ok_or_else(|| {
            CoreError::Validation("Select a grade before exporting vouchers".to_string())
        })?;
        let request = ExportVouchersRequest::for_selection(grade_id, self.selected_bundle);
        let bytes = self.api.export_vouchers(&request).await?;
        Ok((export::export_file_name(self.selected_bundle, today), bytes))
    }

    /// CSV of the vouchers on the current page.
    pub fn page_csv(&self, today: NaiveDate) -> Result<(String, Vec<u8>), CoreError> {
        let bytes = export::voucher_page_csv(self.collection.items())?;
        Ok((
            export::page_csv_file_name(self.collection.page(), today),
            bytes,
        ))
    }
}
