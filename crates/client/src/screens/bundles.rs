//! Bundles screen: list, stats, create/edit forms, voucher generation.

use async_trait::async_trait;

use eduadmin_core::bundle::{Bundle, BundleForm};
use eduadmin_core::error::CoreError;
use eduadmin_core::form::Confirmation;
use eduadmin_core::search::{Page, SearchQuery};
use eduadmin_core::stats::{self, BundleStats};
use eduadmin_core::types::Guid;
use eduadmin_core::voucher::{GenerateVouchers, Voucher, DEFAULT_GENERATE_COUNT};

use crate::api::ApiClient;
use crate::collection::{Collection, CollectionBackend, CollectionOptions};
use crate::error::ClientError;
use crate::scope::GradeWatch;

pub struct BundleBackend {
    api: ApiClient,
}

#[async_trait]
impl CollectionBackend for BundleBackend {
    type Item = Bundle;
    type Id = Guid;
    const ENTITY: &'static str = "bundle";

    fn id_of(item: &Bundle) -> Guid {
        item.id
    }

    fn is_active(item: &Bundle) -> bool {
        item.is_active
    }

    fn label(item: &Bundle) -> String {
        item.display_name().to_string()
    }

    fn check_edit(item: &Bundle) -> Result<(), CoreError> {
        item.ensure_mutable()
    }

    fn check_delete(item: &Bundle) -> Result<(), CoreError> {
        item.ensure_mutable()
    }

    async fn search(&self, query: &SearchQuery) -> Result<Page<Bundle>, ClientError> {
        self.api.search_bundles(query).await
    }

    async fn set_active(&self, id: Guid, is_active: bool) -> Result<(), ClientError> {
        self.api.set_bundle_active(id, is_active).await
    }

    async fn delete(&self, id: Guid) -> Result<(), ClientError> {
        self.api.delete_bundle(id).await
    }
}

pub struct BundlesScreen {
    api: ApiClient,
    grade: GradeWatch,
    collection: Collection<BundleBackend>,
}

impl BundlesScreen {
    /// Searches with `gradeId: 0` while no scope is selected.
    pub fn new(api: ApiClient, options: CollectionOptions) -> Self {
        let grade = api.session().scope().watch_grade();
        let collection = Collection::new(
            BundleBackend { api: api.clone() },
            CollectionOptions {
                scope_required: false,
                ..options
            },
        );
        Self {
            api,
            grade,
            collection,
        }
    }

    pub fn collection(&self) -> &Collection<BundleBackend> {
        &self.collection
    }

    pub fn collection_mut(&mut self) -> &mut Collection<BundleBackend> {
        &mut self.collection
    }

    pub async fn open(&mut self) -> Result<(), ClientError> {
        super::load_for_grade(&self.grade, &mut self.collection).await
    }

    pub async fn sync_scope(&mut self) -> Result<bool, ClientError> {
        super::follow_grade(&mut self.grade, &mut self.collection).await
    }

    /// Counts and total discounted value of the loaded bundles.
    pub fn stats(&self) -> BundleStats {
        stats::bundle_stats(self.collection.items())
    }

    /// Full bundle including its subject services.
    pub async fn detail(&self, id: Guid) -> Result<Bundle, ClientError> {
        self.api.bundle(id).await
    }

    /// Prefilled edit form. Active bundles are refused.
    pub async fn begin_edit(&self, id: Guid) -> Result<BundleForm, ClientError> {
        self.collection.ensure_editable(id)?;
        let detail = self.api.bundle(id).await?;
        Ok(BundleForm::from_bundle(&detail))
    }

    /// Validate and submit a new bundle. Nothing is sent when the form
    /// has errors.
    pub async fn create(&mut self, form: &BundleForm) -> Result<(), ClientError> {
        let payload = form.to_create_payload()?;
        if let Err(e) = self.api.create_bundle(&payload).await {
            self.collection
                .set_error(e.user_message("Failed to create bundle"));
            return Err(e);
        }
        self.collection.refresh().await
    }

    pub async fn update(&mut self, id: Guid, form: &BundleForm) -> Result<(), ClientError> {
        self.collection.ensure_editable(id)?;
        let payload = form.to_update_payload()?;
        if let Err(e) = self.api.update_bundle(id, &payload).await {
            self.collection
                .set_error(e.user_message("Failed to update bundle"));
            return Err(e);
        }
        self.collection.refresh().await
    }

    pub async fn toggle_active(&mut self, id: Guid) -> Result<bool, ClientError> {
        self.collection.toggle_active(id).await
    }

    pub fn request_delete(&self, id: Guid) -> Result<Confirmation<Guid>, CoreError> {
        self.collection.request_delete(id)
    }

    pub async fn delete(&mut self, confirmation: Confirmation<Guid>) -> Result<(), ClientError> {
        self.collection.delete(confirmation).await
    }

    /// Generate `count` vouchers (10 when unspecified) for a bundle.
    pub async fn generate_vouchers(&self, id: Guid, count: Option<u32>) -> Result<(), ClientError> {
        let request = GenerateVouchers::new(count.unwrap_or(DEFAULT_GENERATE_COUNT))?;
        self.api.generate_vouchers(id, &request).await
    }

    pub async fn vouchers(&self, id: Guid) -> Result<Vec<Voucher>, ClientError> {
        self.api.bundle_vouchers(id).await
    }
}
