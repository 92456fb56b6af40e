//! Rows screen: list, forms, and the bundle assignment panel.

use async_trait::async_trait;

use eduadmin_core::error::CoreError;
use eduadmin_core::form::Confirmation;
use eduadmin_core::row::{Row, RowForm};
use eduadmin_core::search::{Page, SearchQuery};
use eduadmin_core::stats::{self, ActivationStats};
use eduadmin_core::types::DbId;

use crate::api::ApiClient;
use crate::assignment::AssignmentWorkflow;
use crate::collection::{Collection, CollectionBackend, CollectionOptions};
use crate::error::ClientError;
use crate::scope::GradeWatch;

pub struct RowBackend {
    api: ApiClient,
}

#[async_trait]
impl CollectionBackend for RowBackend {
    type Item = Row;
    type Id = DbId;
    const ENTITY: &'static str = "row";

    fn id_of(item: &Row) -> DbId {
        item.id
    }

    fn is_active(item: &Row) -> bool {
        item.is_active
    }

    fn label(item: &Row) -> String {
        item.display_name().to_string()
    }

    fn check_edit(item: &Row) -> Result<(), CoreError> {
        item.ensure_mutable()
    }

    async fn search(&self, query: &SearchQuery) -> Result<Page<Row>, ClientError> {
        self.api.search_rows(query).await
    }

    async fn set_active(&self, id: DbId, is_active: bool) -> Result<(), ClientError> {
        self.api.set_row_active(id, is_active).await
    }

    async fn delete(&self, id: DbId) -> Result<(), ClientError> {
        self.api.delete_row(id).await
    }
}

pub struct RowsScreen {
    api: ApiClient,
    grade: GradeWatch,
    collection: Collection<RowBackend>,
}

impl RowsScreen {
    pub fn new(api: ApiClient, options: CollectionOptions) -> Self {
        let grade = api.session().scope().watch_grade();
        let collection = Collection::new(
            RowBackend { api: api.clone() },
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

    pub fn collection(&self) -> &Collection<RowBackend> {
        &self.collection
    }

    pub fn collection_mut(&mut self) -> &mut Collection<RowBackend> {
        &mut self.collection
    }

    pub async fn open(&mut self) -> Result<(), ClientError> {
        super::load_for_grade(&self.grade, &mut self.collection).await
    }

    pub async fn sync_scope(&mut self) -> Result<bool, ClientError> {
        super::follow_grade(&mut self.grade, &mut self.collection).await
    }

    pub fn stats(&self) -> ActivationStats {
        stats::row_stats(self.collection.items())
    }

    pub async fn create(&mut self, form: &RowForm) -> Result<(), ClientError> {
        let payload = form.to_payload()?;
        if let Err(e) = self.api.create_row(&payload).await {
            self.collection.set_error(e.user_message("Failed to create row"));
            return Err(e);
        }
        self.collection.refresh().await
    }

    /// Prefilled edit form. Active rows are refused.
    pub fn begin_edit(&self, id: DbId) -> Result<RowForm, CoreError> {
        let row = self.collection.ensure_editable(id)?;
        Ok(RowForm::from_row(row))
    }

    pub async fn update(&mut self, id: DbId, form: &RowForm) -> Result<(), ClientError> {
        self.collection.ensure_editable(id)?;
        let payload = form.to_payload()?;
        if let Err(e) = self.api.update_row(id, &payload).await {
            self.collection.set_error(e.user_message("Failed to update row"));
            return Err(e);
        }
        self.collection.refresh().await
    }

    pub async fn toggle_active(&mut self, id: DbId) -> Result<bool, ClientError> {
        self.collection.toggle_active(id).await
    }

    pub fn request_delete(&self, id: DbId) -> Result<Confirmation<DbId>, CoreError> {
        self.collection.request_delete(id)
    }

    pub async fn delete(&mut self, confirmation: Confirmation<DbId>) -> Result<(), ClientError> {
        self.collection.delete(confirmation).await
    }

    /// Open the bundle panel of a row, listing the current grade's bundles.
    pub async fn open_assignment(
        &self,
        row_id: DbId,
    ) -> Result<AssignmentWorkflow<ApiClient>, ClientError> {
        // Current scope, even if this screen has not synced to it yet.
        let grade_id = self.api.session().scope().grade_id().unwrap_or(0);
        AssignmentWorkflow::open(self.api.clone(), row_id, grade_id).await
    }
}
