//! Assigning bundles to a row and ordering them.
//!
//! The workflow holds the grade's bundles, the row's assignments and a
//! pending selection. Reordering is local until [`AssignmentWorkflow::save_order`];
//! a failed save, like a cancel, goes back to what the server has.

use async_trait::async_trait;

use eduadmin_core::bundle::Bundle;
use eduadmin_core::error::CoreError;
use eduadmin_core::form::Confirmation;
use eduadmin_core::ordering::{self, Direction, Reorderable};
use eduadmin_core::row::{AssignBundlesRequest, ReorderBundlesRequest, RowBundle};
use eduadmin_core::search::SearchQuery;
use eduadmin_core::types::{DbId, Guid};

use crate::api::ApiClient;
use crate::error::ClientError;

/// Page size used to list the bundles a row can pick from.
pub const AVAILABLE_BUNDLES_PAGE_SIZE: u32 = 100;

#[async_trait]
pub trait RowBundleBackend: Send + Sync {
    async fn available_bundles(&self, grade_id: DbId) -> Result<Vec<Bundle>, ClientError>;
    async fn assigned_bundles(&self, row_id: DbId) -> Result<Vec<RowBundle>, ClientError>;
    async fn assign_bundles(
        &self,
        row_id: DbId,
        request: &AssignBundlesRequest,
    ) -> Result<(), ClientError>;
    async fn reorder_bundles(
        &self,
        row_id: DbId,
        request: &ReorderBundlesRequest,
    ) -> Result<(), ClientError>;
    async fn remove_bundle(&self, row_id: DbId, row_bundle_id: DbId) -> Result<(), ClientError>;
}

#[async_trait]
impl RowBundleBackend for ApiClient {
    async fn available_bundles(&self, grade_id: DbId) -> Result<Vec<Bundle>, ClientError> {
        let query = SearchQuery::new(grade_id, 1, AVAILABLE_BUNDLES_PAGE_SIZE);
        Ok(self.search_bundles(&query).await?.items)
    }

    async fn assigned_bundles(&self, row_id: DbId) -> Result<Vec<RowBundle>, ClientError> {
        self.row_bundles(row_id).await
    }

    async fn assign_bundles(
        &self,
        row_id: DbId,
        request: &AssignBundlesRequest,
    ) -> Result<(), ClientError> {
        self.assign_row_bundles(row_id, request).await
    }

    async fn reorder_bundles(
        &self,
        row_id: DbId,
        request: &ReorderBundlesRequest,
    ) -> Result<(), ClientError> {
        self.reorder_row_bundles(row_id, request).await
    }

    async fn remove_bundle(&self, row_id: DbId, row_bundle_id: DbId) -> Result<(), ClientError> {
        self.remove_row_bundle(row_id, row_bundle_id).await
    }
}

pub struct AssignmentWorkflow<B> {
    backend: B,
    row_id: DbId,
    grade_id: DbId,
    bundles: Vec<Bundle>,
    assigned: Vec<RowBundle>,
    /// Last list received from the server.
    snapshot: Vec<RowBundle>,
    /// Selected bundle ids, in selection order.
    pending: Vec<Guid>,
    order_changed: bool,
    error: Option<String>,
}

impl<B: RowBundleBackend> AssignmentWorkflow<B> {
    pub fn new(backend: B, row_id: DbId, grade_id: DbId) -> Self {
        Self {
            backend,
            row_id,
            grade_id,
            bundles: Vec::new(),
            assigned: Vec::new(),
            snapshot: Vec::new(),
            pending: Vec::new(),
            order_changed: false,
            error: None,
        }
    }

    /// Build and load both lists in parallel.
    pub async fn open(backend: B, row_id: DbId, grade_id: DbId) -> Result<Self, ClientError> {
        let mut workflow = Self::new(backend, row_id, grade_id);
        workflow.load().await?;
        Ok(workflow)
    }

    pub async fn load(&mut self) -> Result<(), ClientError> {
        let (bundles, assigned) = tokio::join!(
            self.backend.available_bundles(self.grade_id),
            self.backend.assigned_bundles(self.row_id),
        );
        let result = bundles.and_then(|b| assigned.map(|a| (b, a)));
        match result {
            Ok((bundles, assigned)) => {
                self.bundles = bundles;
                self.set_assigned(assigned);
                self.error = None;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(row_id = self.row_id, error = %e, "Failed to load row bundles");
                self.error = Some(e.user_message("Failed to load bundles for this row"));
                Err(e)
            }
        }
    }

    pub fn row_id(&self) -> DbId {
        self.row_id
    }

    pub fn bundles(&self) -> &[Bundle] {
        &self.bundles
    }

    pub fn assigned(&self) -> &[RowBundle] {
        &self.assigned
    }

    pub fn pending(&self) -> &[Guid] {
        &self.pending
    }

    pub fn order_changed(&self) -> bool {
        self.order_changed
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_assigned(&self, bundle_id: Guid) -> bool {
        self.assigned.iter().any(|a| a.bundle_id == bundle_id)
    }

    /// Bundles of the grade not yet on the row.
    pub fn available(&self) -> impl Iterator<Item = &Bundle> {
        self.bundles.iter().filter(|b| !self.is_assigned(b.id))
    }

    // ---- selecting and assigning ----

    /// Flip a bundle in the pending selection. Returns whether it is now
    /// selected. Assigned bundles cannot be selected.
    pub fn toggle(&mut self, bundle_id: Guid) -> Result<bool, CoreError> {
        if self.is_assigned(bundle_id) {
            return Err(CoreError::Conflict(
                "This bundle is already assigned to the row".into(),
            ));
        }
        if !self.bundles.iter().any(|b| b.id == bundle_id) {
            return Err(CoreError::not_found("bundle", bundle_id));
        }
        if let Some(pos) = self.pending.iter().position(|id| *id == bundle_id) {
            self.pending.remove(pos);
            Ok(false)
        } else {
            self.pending.push(bundle_id);
            Ok(true)
        }
    }

    /// Send the pending selection as one batch ordered after the current
    /// maximum. The selection survives a failure for a retry.
    pub async fn assign(&mut self) -> Result<(), ClientError> {
        if self.pending.is_empty() {
            return Err(CoreError::Validation(
                "Please select at least one bundle to assign".into(),
            )
            .into());
        }
        let request = AssignBundlesRequest {
            bundle_assignments: ordering::next_assignments(&self.assigned, &self.pending),
        };
        if let Err(e) = self.backend.assign_bundles(self.row_id, &request).await {
            self.error = Some(e.user_message("Failed to assign bundles"));
            return Err(e);
        }
        self.pending.clear();
        self.reload_assigned().await
    }

    // ---- ordering ----

    /// Move one assignment and renumber the list. Out-of-bounds moves do
    /// nothing and return `false`.
    pub fn move_item(&mut self, index: usize, direction: Direction) -> bool {
        if !ordering::move_item(&mut self.assigned, index, direction) {
            return false;
        }
        ordering::renumber(&mut self.assigned);
        self.order_changed = true;
        true
    }

    /// Persist the full order. On failure the server's order is reloaded.
    pub async fn save_order(&mut self) -> Result<(), ClientError> {
        if !self.order_changed {
            return Ok(());
        }
        let request = ReorderBundlesRequest {
            bundle_orders: ordering::reorder_payload(&self.assigned)?,
        };
        match self.backend.reorder_bundles(self.row_id, &request).await {
            Ok(()) => {
                self.order_changed = false;
                self.snapshot = self.assigned.clone();
                self.error = None;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(row_id = self.row_id, error = %e, "Saving bundle order failed, reverting");
                self.revert().await;
                self.error = Some(e.user_message("Failed to save bundle order"));
                Err(e)
            }
        }
    }

    /// Discard local reordering without saving.
    pub async fn cancel_order_changes(&mut self) {
        self.revert().await;
    }

    // ---- removal ----

    pub fn request_remove(&self, bundle_id: Guid) -> Result<Confirmation<DbId>, CoreError> {
        let assignment = self
            .assigned
            .iter()
            .find(|a| a.bundle_id == bundle_id)
            .ok_or_else(|| CoreError::not_found("row bundle", bundle_id))?;
        let name = assignment
            .name_en
            .as_deref()
            .or(assignment.name.as_deref())
            .unwrap_or("this bundle");
        Ok(Confirmation::new(
            format!("Remove '{name}' from this row?"),
            assignment.assignment_id()?,
        ))
    }

    pub async fn remove(&mut self, confirmation: Confirmation<DbId>) -> Result<(), ClientError> {
        let row_bundle_id = confirmation.confirm();
        if let Err(e) = self.backend.remove_bundle(self.row_id, row_bundle_id).await {
            self.error = Some(e.user_message("Failed to remove bundle from row"));
            return Err(e);
        }
        self.reload_assigned().await
    }

    // ---- helpers ----

    fn set_assigned(&mut self, mut assigned: Vec<RowBundle>) {
        assigned.sort_by_key(|a| a.bundle_order);
        self.snapshot = assigned.clone();
        self.assigned = assigned;
        self.order_changed = false;
    }

    async fn reload_assigned(&mut self) -> Result<(), ClientError> {
        match self.backend.assigned_bundles(self.row_id).await {
            Ok(assigned) => {
                self.set_assigned(assigned);
                self.error = None;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.user_message("Failed to load bundles for this row"));
                Err(e)
            }
        }
    }

    /// Back to server truth; the last snapshot stands in if the reload fails.
    async fn revert(&mut self) {
        if let Err(e) = self.reload_assigned().await {
            tracing::warn!(row_id = self.row_id, error = %e, "Reload failed, restoring last known order");
            self.assigned = self.snapshot.clone();
        }
        self.order_changed = false;
    }
}
