//! A searchable, paginated, server-filtered collection.
//!
//! Shared by the bundle, row and voucher screens. The collection owns the
//! loaded page, the active server filters and the last error; an entity
//! plugs in through [`CollectionBackend`].
//!
//! Writes never patch local state: the backend call is awaited and the
//! whole page is fetched again. Every fetch is issued a sequence number
//! and only the response to the most recent one is applied.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use eduadmin_core::error::CoreError;
use eduadmin_core::form::Confirmation;
use eduadmin_core::search::{ColumnFilters, NumberFilterType, Page, Pagination, SearchQuery};
use eduadmin_core::types::DbId;

use crate::debounce::Debouncer;
use crate::error::ClientError;

#[async_trait]
pub trait CollectionBackend: Send + Sync {
    type Item: Clone + Send + Sync;
    type Id: Copy + PartialEq + Display + Send + Sync;

    /// Singular, lower-case entity name used in messages.
    const ENTITY: &'static str;

    fn id_of(item: &Self::Item) -> Self::Id;
    fn is_active(item: &Self::Item) -> bool;
    fn label(item: &Self::Item) -> String;

    /// Active items are read-only until deactivated.
    fn check_edit(item: &Self::Item) -> Result<(), CoreError> {
        if Self::is_active(item) {
            return Err(CoreError::Conflict(format!(
                "Deactivate {} '{}' before editing it",
                Self::ENTITY,
                Self::label(item)
            )));
        }
        Ok(())
    }

    fn check_delete(_item: &Self::Item) -> Result<(), CoreError> {
        Ok(())
    }

    fn check_toggle(_item: &Self::Item) -> Result<(), CoreError> {
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<Page<Self::Item>, ClientError>;

    async fn set_active(&self, id: Self::Id, is_active: bool) -> Result<(), ClientError>;

    async fn delete(&self, _id: Self::Id) -> Result<(), ClientError> {
        Err(CoreError::Forbidden(format!("{} records cannot be deleted", Self::ENTITY)).into())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CollectionOptions {
    pub page_size: u32,
    pub debounce: Duration,
    /// Without a grade, skip fetching instead of searching with `gradeId: 0`.
    pub scope_required: bool,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            page_size: crate::config::DEFAULT_PAGE_SIZE,
            debounce: Duration::from_millis(crate::config::DEFAULT_FILTER_DEBOUNCE_MS),
            scope_required: false,
        }
    }
}

/// An issued fetch. Apply its outcome with [`Collection::complete_fetch`].
#[derive(Debug, Clone)]
pub struct FetchTicket {
    seq: u64,
    query: SearchQuery,
}

impl FetchTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }
}

pub struct Collection<B: CollectionBackend> {
    backend: B,
    options: CollectionOptions,
    grade_id: Option<DbId>,
    page: u32,
    server_filters: ColumnFilters,
    draft_filters: ColumnFilters,
    debouncer: Debouncer<ColumnFilters>,
    fixed: BTreeMap<String, Value>,
    items: Vec<B::Item>,
    pagination: Pagination,
    error: Option<String>,
    loading: bool,
    issued: u64,
}

impl<B: CollectionBackend> Collection<B> {
    pub fn new(backend: B, options: CollectionOptions) -> Self {
        Self {
            backend,
            options,
            grade_id: None,
            page: 1,
            server_filters: ColumnFilters::new(),
            draft_filters: ColumnFilters::new(),
            debouncer: Debouncer::new(options.debounce),
            fixed: BTreeMap::new(),
            items: Vec::new(),
            pagination: Pagination::default(),
            error: None,
            loading: false,
            issued: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn items(&self) -> &[B::Item] {
        &self.items
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn grade_id(&self) -> Option<DbId> {
        self.grade_id
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.options.page_size
    }

    pub fn server_filters(&self) -> &ColumnFilters {
        &self.server_filters
    }

    pub fn find(&self, id: B::Id) -> Option<&B::Item> {
        self.items.iter().find(|item| B::id_of(item) == id)
    }

    fn require(&self, id: B::Id) -> Result<&B::Item, CoreError> {
        self.find(id).ok_or_else(|| CoreError::not_found(B::ENTITY, id))
    }

    // ---- query state ----

    /// Returns `true` when the grade actually changed.
    pub fn set_grade(&mut self, grade_id: Option<DbId>) -> bool {
        if self.grade_id == grade_id {
            return false;
        }
        self.grade_id = grade_id;
        self.page = 1;
        if grade_id.is_none() && self.options.scope_required {
            self.items.clear();
            self.pagination = Pagination::default();
        }
        true
    }

    /// Set a screen-level key merged into every search unless a column
    /// filter supplies the same key.
    pub fn set_fixed(&mut self, key: &str, value: Option<Value>) -> bool {
        let changed = match &value {
            Some(v) => self.fixed.get(key) != Some(v),
            None => self.fixed.contains_key(key),
        };
        match value {
            Some(v) => {
                self.fixed.insert(key.to_string(), v);
            }
            None => {
                self.fixed.remove(key);
            }
        }
        if changed {
            self.page = 1;
        }
        changed
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    /// Drop the loaded page without fetching. Any fetch in flight is
    /// superseded.
    pub fn clear_items(&mut self) {
        self.issued += 1;
        self.loading = false;
        self.items.clear();
        self.pagination = Pagination::default();
    }

    // ---- fetching ----

    /// Issue a fetch for the current query, or `None` when a scope is
    /// required and absent.
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        if self.options.scope_required && self.grade_id.is_none() {
            return None;
        }
        self.issued += 1;
        self.loading = true;

        let mut query = SearchQuery::new(
            self.grade_id.unwrap_or(0),
            self.page,
            self.options.page_size,
        )
        .with_filters(&self.server_filters);
        for (key, value) in &self.fixed {
            query = query.with_default(key, Some(value.clone()));
        }

        Some(FetchTicket {
            seq: self.issued,
            query,
        })
    }

    /// Apply a fetch outcome.
    ///
    /// `Ok(false)`: the ticket was superseded and the outcome dropped.
    /// On failure the message is stored, the loaded items stay as they
    /// were, and the error is handed back.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Page<B::Item>, ClientError>,
    ) -> Result<bool, ClientError> {
        if ticket.seq != self.issued {
            tracing::debug!(
                entity = B::ENTITY,
                seq = ticket.seq,
                latest = self.issued,
                "Dropping superseded response"
            );
            return Ok(false);
        }
        self.loading = false;
        match result {
            Ok(page) => {
                self.items = page.items;
                self.pagination = page.pagination;
                self.error = None;
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(entity = B::ENTITY, error = %e, "Failed to load collection");
                self.error = Some(e.user_message(&format!(
                    "Failed to load {}s. Please try again.",
                    B::ENTITY
                )));
                Err(e)
            }
        }
    }

    /// Fetch the current query and apply the result.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        let Some(ticket) = self.begin_fetch() else {
            return Ok(());
        };
        let result = self.backend.search(ticket.query()).await;
        self.complete_fetch(ticket, result)?;
        Ok(())
    }

    // ---- column filters ----

    /// Edit a text column filter; sent after the debounce window.
    pub fn edit_filter(&mut self, key: &'static str, value: &str) {
        self.draft_filters.set_text(key, value);
        self.debouncer.push(self.draft_filters.clone());
    }

    pub fn edit_number_filter(
        &mut self,
        key: &'static str,
        value: Option<f64>,
        kind: Option<NumberFilterType>,
    ) {
        match value {
            Some(v) => self.draft_filters.set_number(key, v, kind),
            None => self.draft_filters.clear(key),
        }
        self.debouncer.push(self.draft_filters.clone());
    }

    pub fn has_pending_filters(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Apply debounced filters if their quiet period is over.
    pub async fn poll_filters(&mut self) -> Result<bool, ClientError> {
        match self.debouncer.take_ready() {
            Some(filters) => self.apply_filters(filters).await,
            None => Ok(false),
        }
    }

    /// Wait for the debounce window and apply the pending filters.
    pub async fn settle_filters(&mut self) -> Result<bool, ClientError> {
        match self.debouncer.settled().await {
            Some(filters) => self.apply_filters(filters).await,
            None => Ok(false),
        }
    }

    /// Replace the server filters right away, bypassing the debounce.
    pub async fn apply_filters(&mut self, filters: ColumnFilters) -> Result<bool, ClientError> {
        self.draft_filters = filters.clone();
        if filters == self.server_filters {
            return Ok(false);
        }
        self.server_filters = filters;
        self.page = 1;
        self.refresh().await?;
        Ok(true)
    }

    // ---- row actions ----

    pub fn can_edit(&self, id: B::Id) -> bool {
        self.find(id).is_some_and(|item| B::check_edit(item).is_ok())
    }

    pub fn ensure_editable(&self, id: B::Id) -> Result<&B::Item, CoreError> {
        let item = self.require(id)?;
        B::check_edit(item)?;
        Ok(item)
    }

    /// Flip activation, then refetch. Returns the new state.
    pub async fn toggle_active(&mut self, id: B::Id) -> Result<bool, ClientError> {
        let item = self.require(id)?;
        B::check_toggle(item)?;
        let is_active = !B::is_active(item);

        if let Err(e) = self.backend.set_active(id, is_active).await {
            self.error = Some(e.user_message(&format!("Failed to update {} status", B::ENTITY)));
            return Err(e);
        }
        self.refresh().await?;
        Ok(is_active)
    }

    pub fn request_delete(&self, id: B::Id) -> Result<Confirmation<B::Id>, CoreError> {
        let item = self.require(id)?;
        B::check_delete(item)?;
        Ok(Confirmation::new(
            format!(
                "Are you sure you want to delete {} '{}'? This action cannot be undone.",
                B::ENTITY,
                B::label(item)
            ),
            id,
        ))
    }

    pub async fn delete(&mut self, confirmation: Confirmation<B::Id>) -> Result<(), ClientError> {
        let id = confirmation.confirm();
        if let Err(e) = self.backend.delete(id).await {
            self.error = Some(e.user_message(&format!("Failed to delete {}", B::ENTITY)));
            return Err(e);
        }
        self.refresh().await
    }
}
