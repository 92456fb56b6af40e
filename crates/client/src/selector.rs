//! Cascading Country → Curriculum → Stage → Grade (→ Subject) selector.
//!
//! Drives a [`FilterCascade`] against a [`FilterSource`]. Option fetches
//! that fail leave the level empty with a notice; they never abort the
//! selector.

use async_trait::async_trait;
use futures::future::join_all;

use eduadmin_core::filter::{FilterCascade, FilterLevel, FilterNode, LoadRequest, SelectorVariant};
use eduadmin_core::scope::SelectedScope;
use eduadmin_core::types::DbId;

use crate::api::ApiClient;
use crate::error::ClientError;
use crate::scope::ScopeContext;

/// Where option lists come from.
#[async_trait]
pub trait FilterSource: Send + Sync {
    async fn options(&self, request: LoadRequest) -> Result<Vec<FilterNode>, ClientError>;
}

#[async_trait]
impl FilterSource for ApiClient {
    async fn options(&self, request: LoadRequest) -> Result<Vec<FilterNode>, ClientError> {
        self.filter_options(request).await
    }
}

pub struct CascadingSelector<S> {
    source: S,
    cascade: FilterCascade,
    error: Option<String>,
}

impl<S: FilterSource> CascadingSelector<S> {
    pub fn new(source: S, variant: SelectorVariant) -> Self {
        Self {
            source,
            cascade: FilterCascade::new(variant),
            error: None,
        }
    }

    pub fn cascade(&self) -> &FilterCascade {
        &self.cascade
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Last load failure, e.g. `"Failed to load grades"`.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Load countries, or restore a persisted scope and fetch the sibling
    /// options of every restored level concurrently.
    pub async fn open(&mut self, persisted: Option<&SelectedScope>) {
        let requests = match persisted {
            Some(scope) => self.cascade.restore(scope),
            None => self.cascade.open().into_iter().collect(),
        };
        if requests.is_empty() {
            return;
        }

        let source = &self.source;
        let results = join_all(requests.into_iter().map(|request| async move {
            (request, source.options(request).await)
        }))
        .await;
        for (request, result) in results {
            self.apply_load(request, result);
        }
    }

    /// Select the option `id` at `level`, or clear the level with `None`.
    /// Fetches the next level's options when a selection was made.
    pub async fn select(&mut self, level: FilterLevel, id: Option<DbId>) -> Result<(), ClientError> {
        let request = match id {
            Some(id) => self.cascade.select_id(level, id)?,
            None => self.cascade.select(level, None)?,
        };
        if let Some(request) = request {
            let result = self.source.options(request).await;
            self.apply_load(request, result);
        }
        Ok(())
    }

    /// Publish the selection to `scope`. Rejected until the deepest
    /// level is chosen.
    pub fn apply(&self, scope: &ScopeContext) -> Result<SelectedScope, ClientError> {
        let selected = self.cascade.to_scope()?;
        scope.select_subject(selected.clone())?;
        Ok(selected)
    }

    fn apply_load(&mut self, request: LoadRequest, result: Result<Vec<FilterNode>, ClientError>) {
        match result {
            Ok(nodes) => {
                if self.cascade.finish_load(request, nodes) {
                    self.error = None;
                }
            }
            Err(e) => {
                tracing::warn!(
                    level = request.level.label(),
                    parent_id = ?request.parent_id,
                    error = %e,
                    "Failed to load filter options"
                );
                if self.cascade.fail_load(request) {
                    self.error = Some(format!("Failed to load {}", request.level.plural()));
                }
            }
        }
    }
}
