//! Process-wide holder of the selected scope.
//!
//! Writes go through [`ScopeContext::select_subject`] and
//! [`ScopeContext::clear_subject`] only; both persist before publishing.
//! Readers get snapshots or a [`GradeWatch`] that wakes when the grade
//! id changes, which is what every list screen refetches on.

use std::sync::Arc;

use tokio::sync::watch;

use eduadmin_core::scope::SelectedScope;
use eduadmin_core::types::DbId;

use crate::error::ClientError;
use crate::storage::{self, Storage, SCOPE_KEY};

pub struct ScopeContext {
    storage: Arc<dyn Storage>,
    tx: watch::Sender<Option<SelectedScope>>,
}

impl ScopeContext {
    /// Initialise from storage; an absent or unreadable entry means no scope.
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let initial: Option<SelectedScope> = storage::read_json(storage.as_ref(), SCOPE_KEY);
        let (tx, _rx) = watch::channel(initial);
        Self { storage, tx }
    }

    pub fn current(&self) -> Option<SelectedScope> {
        self.tx.borrow().clone()
    }

    pub fn grade_id(&self) -> Option<DbId> {
        self.tx.borrow().as_ref().map(SelectedScope::grade_id)
    }

    pub fn is_selected(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SelectedScope>> {
        self.tx.subscribe()
    }

    pub fn watch_grade(&self) -> GradeWatch {
        GradeWatch::new(self.subscribe())
    }

    /// Persist and publish a new scope.
    pub fn select_subject(&self, scope: SelectedScope) -> Result<(), ClientError> {
        storage::write_json(self.storage.as_ref(), SCOPE_KEY, &scope)?;
        tracing::info!(
            grade_id = scope.grade_id(),
            subject_id = ?scope.subject_id(),
            scope = %scope.breadcrumb(),
            "Scope selected"
        );
        self.tx.send_replace(Some(scope));
        Ok(())
    }

    pub fn clear_subject(&self) -> Result<(), ClientError> {
        self.storage.remove(SCOPE_KEY)?;
        self.tx.send_replace(None);
        tracing::info!("Scope cleared");
        Ok(())
    }

    /// Drop the in-memory scope after storage was wiped elsewhere.
    pub(crate) fn reset(&self) {
        self.tx.send_replace(None);
    }
}

/// Observes the scope and reports only grade id changes.
pub struct GradeWatch {
    rx: watch::Receiver<Option<SelectedScope>>,
    last: Option<DbId>,
}

impl GradeWatch {
    fn new(mut rx: watch::Receiver<Option<SelectedScope>>) -> Self {
        let last = rx.borrow_and_update().as_ref().map(SelectedScope::grade_id);
        Self { rx, last }
    }

    pub fn grade_id(&self) -> Option<DbId> {
        self.last
    }

    /// Non-blocking: `Some(new_grade)` if the grade changed since last seen.
    pub fn poll(&mut self) -> Option<Option<DbId>> {
        if !self.rx.has_changed().unwrap_or(false) {
            return None;
        }
        let grade = self.rx.borrow_and_update().as_ref().map(SelectedScope::grade_id);
        if grade == self.last {
            return None;
        }
        self.last = grade;
        Some(grade)
    }

    /// Wait for the next grade change. `None` once the context is gone.
    pub async fn changed(&mut self) -> Option<Option<DbId>> {
        loop {
            self.rx.changed().await.ok()?;
            let grade = self.rx.borrow_and_update().as_ref().map(SelectedScope::grade_id);
            if grade != self.last {
                self.last = grade;
                return Some(grade);
            }
        }
    }
}
