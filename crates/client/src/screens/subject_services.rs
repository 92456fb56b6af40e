//! Subject services screen.
//!
//! Lists the services attached to one subject of the scope's grade and
//! creates new ones from the service catalogue. A service that already
//! exists for the subject in this grade can neither be picked nor sent.

use std::collections::HashSet;

use eduadmin_core::error::CoreError;
use eduadmin_core::filter::FilterNode;
use eduadmin_core::form::{self, Confirmation};
use eduadmin_core::subject_service::{self, CreationContext, Service, SubjectService};
use eduadmin_core::types::DbId;

use crate::api::ApiClient;
use crate::error::{core_message, ClientError};
use crate::scope::GradeWatch;

pub struct SubjectServicesScreen {
    api: ApiClient,
    grade: GradeWatch,
    subjects: Vec<FilterNode>,
    subject_id: Option<DbId>,
    items: Vec<SubjectService>,
    catalog: Vec<Service>,
    existing: HashSet<DbId>,
    selected: Vec<DbId>,
    error: Option<String>,
}

impl SubjectServicesScreen {
    pub fn new(api: ApiClient) -> Self {
        let grade = api.session().scope().watch_grade();
        Self {
            api,
            grade,
            subjects: Vec::new(),
            subject_id: None,
            items: Vec::new(),
            catalog: Vec::new(),
            existing: HashSet::new(),
            selected: Vec::new(),
            error: None,
        }
    }

    pub fn subjects(&self) -> &[FilterNode] {
        &self.subjects
    }

    pub fn subject_id(&self) -> Option<DbId> {
        self.subject_id
    }

    pub fn items(&self) -> &[SubjectService] {
        &self.items
    }

    pub fn catalog(&self) -> &[Service] {
        &self.catalog
    }

    pub fn existing(&self) -> &HashSet<DbId> {
        &self.existing
    }

    pub fn selected(&self) -> &[DbId] {
        &self.selected
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    // ---- loading ----

    /// Load the service catalogue and the grade's subjects.
    pub async fn open(&mut self) -> Result<(), ClientError> {
        match self.api.services().await {
            Ok(services) => self.catalog = services,
            Err(e) => {
                self.error = Some(e.user_message("Failed to load available services"));
                return Err(e);
            }
        }
        self.load_subjects().await
    }

    pub async fn sync_scope(&mut self) -> Result<bool, ClientError> {
        if self.grade.poll().is_none() {
            return Ok(false);
        }
        self.subject_id = None;
        self.selected.clear();
        self.load_subjects().await?;
        Ok(true)
    }

    /// Subjects of the grade; keeps the selected subject if still listed,
    /// otherwise picks the first.
    async fn load_subjects(&mut self) -> Result<(), ClientError> {
        let Some(grade_id) = self.grade.grade_id() else {
            self.subjects.clear();
            self.subject_id = None;
            self.items.clear();
            self.existing.clear();
            return Ok(());
        };

        match self.api.subjects(grade_id).await {
            Ok(subjects) => self.subjects = subjects,
            Err(e) => {
                self.subjects.clear();
                self.error = Some(e.user_message("Failed to load subjects"));
                return Err(e);
            }
        }
        let still_listed = self
            .subject_id
            .is_some_and(|id| self.subjects.iter().any(|s| s.id == id));
        if !still_listed {
            self.subject_id = self.subjects.first().map(|s| s.id);
        }
        self.load_items().await
    }

    pub async fn select_subject(&mut self, subject_id: DbId) -> Result<(), ClientError> {
        if !self.subjects.iter().any(|s| s.id == subject_id) {
            return Err(CoreError::not_found("subject", subject_id).into());
        }
        self.subject_id = Some(subject_id);
        self.selected.clear();
        self.load_items().await
    }

    /// The subject's services and the existing-service set for the grade.
    pub async fn load_items(&mut self) -> Result<(), ClientError> {
        let Some(subject_id) = self.subject_id else {
            self.items.clear();
            self.existing.clear();
            return Ok(());
        };
        match self.api.subject_services(subject_id).await {
            Ok(items) => {
                self.existing = self.existing_for_grade(&items);
                self.items = items;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                self.items.clear();
                self.error = Some(e.user_message("Failed to load subject services"));
                Err(e)
            }
        }
    }

    /// Re-read the existing set right before a create. A failed read keeps
    /// the previous set.
    async fn refresh_existing(&mut self, subject_id: DbId) {
        match self.api.subject_services(subject_id).await {
            Ok(items) => self.existing = self.existing_for_grade(&items),
            Err(e) => tracing::warn!(subject_id, error = %e, "Failed to re-check existing services"),
        }
    }

    fn existing_for_grade(&self, items: &[SubjectService]) -> HashSet<DbId> {
        match self.grade.grade_id() {
            Some(grade_id) => subject_service::existing_service_ids(items, grade_id),
            None => HashSet::new(),
        }
    }

    // ---- selection ----

    fn grade_name(&self) -> String {
        self.api
            .session()
            .scope()
            .current()
            .map(|s| s.grade.name)
            .unwrap_or_default()
    }

    fn subject_name(&self) -> Option<&str> {
        let id = self.subject_id?;
        self.subjects
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.name.as_str())
    }

    /// Flip a catalogue service in the pending selection. Existing ones
    /// are refused with a message naming the subject and grade.
    pub fn toggle_service(&mut self, service_id: DbId) -> Result<bool, CoreError> {
        let grade_name = self.grade_name();
        let ctx = CreationContext {
            subject_id: self.subject_id.unwrap_or_default(),
            subject_name: self.subject_name(),
            grade_id: self.grade.grade_id().unwrap_or_default(),
            grade_name: &grade_name,
        };
        if let Err(e) = subject_service::check_selectable(service_id, &self.existing, &ctx) {
            self.error = Some(core_message(&e, "Failed to select service"));
            return Err(e);
        }
        if let Some(pos) = self.selected.iter().position(|id| *id == service_id) {
            self.selected.remove(pos);
            Ok(false)
        } else {
            self.selected.push(service_id);
            Ok(true)
        }
    }

    /// Select every catalogue service not yet attached.
    pub fn select_all(&mut self) {
        self.selected = subject_service::selectable_services(&self.catalog, &self.existing);
    }

    pub fn deselect_all(&mut self) {
        self.selected.clear();
    }

    /// Confirmation needed before closing the create panel, if anything
    /// is selected.
    pub fn request_cancel(&self) -> Option<Confirmation<()>> {
        form::discard_confirmation(!self.selected.is_empty())
    }

    // ---- writes ----

    /// Create the selected services. Duplicates are caught here and no
    /// request is sent for them. Returns the created records when the
    /// backend echoes them.
    pub async fn create(&mut self) -> Result<Vec<SubjectService>, ClientError> {
        let (Some(subject_id), Some(grade_id)) = (self.subject_id, self.grade.grade_id()) else {
            return Err(CoreError::Validation(
                "Subject or grade information is missing".to_string(),
            )
            .into());
        };
        if !self.selected.is_empty() {
            self.refresh_existing(subject_id).await;
        }

        let grade_name = self.grade_name();
        let ctx = CreationContext {
            subject_id,
            subject_name: self.subject_name(),
            grade_id,
            grade_name: &grade_name,
        };
        let request =
            match subject_service::plan_creation(&self.selected, &self.existing, &self.catalog, &ctx) {
                Ok(request) => request,
                Err(e) => {
                    self.error = Some(core_message(&e, "Failed to create subject services"));
                    return Err(e.into());
                }
            };

        let created = match self.api.create_subject_services(&request).await {
            Ok(created) => created,
            Err(e) => {
                self.error = Some(e.user_message("Failed to create subject services"));
                return Err(e);
            }
        };
        self.selected.clear();
        self.load_items().await?;
        Ok(created)
    }

    pub fn request_delete(&self, id: DbId) -> Result<Confirmation<DbId>, CoreError> {
        let item = self
            .items
            .iter()
            .find(|ss| ss.id == id)
            .ok_or_else(|| CoreError::not_found("subject service", id))?;
        let name = item.service_name.as_deref().unwrap_or("this service");
        Ok(Confirmation::new(
            format!("Are you sure you want to remove '{name}' from this subject?"),
            id,
        ))
    }

    pub async fn delete(&mut self, confirmation: Confirmation<DbId>) -> Result<(), ClientError> {
        let id = confirmation.confirm();
        if let Err(e) = self.api.delete_subject_service(id).await {
            self.error = Some(e.user_message("Failed to delete subject service"));
            return Err(e);
        }
        self.load_items().await
    }
}
