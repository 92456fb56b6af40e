//! One controller per admin list screen.
//!
//! Each screen wraps a [`Collection`] bound to the scope's grade and adds
//! the entity's own forms and actions.

pub mod bundles;
pub mod rows;
pub mod subject_services;
pub mod vouchers;

use crate::collection::{Collection, CollectionBackend};
use crate::error::ClientError;
use crate::scope::GradeWatch;

/// Point the collection at the current grade and fetch.
async fn load_for_grade<B: CollectionBackend>(
    watch: &GradeWatch,
    collection: &mut Collection<B>,
) -> Result<(), ClientError> {
    collection.set_grade(watch.grade_id());
    collection.refresh().await
}

/// Refetch if the grade changed since the last call. Returns whether it did.
async fn follow_grade<B: CollectionBackend>(
    watch: &mut GradeWatch,
    collection: &mut Collection<B>,
) -> Result<bool, ClientError> {
    let Some(grade_id) = watch.poll() else {
        return Ok(false);
    };
    tracing::debug!(entity = B::ENTITY, grade_id = ?grade_id, "Scope grade changed, refetching");
    collection.set_grade(grade_id);
    collection.refresh().await?;
    Ok(true)
}
