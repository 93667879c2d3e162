//! Service query endpoints.

use crate::api::ApiError;
use crate::scheduling::SchedulingError;
use crate::shared::models::Collaborator;
use crate::shared::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

/// Collaborators assigned to perform a service, for the booking UI's
/// staff picker.
pub async fn collaborators(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Collaborator>>, ApiError> {
    let tables = state.store.read().await;
    if !tables.services.contains_key(&id) {
        return Err(SchedulingError::NotFound.into());
    }
    let collaborators = tables
        .collaborators_for_service(id)
        .into_iter()
        .filter_map(|collaborator_id| tables.collaborators.get(&collaborator_id).cloned())
        .collect();
    Ok(Json(collaborators))
}
