//! Revision and client settings endpoints.

use axum::extract::State;

use super::{success, ApiResult};
use crate::models::{ClientSettings, RevisionInfo};
use crate::AppState;

/// GET /api/revision - Get the current revision info.
pub async fn get_revision(State(state): State<AppState>) -> ApiResult<RevisionInfo> {
    let revision_info =
        state
            .repo
            .get_revision_info()
            .await
            .map_err(|e| crate::errors::AppErrorWithRevision {
                error: e,
                revision_id: 0,
            })?;

    success(revision_info.clone(), revision_info.revision_id)
}

/// GET /api/settings - Autosave defaults for editing clients.
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<ClientSettings> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    success(state.config.client_settings(), revision_id)
}
