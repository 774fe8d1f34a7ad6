//! Draft API endpoints.
//!
//! Drafts are scoped to the calling user; one user can never read or
//! overwrite another user's drafts.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{Draft, DraftSummary, FormType, SaveDraftRequest};
use crate::AppState;

fn parse_form_type(raw: &str) -> Result<FormType, AppError> {
    FormType::from_str(raw).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Unknown form type '{}'; expected gas_safety, invoice or service_checklist",
            raw
        ))
    })
}

/// GET /api/drafts - List the caller's drafts.
pub async fn list_drafts(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Vec<DraftSummary>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_drafts(&user_id).await {
        Ok(drafts) => success(drafts, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/drafts/:form_type - Get the caller's draft for a form type.
pub async fn get_draft(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(form_type): Path<String>,
) -> ApiResult<Draft> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let form_type = match parse_form_type(&form_type) {
        Ok(form_type) => form_type,
        Err(e) => return error(e, revision_id),
    };

    match state.repo.get_draft(&user_id, form_type).await {
        Ok(Some(draft)) => success(draft, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Draft {} not found", form_type)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/drafts/:form_type - Save the caller's draft for a form type.
pub async fn save_draft(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(form_type): Path<String>,
    Json(request): Json<SaveDraftRequest>,
) -> ApiResult<Draft> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let form_type = match parse_form_type(&form_type) {
        Ok(form_type) => form_type,
        Err(e) => return error(e, revision_id),
    };

    match state.repo.save_draft(&user_id, form_type, &request.data).await {
        Ok(draft) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(draft, new_revision)
        }
        Err(e) => {
            tracing::warn!(%form_type, user_id = %user_id, "Failed to save draft: {}", e);
            error(e, revision_id)
        }
    }
}

/// DELETE /api/drafts/:form_type - Discard the caller's draft for a form type.
pub async fn delete_draft(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(form_type): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let form_type = match parse_form_type(&form_type) {
        Ok(form_type) => form_type,
        Err(e) => return error(e, revision_id),
    };

    match state.repo.delete_draft(&user_id, form_type).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
