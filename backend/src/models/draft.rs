//! Draft models shared by the REST API and the HTTP draft store.

use serde::{Deserialize, Serialize};

use super::{FormSnapshot, FormType};

/// An autosaved form draft owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub id: String,
    pub user_id: String,
    pub form_type: FormType,
    pub data: FormSnapshot,
    pub updated_at: String,
    /// Incremented on every save of this draft
    pub version: i64,
}

/// A draft without its form data, for listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSummary {
    pub id: String,
    pub form_type: FormType,
    pub updated_at: String,
    pub version: i64,
}

/// Request body for saving a draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveDraftRequest {
    pub data: FormSnapshot,
}

/// Revision information for change detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_id: i64,
    pub generated_at: String,
}

/// Autosave defaults handed to editing clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSettings {
    pub autosave_interval_ms: u64,
    pub autosave_enabled: bool,
    pub unsaved_changes_message: String,
}
