//! Draft store that saves through the REST API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::auth::{API_KEY_HEADER, USER_ID_HEADER};
use crate::errors::{DraftError, ErrorResponse};
use crate::models::{FormSnapshot, FormType};
use crate::session::{AuthProvider, DraftStore};

/// [`DraftStore`] speaking to `PUT /api/drafts/{formType}`.
///
/// The user id is read from the auth provider on every save, so a session
/// that outlives a sign-out stops writing.
#[derive(Clone)]
pub struct HttpDraftStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    auth: Arc<dyn AuthProvider>,
}

#[derive(Deserialize)]
struct Envelope {
    success: bool,
}

impl HttpDraftStore {
    pub fn new(base_url: impl Into<String>, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            auth,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn draft_url(&self, form_type: FormType) -> String {
        format!("{}/api/drafts/{}", self.base_url, form_type.as_str())
    }
}

#[async_trait]
impl DraftStore for HttpDraftStore {
    async fn save_draft(&self, form_type: FormType, data: &FormSnapshot) -> Result<(), DraftError> {
        let user_id = self.auth.current_user().ok_or_else(|| DraftError::Rejected {
            status: StatusCode::UNAUTHORIZED.as_u16(),
            message: "No signed-in user".to_string(),
        })?;

        let mut request = self
            .client
            .put(self.draft_url(form_type))
            .header(USER_ID_HEADER, user_id)
            .json(&serde_json::json!({ "data": data }));
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            let envelope: Envelope = response.json().await?;
            if envelope.success {
                return Ok(());
            }
            return Err(DraftError::Rejected {
                status: status.as_u16(),
                message: "Draft service reported failure".to_string(),
            });
        }

        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.error.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Unexpected response")
                .to_string(),
        };
        tracing::warn!(%form_type, status = status.as_u16(), "Draft service rejected save: {}", message);
        Err(DraftError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FixedUser;

    #[test]
    fn test_draft_url_trims_trailing_slash() {
        let store = HttpDraftStore::new(
            "http://drafts.local/",
            Arc::new(FixedUser::signed_in("eng-1")),
        );
        assert_eq!(
            store.draft_url(FormType::ServiceChecklist),
            "http://drafts.local/api/drafts/service_checklist"
        );
    }

    #[tokio::test]
    async fn test_signed_out_save_is_rejected_locally() {
        let store = HttpDraftStore::new("http://127.0.0.1:9", Arc::new(FixedUser::anonymous()));
        let err = store
            .save_draft(FormType::Invoice, &FormSnapshot::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DraftError::Rejected { status: 401, .. }));
    }
}
