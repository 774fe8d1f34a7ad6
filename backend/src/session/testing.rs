//! Recording doubles for the session capabilities.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use super::ports::{
    AuthProvider, ConfirmPrompt, DraftStore, Navigator, NotificationKind, Notifier,
};
use super::{FixedUser, FormSession};
use crate::errors::DraftError;
use crate::models::{FormSnapshot, FormType};

pub fn signed_in_session(form_type: FormType) -> Arc<FormSession> {
    FormSession::new(
        form_type,
        FormSnapshot::new().with_field("engineer", "J. Carter"),
        Arc::new(FixedUser::signed_in("engineer-1")),
    )
}

/// Auth provider whose user can be swapped mid-test.
#[derive(Default)]
pub struct SwitchableUser {
    user: Mutex<Option<String>>,
}

impl SwitchableUser {
    pub fn sign_in(&self, user: &str) {
        *self.user.lock().unwrap() = Some(user.to_string());
    }

    pub fn sign_out(&self) {
        *self.user.lock().unwrap() = None;
    }
}

impl AuthProvider for SwitchableUser {
    fn current_user(&self) -> Option<String> {
        self.user.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct RecordingStore {
    calls: Mutex<Vec<(FormType, FormSnapshot)>>,
    failures: Mutex<VecDeque<DraftError>>,
    completed: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl RecordingStore {
    /// Each save waits for one permit on `gate` before answering.
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn fail_next(&self, error: DraftError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub fn calls(&self) -> Vec<(FormType, FormSnapshot)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DraftStore for RecordingStore {
    async fn save_draft(&self, form_type: FormType, data: &FormSnapshot) -> Result<(), DraftError> {
        self.calls.lock().unwrap().push((form_type, data.clone()));
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        let failure = self.failures.lock().unwrap().pop_front();
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    pub fn of_kind(&self, kind: NotificationKind) -> Vec<Notification> {
        self.all().into_iter().filter(|n| n.kind == kind).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NotificationKind, title: &str, message: &str, _duration: Duration) {
        self.seen.lock().unwrap().push(Notification {
            kind,
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}

/// Answers every confirm with a preset choice and records the prompts.
pub struct ScriptedPrompt {
    answer: AtomicBool,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer: AtomicBool::new(answer),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn set_answer(&self, answer: bool) {
        self.answer.store(answer, Ordering::SeqCst);
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

impl ConfirmPrompt for ScriptedPrompt {
    fn confirm(&self, message: &str) -> bool {
        self.asked.lock().unwrap().push(message.to_string());
        self.answer.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    paths: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.paths.lock().unwrap().push(path.to_string());
    }
}
