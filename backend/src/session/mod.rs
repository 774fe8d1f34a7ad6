//! Form editing sessions.
//!
//! A [`FormSession`] is created when an editing view mounts and dropped when
//! it unmounts. The autosave scheduler and the navigation guard both hold it
//! by `Arc`; nothing about a session is global.

mod dirty;
mod guard;
pub mod ports;
mod scheduler;

#[cfg(test)]
mod testing;

pub use dirty::DirtyTracker;
pub use guard::{GuardOptions, NavigationGuard, DEFAULT_UNSAVED_MESSAGE};
pub use ports::{
    AuthProvider, ConfirmPrompt, DraftStore, FixedUser, Navigator, NoopUnloadHost,
    NotificationKind, Notifier, TracingNotifier, UnloadGuard, UnloadHost, UnloadRegistry,
};
pub use scheduler::{AutoSaveOptions, AutoSaver, AutoSaverBuilder, SaveOutcome, SkipReason};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::models::{FormSnapshot, FormType};

/// The per-view state shared by the scheduler and the guard.
pub struct FormSession {
    form_type: FormType,
    auth: Arc<dyn AuthProvider>,
    state: Mutex<SessionState>,
}

struct SessionState {
    current: FormSnapshot,
    dirty: DirtyTracker,
}

/// A snapshot taken for saving.
pub(crate) struct PendingSave {
    pub(crate) snapshot: FormSnapshot,
    clean_marks: u64,
}

impl FormSession {
    /// Open a session; `initial` becomes the unsaved-changes baseline.
    pub fn new(form_type: FormType, initial: FormSnapshot, auth: Arc<dyn AuthProvider>) -> Arc<Self> {
        let mut dirty = DirtyTracker::new();
        dirty.observe(&initial);
        Arc::new(Self {
            form_type,
            auth,
            state: Mutex::new(SessionState {
                current: initial,
                dirty,
            }),
        })
    }

    pub fn form_type(&self) -> FormType {
        self.form_type
    }

    pub fn current_user(&self) -> Option<String> {
        self.auth.current_user()
    }

    /// Replace the form content. Dirty state updates before this returns.
    pub fn update(&self, snapshot: FormSnapshot) {
        let mut state = self.state();
        state.dirty.observe(&snapshot);
        state.current = snapshot;
    }

    /// Change a single field.
    pub fn set_field(&self, name: impl Into<String>, value: impl Into<Value>) {
        let mut state = self.state();
        state.current.set(name, value);
        let SessionState { current, dirty } = &mut *state;
        dirty.observe(current);
    }

    pub fn snapshot(&self) -> FormSnapshot {
        self.state().current.clone()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.state().dirty.is_dirty()
    }

    /// Forget unsaved edits, e.g. after the record itself was submitted.
    pub fn mark_clean(&self) {
        self.state().dirty.mark_clean();
    }

    /// The current snapshot, unless it matches what was last saved.
    pub(crate) fn pending_snapshot(&self) -> Option<PendingSave> {
        let state = self.state();
        if state.dirty.matches_baseline(&state.current) {
            None
        } else {
            Some(PendingSave {
                snapshot: state.current.clone(),
                clean_marks: state.dirty.clean_marks(),
            })
        }
    }

    /// Record a completed save. Ignored if the session was marked clean while
    /// the save was in flight; returns whether the baseline moved.
    pub(crate) fn mark_saved(&self, saved: &PendingSave) -> bool {
        let mut state = self.state();
        if state.dirty.clean_marks() != saved.clean_marks {
            return false;
        }
        state.dirty.rebase(&saved.snapshot);
        true
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for FormSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormSession")
            .field("form_type", &self.form_type)
            .field("has_unsaved_changes", &self.has_unsaved_changes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Arc<FormSession> {
        FormSession::new(
            FormType::Invoice,
            FormSnapshot::new().with_field("customer", "Ms Patel"),
            Arc::new(FixedUser::signed_in("eng-1")),
        )
    }

    #[test]
    fn test_new_session_is_clean() {
        let session = session();
        assert!(!session.has_unsaved_changes());
        assert!(session.pending_snapshot().is_none());
    }

    #[test]
    fn test_set_field_marks_dirty_synchronously() {
        let session = session();
        session.set_field("total", 95);
        assert!(session.has_unsaved_changes());
        assert_eq!(
            session.pending_snapshot().unwrap().snapshot.get("total"),
            Some(&serde_json::json!(95))
        );
    }

    #[test]
    fn test_mark_saved_clears_only_matching_snapshot() {
        let session = session();
        session.set_field("total", 95);
        let saved = session.pending_snapshot().unwrap();
        session.set_field("total", 120);

        assert!(session.mark_saved(&saved));
        assert!(session.has_unsaved_changes());

        let saved = session.pending_snapshot().unwrap();
        assert!(session.mark_saved(&saved));
        assert!(!session.has_unsaved_changes());
    }

    #[test]
    fn test_save_landing_after_mark_clean_is_ignored() {
        let session = session();
        session.set_field("total", 95);
        let saved = session.pending_snapshot().unwrap();

        session.set_field("total", 0);
        session.mark_clean();

        assert!(!session.mark_saved(&saved));
        assert!(!session.has_unsaved_changes());
    }

    #[test]
    fn test_mark_clean() {
        let session = session();
        session.update(FormSnapshot::new().with_field("customer", "Mr Jones"));
        session.mark_clean();
        assert!(!session.has_unsaved_changes());
    }
}
