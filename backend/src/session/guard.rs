//! Confirmation before leaving a form with unsaved changes.

use std::sync::Arc;

use super::ports::{ConfirmPrompt, Navigator, UnloadGuard, UnloadHost};
use super::FormSession;

pub const DEFAULT_UNSAVED_MESSAGE: &str =
    "You have unsaved changes. Are you sure you want to leave?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardOptions {
    pub enabled: bool,
    pub message: String,
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            message: DEFAULT_UNSAVED_MESSAGE.to_string(),
        }
    }
}

/// Gates unload and in-app navigation on the session's dirty state.
///
/// The unload interception is registered on construction and released on drop.
pub struct NavigationGuard {
    session: Arc<FormSession>,
    options: GuardOptions,
    prompt: Arc<dyn ConfirmPrompt>,
    navigator: Arc<dyn Navigator>,
    unload: Option<UnloadRegistration>,
}

struct UnloadRegistration {
    host: Arc<dyn UnloadHost>,
    id: u64,
}

impl Drop for UnloadRegistration {
    fn drop(&mut self) {
        self.host.unregister_unload_guard(self.id);
    }
}

impl NavigationGuard {
    pub fn new(
        session: Arc<FormSession>,
        options: GuardOptions,
        prompt: Arc<dyn ConfirmPrompt>,
        navigator: Arc<dyn Navigator>,
        unload_host: Arc<dyn UnloadHost>,
    ) -> Self {
        let unload = options.enabled.then(|| {
            let watched = Arc::downgrade(&session);
            let predicate = Arc::new(move || {
                watched
                    .upgrade()
                    .map(|session| blocks_exit(&session))
                    .unwrap_or(false)
            });
            let id = unload_host
                .register_unload_guard(UnloadGuard::new(predicate, options.message.clone()));
            UnloadRegistration {
                host: unload_host,
                id,
            }
        });

        Self {
            session,
            options,
            prompt,
            navigator,
            unload,
        }
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.session.has_unsaved_changes()
    }

    /// Whether leaving is allowed. Prompts only when there is something to lose.
    pub fn check_unsaved_changes(&self) -> bool {
        if !self.options.enabled || !blocks_exit(&self.session) {
            return true;
        }
        let confirmed = self.prompt.confirm(&self.options.message);
        tracing::debug!(
            form_type = %self.session.form_type(),
            confirmed,
            "unsaved changes prompt answered"
        );
        confirmed
    }

    /// Navigate to `path` if [`Self::check_unsaved_changes`] allows it.
    /// Returns whether navigation happened.
    pub fn navigate_with_check(&self, path: &str) -> bool {
        if !self.check_unsaved_changes() {
            return false;
        }
        // The user chose to leave; the unload prompt must not ask again.
        self.session.mark_clean();
        self.navigator.navigate(path);
        true
    }

    pub fn is_unload_registered(&self) -> bool {
        self.unload.is_some()
    }
}

fn blocks_exit(session: &FormSession) -> bool {
    session.current_user().is_some() && session.has_unsaved_changes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FormSnapshot, FormType};
    use crate::session::testing::{signed_in_session, RecordingNavigator, ScriptedPrompt};
    use crate::session::{FixedUser, NoopUnloadHost, UnloadRegistry};

    struct Harness {
        session: Arc<FormSession>,
        prompt: Arc<ScriptedPrompt>,
        navigator: Arc<RecordingNavigator>,
        registry: Arc<UnloadRegistry>,
        guard: NavigationGuard,
    }

    fn harness(session: Arc<FormSession>, options: GuardOptions, answer: bool) -> Harness {
        let prompt = Arc::new(ScriptedPrompt::answering(answer));
        let navigator = Arc::new(RecordingNavigator::default());
        let registry = Arc::new(UnloadRegistry::new());
        let guard = NavigationGuard::new(
            session.clone(),
            options,
            prompt.clone(),
            navigator.clone(),
            registry.clone(),
        );
        Harness {
            session,
            prompt,
            navigator,
            registry,
            guard,
        }
    }

    #[test]
    fn test_clean_session_passes_without_prompt() {
        let h = harness(signed_in_session(FormType::Invoice), GuardOptions::default(), false);

        assert!(h.guard.check_unsaved_changes());
        assert!(h.prompt.asked().is_empty());
    }

    #[test]
    fn test_dirty_session_returns_user_choice() {
        let h = harness(signed_in_session(FormType::Invoice), GuardOptions::default(), false);
        h.session.set_field("total", 300);

        assert!(h.guard.has_unsaved_changes());
        assert!(!h.guard.check_unsaved_changes());

        h.prompt.set_answer(true);
        assert!(h.guard.check_unsaved_changes());
        assert_eq!(
            h.prompt.asked(),
            vec![DEFAULT_UNSAVED_MESSAGE.to_string(); 2]
        );
    }

    #[test]
    fn test_navigate_with_check_cancelled() {
        let h = harness(signed_in_session(FormType::GasSafety), GuardOptions::default(), false);
        h.session.set_field("landlord", "Mr Smith");

        assert!(!h.guard.navigate_with_check("/certificates"));
        assert!(h.navigator.paths().is_empty());
        assert!(h.session.has_unsaved_changes());
    }

    #[test]
    fn test_navigate_with_check_confirmed() {
        let h = harness(signed_in_session(FormType::GasSafety), GuardOptions::default(), true);
        h.session.set_field("landlord", "Mr Smith");

        assert!(h.guard.navigate_with_check("/certificates"));
        assert_eq!(h.navigator.paths(), vec!["/certificates".to_string()]);
        assert!(!h.session.has_unsaved_changes());
        assert_eq!(h.registry.before_unload(), None);
    }

    #[test]
    fn test_navigate_when_clean_skips_prompt() {
        let h = harness(signed_in_session(FormType::Invoice), GuardOptions::default(), false);

        assert!(h.guard.navigate_with_check("/invoices"));
        assert!(h.prompt.asked().is_empty());
        assert_eq!(h.navigator.paths(), vec!["/invoices".to_string()]);
    }

    #[test]
    fn test_unload_follows_dirty_state() {
        let options = GuardOptions {
            enabled: true,
            message: "Checklist not saved".to_string(),
        };
        let h = harness(signed_in_session(FormType::ServiceChecklist), options, true);

        assert!(h.guard.is_unload_registered());
        assert_eq!(h.registry.before_unload(), None);

        h.session.set_field("burner_pressure", "20mbar");
        assert_eq!(
            h.registry.before_unload().as_deref(),
            Some("Checklist not saved")
        );

        h.session.mark_clean();
        assert_eq!(h.registry.before_unload(), None);
    }

    #[test]
    fn test_drop_releases_unload_registration() {
        let h = harness(signed_in_session(FormType::Invoice), GuardOptions::default(), true);
        h.session.set_field("total", 1);
        assert_eq!(h.registry.len(), 1);

        let Harness {
            registry, guard, ..
        } = h;
        drop(guard);
        assert!(registry.is_empty());
        assert_eq!(registry.before_unload(), None);
    }

    #[test]
    fn test_disabled_guard_never_prompts_or_registers() {
        let options = GuardOptions {
            enabled: false,
            ..GuardOptions::default()
        };
        let h = harness(signed_in_session(FormType::Invoice), options, false);
        h.session.set_field("total", 1);

        assert!(!h.guard.is_unload_registered());
        assert!(h.registry.is_empty());
        assert!(h.guard.check_unsaved_changes());
        assert!(h.prompt.asked().is_empty());
    }

    #[test]
    fn test_signed_out_session_is_not_guarded() {
        let session = FormSession::new(
            FormType::Invoice,
            FormSnapshot::new(),
            Arc::new(FixedUser::anonymous()),
        );
        let h = harness(session, GuardOptions::default(), false);
        h.session.set_field("total", 1);

        assert!(h.guard.check_unsaved_changes());
        assert!(h.prompt.asked().is_empty());
        assert_eq!(h.registry.before_unload(), None);
    }

    #[test]
    fn test_noop_unload_host() {
        let session = signed_in_session(FormType::Invoice);
        let guard = NavigationGuard::new(
            session.clone(),
            GuardOptions::default(),
            Arc::new(ScriptedPrompt::answering(true)),
            Arc::new(RecordingNavigator::default()),
            Arc::new(NoopUnloadHost),
        );
        session.set_field("total", 1);
        assert!(guard.is_unload_registered());
        assert!(guard.check_unsaved_changes());
    }
}
