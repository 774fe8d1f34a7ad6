//! Capabilities a form session consumes from its host.
//!
//! The scheduler and guard only talk to the outside world through these
//! traits, so they run the same under a browser shell, a desktop shell or a
//! test harness.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::DraftError;
use crate::models::{FormSnapshot, FormType};

/// Persistence sink for autosaved form content.
///
/// Implementations must tolerate being called again with the same snapshot
/// after a failure.
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn save_draft(&self, form_type: FormType, data: &FormSnapshot) -> Result<(), DraftError>;
}

/// Supplies the signed-in user, if any.
pub trait AuthProvider: Send + Sync {
    fn current_user(&self) -> Option<String>;
}

/// An auth provider with a fixed answer.
#[derive(Debug, Clone, Default)]
pub struct FixedUser(pub Option<String>);

impl FixedUser {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self(Some(user_id.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl AuthProvider for FixedUser {
    fn current_user(&self) -> Option<String> {
        self.0.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

/// Fire-and-forget toast sink.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotificationKind, title: &str, message: &str, duration: Duration);
}

/// Notifier for headless hosts: notifications become log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NotificationKind, title: &str, message: &str, _duration: Duration) {
        match kind {
            NotificationKind::Error => tracing::error!(title, "{}", message),
            NotificationKind::Info | NotificationKind::Success => {
                tracing::info!(title, "{}", message)
            }
        }
    }
}

/// Programmatic route changes.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Blocking confirm/cancel dialog.
pub trait ConfirmPrompt: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

/// Predicate deciding whether an unload should be challenged.
pub type UnloadPredicate = Arc<dyn Fn() -> bool + Send + Sync>;

/// A registered unload interception.
#[derive(Clone)]
pub struct UnloadGuard {
    predicate: UnloadPredicate,
    message: String,
}

impl UnloadGuard {
    pub fn new(predicate: UnloadPredicate, message: impl Into<String>) -> Self {
        Self {
            predicate,
            message: message.into(),
        }
    }

    /// The value to hand back to the host's unload event, if the unload must be challenged.
    pub fn on_unload(&self) -> Option<&str> {
        if (self.predicate)() {
            Some(&self.message)
        } else {
            None
        }
    }
}

impl std::fmt::Debug for UnloadGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnloadGuard")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Host lifecycle hook for page or process unload.
pub trait UnloadHost: Send + Sync {
    fn register_unload_guard(&self, guard: UnloadGuard) -> u64;
    fn unregister_unload_guard(&self, id: u64);
}

/// Unload host for targets without an unload event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopUnloadHost;

impl UnloadHost for NoopUnloadHost {
    fn register_unload_guard(&self, _guard: UnloadGuard) -> u64 {
        0
    }

    fn unregister_unload_guard(&self, _id: u64) {}
}

/// In-memory unload host. The embedding shell calls [`UnloadRegistry::before_unload`]
/// from its own shutdown path.
#[derive(Debug, Default)]
pub struct UnloadRegistry {
    next_id: AtomicU64,
    guards: Mutex<BTreeMap<u64, UnloadGuard>>,
}

impl UnloadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// First blocking message among the registered guards, in registration order.
    pub fn before_unload(&self) -> Option<String> {
        let guards = self.guards.lock().unwrap_or_else(PoisonError::into_inner);
        guards
            .values()
            .find_map(|guard| guard.on_unload().map(str::to_string))
    }

    pub fn len(&self) -> usize {
        self.guards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl UnloadHost for UnloadRegistry {
    fn register_unload_guard(&self, guard: UnloadGuard) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.guards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, guard);
        id
    }

    fn unregister_unload_guard(&self, id: u64) {
        self.guards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}
