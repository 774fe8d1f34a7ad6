//! Periodic draft autosave for one form session.
//!
//! Every tick runs the same attempt as [`AutoSaver::save_now`]: skip when
//! disabled, signed out, already saving or unchanged; otherwise hand the
//! snapshot to the draft store and move the session baseline on success.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::ports::{DraftStore, NotificationKind, Notifier, TracingNotifier};
use super::FormSession;
use crate::errors::DraftError;
use crate::models::FormSnapshot;

const SAVED_TOAST_DURATION: Duration = Duration::from_millis(2000);
const FAILED_TOAST_DURATION: Duration = Duration::from_millis(5000);

/// Scheduler options supplied when a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoSaveOptions {
    pub interval: Duration,
    pub enabled: bool,
}

impl AutoSaveOptions {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(30_000);
    pub const MIN_INTERVAL: Duration = Duration::from_millis(1);
}

impl Default for AutoSaveOptions {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            enabled: true,
        }
    }
}

/// Why an attempt did not reach the draft store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    NoUser,
    InFlight,
    Unchanged,
    Disposed,
}

/// Result of a single save attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Skipped(SkipReason),
    Failed(DraftError),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved)
    }
}

type SuccessCallback = Box<dyn Fn(&FormSnapshot) + Send + Sync>;
type ErrorCallback = Box<dyn Fn(&DraftError) + Send + Sync>;

/// Configures and starts an [`AutoSaver`].
pub struct AutoSaverBuilder {
    session: Arc<FormSession>,
    store: Arc<dyn DraftStore>,
    notifier: Arc<dyn Notifier>,
    options: AutoSaveOptions,
    on_success: Option<SuccessCallback>,
    on_error: Option<ErrorCallback>,
}

impl AutoSaverBuilder {
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn options(mut self, options: AutoSaveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.options.interval = interval;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.options.enabled = enabled;
        self
    }

    pub fn on_success(mut self, callback: impl Fn(&FormSnapshot) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl Fn(&DraftError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Start the scheduler. The timer is only installed when called inside a
    /// Tokio runtime; otherwise only [`AutoSaver::save_now`] is available.
    pub fn start(self) -> AutoSaver {
        let inner = Arc::new(Inner {
            session: self.session,
            store: self.store,
            notifier: self.notifier,
            on_success: self.on_success,
            on_error: self.on_error,
            disposed: AtomicBool::new(false),
            state: Mutex::new(SchedulerState {
                enabled: self.options.enabled,
                interval: self.options.interval.max(AutoSaveOptions::MIN_INTERVAL),
                is_saving: false,
                last_saved_at: None,
                successful_saves: 0,
                timer: None,
                generation: 0,
            }),
        });
        inner.reschedule();
        AutoSaver { inner }
    }
}

/// Autosave scheduler bound to one [`FormSession`].
///
/// Dropping it cancels the timer. A save already handed to the store is left
/// to finish, but its result is discarded.
pub struct AutoSaver {
    inner: Arc<Inner>,
}

struct Inner {
    session: Arc<FormSession>,
    store: Arc<dyn DraftStore>,
    notifier: Arc<dyn Notifier>,
    on_success: Option<SuccessCallback>,
    on_error: Option<ErrorCallback>,
    disposed: AtomicBool,
    state: Mutex<SchedulerState>,
}

struct SchedulerState {
    enabled: bool,
    interval: Duration,
    is_saving: bool,
    last_saved_at: Option<DateTime<Utc>>,
    successful_saves: u64,
    timer: Option<JoinHandle<()>>,
    /// Bumped whenever the timer is replaced; stale timers compare against it.
    generation: u64,
}

impl AutoSaver {
    pub fn builder(session: Arc<FormSession>, store: Arc<dyn DraftStore>) -> AutoSaverBuilder {
        AutoSaverBuilder {
            session,
            store,
            notifier: Arc::new(TracingNotifier),
            options: AutoSaveOptions::default(),
            on_success: None,
            on_error: None,
        }
    }

    pub fn session(&self) -> &Arc<FormSession> {
        &self.inner.session
    }

    /// Run a save attempt now instead of waiting for the next tick.
    pub async fn save_now(&self) -> SaveOutcome {
        self.inner.attempt_save().await
    }

    pub fn is_saving(&self) -> bool {
        self.inner.state().is_saving
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.inner.state().last_saved_at
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.state().enabled
    }

    pub fn interval(&self) -> Duration {
        self.inner.state().interval
    }

    pub fn is_timer_active(&self) -> bool {
        self.inner.state().timer.is_some()
    }

    pub fn set_enabled(&self, enabled: bool) {
        {
            let mut state = self.inner.state();
            if state.enabled == enabled {
                return;
            }
            state.enabled = enabled;
        }
        tracing::debug!(form_type = %self.inner.session.form_type(), enabled, "autosave toggled");
        self.inner.reschedule();
    }

    pub fn set_interval(&self, interval: Duration) {
        let interval = interval.max(AutoSaveOptions::MIN_INTERVAL);
        {
            let mut state = self.inner.state();
            if state.interval == interval {
                return;
            }
            state.interval = interval;
        }
        self.inner.reschedule();
    }

    /// Re-evaluate the timer, e.g. after the signed-in user changed.
    pub fn refresh(&self) {
        self.inner.reschedule();
    }
}

impl Drop for AutoSaver {
    fn drop(&mut self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        let mut state = self.inner.state();
        state.generation = state.generation.wrapping_add(1);
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }
}

impl std::fmt::Debug for AutoSaver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state();
        f.debug_struct("AutoSaver")
            .field("form_type", &self.inner.session.form_type())
            .field("enabled", &state.enabled)
            .field("interval", &state.interval)
            .field("is_saving", &state.is_saving)
            .field("last_saved_at", &state.last_saved_at)
            .finish()
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn is_current_timer(&self, generation: u64) -> bool {
        !self.is_disposed() && self.state().generation == generation
    }

    /// Cancel the current timer and install a new one if saving is possible.
    fn reschedule(self: &Arc<Self>) {
        let mut state = self.state();
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.generation = state.generation.wrapping_add(1);

        if !state.enabled || self.is_disposed() || self.session.current_user().is_none() {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No Tokio runtime; autosave timer not started");
            return;
        };

        let generation = state.generation;
        let period = state.interval;
        state.timer = Some(runtime.spawn(run_timer(Arc::downgrade(self), generation, period)));
        tracing::debug!(
            form_type = %self.session.form_type(),
            interval_ms = period.as_millis() as u64,
            "autosave timer installed"
        );
    }

    async fn attempt_save(&self) -> SaveOutcome {
        let form_type = self.session.form_type();

        if self.is_disposed() {
            return SaveOutcome::Skipped(SkipReason::Disposed);
        }
        if self.session.current_user().is_none() {
            return SaveOutcome::Skipped(SkipReason::NoUser);
        }

        let pending = {
            let mut state = self.state();
            if !state.enabled {
                return SaveOutcome::Skipped(SkipReason::Disabled);
            }
            if state.is_saving {
                return SaveOutcome::Skipped(SkipReason::InFlight);
            }
            let Some(pending) = self.session.pending_snapshot() else {
                return SaveOutcome::Skipped(SkipReason::Unchanged);
            };
            state.is_saving = true;
            pending
        };
        let snapshot = &pending.snapshot;

        let flight = InFlight::new(self);
        let result = self.store.save_draft(form_type, snapshot).await;

        match result {
            Ok(()) => {
                let disposed = self.is_disposed();
                if !disposed && !self.session.mark_saved(&pending) {
                    tracing::debug!(%form_type, "session marked clean during save; baseline kept");
                }
                let first_save = {
                    let mut state = self.state();
                    flight.land(&mut state);
                    state.last_saved_at = Some(Utc::now());
                    state.successful_saves += 1;
                    state.successful_saves == 1
                };
                if disposed {
                    tracing::debug!(%form_type, "draft saved after session closed; result discarded");
                    return SaveOutcome::Saved;
                }

                tracing::debug!(%form_type, fields = snapshot.len(), "draft saved");
                if let Some(callback) = &self.on_success {
                    callback(snapshot);
                }
                if !first_save {
                    self.notifier.notify(
                        NotificationKind::Info,
                        "Draft saved",
                        &format!("Your {} draft has been saved.", form_type.label()),
                        SAVED_TOAST_DURATION,
                    );
                }
                SaveOutcome::Saved
            }
            Err(err) => {
                {
                    let mut state = self.state();
                    flight.land(&mut state);
                }
                tracing::error!(%form_type, error = %err, "Auto-save failed");
                if !self.is_disposed() {
                    if let Some(callback) = &self.on_error {
                        callback(&err);
                    }
                    self.notifier.notify(
                        NotificationKind::Error,
                        "Auto-save failed",
                        &err.to_string(),
                        FAILED_TOAST_DURATION,
                    );
                }
                SaveOutcome::Failed(err)
            }
        }
    }
}

/// Clears `is_saving` if the attempt future is dropped before the store answers.
struct InFlight<'a> {
    inner: &'a Inner,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn new(inner: &'a Inner) -> Self {
        Self { inner, armed: true }
    }

    fn land(mut self, state: &mut SchedulerState) {
        state.is_saving = false;
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.state().is_saving = false;
        }
    }
}

async fn run_timer(inner: Weak<Inner>, generation: u64, period: Duration) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if !inner.is_current_timer(generation) {
            break;
        }
        // Saves run as their own task so cancelling the timer never cancels a save.
        tokio::spawn(async move {
            inner.attempt_save().await;
        });
    }
}
