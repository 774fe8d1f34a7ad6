//! Unsaved-changes tracking against the last saved snapshot.

use crate::models::FormSnapshot;

/// Compares each observed snapshot with a baseline fingerprint.
///
/// The first observation becomes the baseline. The baseline then moves only
/// when a save completes or the session is explicitly marked clean.
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    baseline: Option<String>,
    current: Option<String>,
    clean_marks: u64,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a snapshot and return whether it differs from the baseline.
    pub fn observe(&mut self, snapshot: &FormSnapshot) -> bool {
        let fingerprint = snapshot.fingerprint();
        if self.baseline.is_none() {
            self.baseline = Some(fingerprint.clone());
        }
        self.current = Some(fingerprint);
        self.is_dirty()
    }

    pub fn is_dirty(&self) -> bool {
        match (&self.baseline, &self.current) {
            (Some(baseline), Some(current)) => baseline != current,
            _ => false,
        }
    }

    /// Whether `snapshot` is structurally identical to the baseline.
    pub fn matches_baseline(&self, snapshot: &FormSnapshot) -> bool {
        self.baseline.as_deref() == Some(snapshot.fingerprint().as_str())
    }

    /// Move the baseline to a snapshot that has just been persisted.
    ///
    /// The tracker stays dirty if the form moved on while the save was in flight.
    pub fn rebase(&mut self, saved: &FormSnapshot) {
        self.baseline = Some(saved.fingerprint());
    }

    /// Accept the current snapshot as the baseline.
    pub fn mark_clean(&mut self) {
        self.baseline = self.current.clone();
        self.clean_marks += 1;
    }

    /// How many times [`mark_clean`](Self::mark_clean) has been called.
    pub fn clean_marks(&self) -> u64 {
        self.clean_marks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(address: &str) -> FormSnapshot {
        FormSnapshot::new().with_field("address", address)
    }

    #[test]
    fn test_first_observation_is_baseline() {
        let mut tracker = DirtyTracker::new();
        assert!(!tracker.observe(&snapshot("1 High St")));
        assert!(!tracker.is_dirty());
        assert!(tracker.matches_baseline(&snapshot("1 High St")));
    }

    #[test]
    fn test_edit_marks_dirty_and_revert_clears() {
        let mut tracker = DirtyTracker::new();
        tracker.observe(&snapshot("1 High St"));

        assert!(tracker.observe(&snapshot("2 High St")));
        assert!(!tracker.observe(&snapshot("1 High St")));
    }

    #[test]
    fn test_rebase_keeps_dirty_when_form_moved_on() {
        let mut tracker = DirtyTracker::new();
        tracker.observe(&snapshot("a"));
        tracker.observe(&snapshot("b"));
        tracker.observe(&snapshot("c"));

        tracker.rebase(&snapshot("b"));
        assert!(tracker.is_dirty());

        tracker.rebase(&snapshot("c"));
        assert!(!tracker.is_dirty());
    }

    #[test]
    fn test_mark_clean() {
        let mut tracker = DirtyTracker::new();
        tracker.observe(&snapshot("a"));
        tracker.observe(&snapshot("b"));
        tracker.mark_clean();
        assert!(!tracker.is_dirty());
        assert!(tracker.matches_baseline(&snapshot("b")));
        assert_eq!(tracker.clean_marks(), 1);
    }
}
