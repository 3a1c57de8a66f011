// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Playback state shared between the control surface and the session thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use super::session::SessionReport;
use crate::timing::CancelFlag;

/// Flags read by the session at its check-points.
///
/// `loop_enabled` and `variation_enabled` are written only by the control
/// surface, `running` only by the player when it spawns or finishes a
/// session, `cancel` by `stop` (set) and the session (clear).
#[derive(Debug, Default)]
pub struct PlaybackState {
    loop_enabled: AtomicBool,
    variation_enabled: AtomicBool,
    running: AtomicBool,
    cancel: CancelFlag,
    report: Mutex<Option<SessionReport>>,
    finished: Condvar,
}

impl PlaybackState {
    /// Create idle state with loop and variation off
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether loop mode is on
    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled.load(Ordering::SeqCst)
    }

    /// Flip loop mode, returning the new value
    pub fn toggle_loop(&self) -> bool {
        !self.loop_enabled.fetch_xor(true, Ordering::SeqCst)
    }

    /// Set loop mode
    pub fn set_loop_enabled(&self, enabled: bool) {
        self.loop_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Whether variation mode is on
    pub fn variation_enabled(&self) -> bool {
        self.variation_enabled.load(Ordering::SeqCst)
    }

    /// Flip variation mode, returning the new value
    pub fn toggle_variation(&self) -> bool {
        !self.variation_enabled.fetch_xor(true, Ordering::SeqCst)
    }

    /// Set variation mode
    pub fn set_variation_enabled(&self, enabled: bool) {
        self.variation_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Whether a session is between an accepted start and its exit
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn begin(&self) {
        self.cancel.clear();
        self.running.store(true, Ordering::SeqCst);
    }

    pub(crate) fn abort_begin(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Cancellation flag observed by the session
    pub fn cancel(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Whether `stop` has been requested
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_requested()
    }

    fn lock_report(&self) -> MutexGuard<'_, Option<SessionReport>> {
        self.report.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a session's report and mark it finished.
    ///
    /// The report is stored and `running` cleared under the same lock, so a
    /// waiter never sees a finished session without its report.
    pub(crate) fn finish(&self, report: SessionReport) {
        let mut slot = self.lock_report();
        *slot = Some(report);
        self.running.store(false, Ordering::SeqCst);
        self.finished.notify_all();
    }

    /// Report of the most recent finished session
    pub fn last_report(&self) -> Option<SessionReport> {
        self.lock_report().clone()
    }

    /// Block until no session is running, then return the last report
    pub fn wait_finished(&self) -> Option<SessionReport> {
        let mut slot = self.lock_report();
        while self.is_running() {
            slot = self
                .finished
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
        slot.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::session::SessionOutcome;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_toggles() {
        let state = PlaybackState::new();
        assert!(!state.loop_enabled());
        assert!(state.toggle_loop());
        assert!(state.loop_enabled());
        assert!(!state.toggle_loop());

        assert!(!state.variation_enabled());
        assert!(state.toggle_variation());
        assert!(state.variation_enabled());
        state.set_variation_enabled(false);
        assert!(!state.variation_enabled());
    }

    #[test]
    fn test_begin_clears_cancel() {
        let state = PlaybackState::new();
        state.cancel().request();
        state.begin();
        assert!(state.is_running());
        assert!(!state.is_cancel_requested());
    }

    #[test]
    fn test_wait_finished() {
        let state = Arc::new(PlaybackState::new());
        state.begin();

        let worker = Arc::clone(&state);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            worker.finish(SessionReport {
                outcome: SessionOutcome::Completed,
                cycles: 1,
                dispatched: 2,
            });
        });

        let report = state.wait_finished().unwrap();
        assert_eq!(report.outcome, SessionOutcome::Completed);
        assert_eq!(report.dispatched, 2);
        assert!(!state.is_running());
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_when_idle() {
        let state = PlaybackState::new();
        assert_eq!(state.wait_finished(), None);
    }
}
