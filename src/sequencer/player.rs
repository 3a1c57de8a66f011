// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Player: the control surface over playback sessions.
//!
//! At most one session thread exists at a time. `start` spawns it and returns
//! immediately, `stop` cancels it and joins the thread, so no key event fires
//! after `stop` returns.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::session::{Session, SessionOutcome, SessionReport, SharedRng};
use super::state::PlaybackState;
use crate::actuator::{self, KeyActuator, SharedActuator};
use crate::config::{KeyMapping, PlayerSettings};
use crate::score::Score;
use crate::timing::{Clock, SystemClock};

/// Errors returned by the player
#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("A playback session is already running")]
    AlreadyPlaying,

    #[error("Failed to spawn playback thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Plays scores on a dedicated thread
pub struct Player {
    mapping: Arc<KeyMapping>,
    actuator: SharedActuator,
    clock: Arc<dyn Clock>,
    rng: SharedRng,
    settings: PlayerSettings,
    state: Arc<PlaybackState>,
    /// Handle of the current (or last, unjoined) session thread
    session: Mutex<Option<JoinHandle<()>>>,
    /// Score of the most recently started session
    score: Mutex<Option<Arc<Score>>>,
    /// Serializes start and stop
    control: Mutex<()>,
}

impl Player {
    /// Create a player with the system clock and an entropy-seeded RNG
    pub fn new(mapping: KeyMapping, actuator: impl KeyActuator + 'static) -> Self {
        Self::with_shared_actuator(mapping, actuator::shared(actuator))
    }

    /// Create a player around an already shared actuator
    pub fn with_shared_actuator(mapping: KeyMapping, actuator: SharedActuator) -> Self {
        Self {
            mapping: Arc::new(mapping),
            actuator,
            clock: Arc::new(SystemClock),
            rng: Arc::new(Mutex::new(Box::new(StdRng::from_entropy()))),
            settings: PlayerSettings::default(),
            state: Arc::new(PlaybackState::new()),
            session: Mutex::new(None),
            score: Mutex::new(None),
            control: Mutex::new(()),
        }
    }

    /// Set timing parameters
    pub fn with_settings(mut self, settings: PlayerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use another time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use another random source for variation draws
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Arc::new(Mutex::new(Box::new(rng)));
        self
    }

    /// Timing parameters
    pub fn settings(&self) -> PlayerSettings {
        self.settings
    }

    /// Key mapping used for every session
    pub fn key_mapping(&self) -> &KeyMapping {
        &self.mapping
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_control(&self) -> MutexGuard<'_, ()> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start playing `score` on a new thread.
    ///
    /// Returns [`PlayerError::AlreadyPlaying`] without touching the running
    /// session if one is active.
    pub fn start(&self, score: impl Into<Arc<Score>>) -> Result<(), PlayerError> {
        let _control = self.lock_control();
        let mut session = self.lock_session();

        if self.state.is_running() {
            debug!("Start ignored, already playing");
            return Err(PlayerError::AlreadyPlaying);
        }

        // A session that reported itself finished is at most returning
        // from its thread closure
        reap(session.take());

        let score = score.into();
        info!(title = score.title(), "Starting session");
        *self.score.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&score));

        let runner = Session {
            score,
            mapping: Arc::clone(&self.mapping),
            actuator: Arc::clone(&self.actuator),
            clock: Arc::clone(&self.clock),
            rng: Arc::clone(&self.rng),
            settings: self.settings,
            state: Arc::clone(&self.state),
        };
        let state = Arc::clone(&self.state);

        self.state.begin();
        let spawned = thread::Builder::new()
            .name("keydrum-session".to_string())
            .spawn(move || {
                match panic::catch_unwind(AssertUnwindSafe(move || runner.run())) {
                    Ok(report) => state.finish(report),
                    Err(payload) => {
                        state.finish(SessionReport {
                            outcome: SessionOutcome::Stopped,
                            cycles: 0,
                            dispatched: 0,
                        });
                        panic::resume_unwind(payload);
                    }
                }
            });

        match spawned {
            Ok(handle) => {
                *session = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.state.abort_begin();
                Err(PlayerError::Spawn(e))
            }
        }
    }

    /// Stop the current session and wait for its thread to exit.
    ///
    /// A key already held down is released before this returns. No-op when
    /// nothing is playing.
    pub fn stop(&self) {
        let _control = self.lock_control();
        let Some(handle) = self.lock_session().take() else {
            return;
        };

        if !handle.is_finished() {
            info!("Stopping playback");
        }
        self.state.cancel().request();

        if handle.join().is_err() {
            warn!("Playback thread panicked");
        }
        self.state.cancel().clear();
    }

    /// Block until the current session ends, returning its report.
    ///
    /// The session thread has exited when this returns, so `start` can be
    /// called right away.
    pub fn wait(&self) -> Option<SessionReport> {
        let report = self.state.wait_finished();

        let _control = self.lock_control();
        if !self.state.is_running() {
            reap(self.lock_session().take());
        }
        report
    }

    /// Whether a session is between an accepted start and its end
    pub fn is_playing(&self) -> bool {
        self.state.is_running()
    }

    /// Score being played, if a session is running
    pub fn current_score(&self) -> Option<Arc<Score>> {
        if !self.is_playing() {
            return None;
        }
        self.score.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Flip loop mode; takes effect at the next cycle boundary
    pub fn toggle_loop(&self) -> bool {
        let enabled = self.state.toggle_loop();
        info!(enabled, "Loop mode");
        enabled
    }

    /// Flip variation mode; takes effect at the next cycle
    pub fn toggle_variation(&self) -> bool {
        let enabled = self.state.toggle_variation();
        info!(enabled, "Variation mode");
        enabled
    }

    /// Whether loop mode is on
    pub fn loop_enabled(&self) -> bool {
        self.state.loop_enabled()
    }

    /// Whether variation mode is on
    pub fn variation_enabled(&self) -> bool {
        self.state.variation_enabled()
    }

    /// Report of the most recent finished session
    pub fn last_report(&self) -> Option<SessionReport> {
        self.state.last_report()
    }
}

fn reap(handle: Option<JoinHandle<()>>) {
    if let Some(handle) = handle {
        if handle.join().is_err() {
            warn!("Previous playback thread panicked");
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::LogActuator;
    use crate::score::NoteGroup;
    use crate::timing::ManualClock;
    use std::time::{Duration, Instant};

    fn quick_settings() -> PlayerSettings {
        PlayerSettings::default().with_pre_roll_ms(0).with_hold_ms(5)
    }

    fn mapping() -> KeyMapping {
        KeyMapping::new().with("snare", "d")
    }

    #[test]
    fn test_player_creation() {
        let player = Player::new(mapping(), LogActuator::new());
        assert!(!player.is_playing());
        assert!(!player.loop_enabled());
        assert!(!player.variation_enabled());
        assert_eq!(player.last_report(), None);
        assert_eq!(player.settings(), PlayerSettings::default());
        assert_eq!(player.key_mapping().resolve("snare"), Some("d"));
    }

    #[test]
    fn test_toggles_persist_across_sessions() {
        let player = Player::new(mapping(), LogActuator::new())
            .with_settings(quick_settings())
            .with_clock(Arc::new(ManualClock::new()));
        assert!(player.toggle_variation());

        let score = Score::new("s", 120.0, vec![NoteGroup::new(0, ["snare"])]).unwrap();
        player.start(score.clone()).unwrap();
        player.wait();
        player.start(score).unwrap();
        player.wait();

        assert!(player.variation_enabled());
        assert!(!player.toggle_variation());
    }

    #[test]
    fn test_restart_right_after_wait() {
        let player = Player::new(mapping(), LogActuator::new())
            .with_settings(quick_settings())
            .with_clock(Arc::new(ManualClock::new()));
        let score = Arc::new(Score::new("s", 120.0, vec![NoteGroup::new(0, ["snare"])]).unwrap());

        for _ in 0..200 {
            player.start(score.clone()).unwrap();
            let report = player.wait().unwrap();
            assert_eq!(report.outcome, SessionOutcome::Completed);
            assert!(!player.is_playing());
            assert!(player.lock_session().is_none());
            assert!(player.current_score().is_none());
        }
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let player = Player::new(mapping(), LogActuator::new());
        player.stop();
        assert!(!player.is_playing());
    }

    #[test]
    fn test_wait_returns_report() {
        let player = Player::new(mapping(), LogActuator::new())
            .with_settings(quick_settings())
            .with_clock(Arc::new(ManualClock::new()));

        let score = Score::new("s", 120.0, vec![NoteGroup::new(0, ["snare"])]).unwrap();
        player.start(score).unwrap();

        let report = player.wait().unwrap();
        assert_eq!(report.outcome, SessionOutcome::Completed);
        assert_eq!(report.dispatched, 1);
        assert!(!player.is_playing());
    }

    #[test]
    fn test_stop_interrupts_long_wait() {
        let player = Player::new(mapping(), LogActuator::new())
            .with_settings(PlayerSettings::default().with_pre_roll_ms(60_000));

        let score = Score::new("s", 120.0, vec![NoteGroup::new(0, ["snare"])]).unwrap();
        player.start(score).unwrap();
        assert!(player.is_playing());

        let started = Instant::now();
        player.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!player.is_playing());
        assert_eq!(player.last_report().unwrap().outcome, SessionOutcome::Stopped);
    }
}
