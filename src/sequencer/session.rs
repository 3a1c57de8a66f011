// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! The dispatch loop of one playback session.
//!
//! Every fire time is derived from a fixed origin: cycle `n` starts at
//! `origin + n * cycle_duration` and an event fires at `cycle start + offset`.
//! Late events fire late but never shift the events after them.

use std::sync::{Arc, Mutex, PoisonError};

use rand::{Rng, RngCore};
use tracing::{debug, info, warn};

use super::dispatcher::dispatch;
use super::planner::{cycle_base, event_target, plan};
use super::state::PlaybackState;
use crate::actuator::SharedActuator;
use crate::config::{KeyMapping, PlayerSettings};
use crate::score::{NoteGroup, Score};
use crate::timing::Clock;

/// Random source for variation draws, shared across sessions
pub type SharedRng = Arc<Mutex<Box<dyn RngCore + Send>>>;

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Played through with loop mode off
    Completed,
    /// Cancelled by `stop`
    Stopped,
}

/// Summary of a finished session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    /// Terminal outcome
    pub outcome: SessionOutcome,
    /// Cycles played to the end
    pub cycles: u64,
    /// Note groups that pressed at least one key
    pub dispatched: u64,
}

/// Choose the note groups played in one cycle.
///
/// With variation on, each group is kept independently when a fresh draw in
/// `[0, 1)` falls below its probability, so probability 0 never plays and
/// probability 1 always does.
pub fn select_events<'a>(
    events: &'a [NoteGroup],
    variation: bool,
    rng: &mut dyn RngCore,
) -> Vec<&'a NoteGroup> {
    if !variation {
        return events.iter().collect();
    }
    events
        .iter()
        .filter(|event| rng.gen::<f64>() < event.probability)
        .collect()
}

pub(crate) struct Session {
    pub(crate) score: Arc<Score>,
    pub(crate) mapping: Arc<KeyMapping>,
    pub(crate) actuator: SharedActuator,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) rng: SharedRng,
    pub(crate) settings: PlayerSettings,
    pub(crate) state: Arc<PlaybackState>,
}

impl Session {
    /// Run the session to its end and clear the cancellation request
    pub(crate) fn run(self) -> SessionReport {
        let report = self.play();
        self.state.cancel().clear();

        match report.outcome {
            SessionOutcome::Completed => info!(
                title = self.score.title(),
                cycles = report.cycles,
                dispatched = report.dispatched,
                "Playback completed"
            ),
            SessionOutcome::Stopped => info!(
                title = self.score.title(),
                cycles = report.cycles,
                dispatched = report.dispatched,
                "Playback stopped"
            ),
        }
        report
    }

    fn play(&self) -> SessionReport {
        let t0 = self.clock.now();
        let timeline = plan(&self.score);
        let cancel = self.state.cancel();

        if timeline.fallback {
            warn!(
                title = self.score.title(),
                "Cannot derive loop length from notes, using {:.3}s",
                timeline.cycle_seconds()
            );
        }

        info!(
            title = self.score.title(),
            bpm = self.score.bpm(),
            events = timeline.events.len(),
            cycle_s = timeline.cycle_seconds(),
            pre_roll_ms = self.settings.pre_roll_ms,
            "Starting playback, switch focus to the target window"
        );

        let mut report = SessionReport {
            outcome: SessionOutcome::Stopped,
            cycles: 0,
            dispatched: 0,
        };

        let origin = t0 + self.settings.pre_roll();
        if self.clock.wait_until(origin, cancel) {
            return report;
        }

        let mut cycle_index: u64 = 0;
        loop {
            let variation = self.state.variation_enabled();
            let selected = {
                let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
                select_events(&timeline.events, variation, &mut **rng)
            };
            let base = cycle_base(origin, timeline.cycle_duration, cycle_index);

            debug!(
                cycle = cycle_index,
                selected = selected.len(),
                variation,
                "Cycle start"
            );

            for event in selected {
                if cancel.is_requested() {
                    return report;
                }

                let target = event_target(base, event.offset_ms);
                if self.clock.wait_until(target, cancel) {
                    return report;
                }

                let pressed = dispatch(
                    event,
                    &self.mapping,
                    &self.actuator,
                    self.clock.as_ref(),
                    self.settings.hold(),
                );
                if pressed > 0 {
                    report.dispatched += 1;
                }
            }

            report.cycles += 1;

            if cancel.is_requested() {
                return report;
            }
            if !self.state.loop_enabled() {
                report.outcome = SessionOutcome::Completed;
                return report;
            }

            cycle_index += 1;
            debug!(cycle = cycle_index, "Looping score");

            // Nothing in the next cycle can fire before its start
            let next_base = cycle_base(origin, timeline.cycle_duration, cycle_index);
            if self.clock.wait_until(next_base, cancel) {
                return report;
            }
        }
    }
}
