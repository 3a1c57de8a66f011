// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Timeline planning: measure-aligned cycle length and absolute targets.
//!
//! A cycle always ends on a measure boundary (4 beats at the score tempo), so
//! a looped score restarts on the downbeat even when its last note falls in
//! the middle of a measure.

use std::time::{Duration, Instant};

use crate::score::{NoteGroup, Score, DEFAULT_BPM};

/// Beats in one measure (4/4 time)
pub const BEATS_PER_MEASURE: f64 = 4.0;

/// Measures used as the cycle length of a score without notes
pub const FALLBACK_MEASURES: f64 = 4.0;

/// One cycle of playback, fixed for a whole session
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    /// Note groups in ascending offset order
    pub events: Vec<NoteGroup>,
    /// Length of one cycle, a whole number of measures
    pub cycle_duration: Duration,
    /// True when the cycle length could not be derived from the notes
    pub fallback: bool,
}

impl Timeline {
    /// Cycle length in seconds
    pub fn cycle_seconds(&self) -> f64 {
        self.cycle_duration.as_secs_f64()
    }
}

/// Milliseconds in one 4-beat measure at `bpm`
pub fn measure_duration_ms(bpm: f64) -> f64 {
    60_000.0 * BEATS_PER_MEASURE / bpm
}

/// Plan one cycle of `score`
pub fn plan(score: &Score) -> Timeline {
    let mut events = score.notes().to_vec();
    events.sort_by_key(|n| n.offset_ms);

    let measure_ms = measure_duration_ms(score.bpm());
    let aligned_ms = events.last().map(|last| {
        let measures = (last.offset_ms as f64 / measure_ms).floor() + 1.0;
        measures * measure_ms
    });

    let cycle = aligned_ms.and_then(millis_to_duration);
    let (cycle_duration, fallback) = match cycle {
        Some(duration) => (duration, false),
        None => (fallback_cycle(measure_ms), true),
    };

    Timeline {
        events,
        cycle_duration,
        fallback,
    }
}

fn millis_to_duration(ms: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(ms / 1000.0)
        .ok()
        .filter(|d| !d.is_zero())
}

fn fallback_cycle(measure_ms: f64) -> Duration {
    millis_to_duration(measure_ms * FALLBACK_MEASURES).unwrap_or_else(|| {
        Duration::from_secs_f64(measure_duration_ms(DEFAULT_BPM) * FALLBACK_MEASURES / 1000.0)
    })
}

/// Offset of cycle `cycle_index` from the timeline origin.
///
/// Computed by integer multiplication, so cycle `n` starts exactly
/// `n * cycle_duration` after the origin no matter how late earlier
/// events fired.
pub fn cycle_offset(cycle_duration: Duration, cycle_index: u64) -> Duration {
    const NANOS_PER_SEC: u128 = 1_000_000_000;
    let nanos = cycle_duration.as_nanos() * u128::from(cycle_index);
    Duration::new((nanos / NANOS_PER_SEC) as u64, (nanos % NANOS_PER_SEC) as u32)
}

/// Start instant of cycle `cycle_index`
pub fn cycle_base(origin: Instant, cycle_duration: Duration, cycle_index: u64) -> Instant {
    origin + cycle_offset(cycle_duration, cycle_index)
}

/// Absolute fire instant of an event within a cycle
pub fn event_target(cycle_base: Instant, offset_ms: u64) -> Instant {
    cycle_base + Duration::from_millis(offset_ms)
}
