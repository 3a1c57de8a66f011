// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Sequencer core for scheduling and playing key events.
//!
//! This module provides the core playback infrastructure:
//! - Timeline planning with measure-aligned loop lengths
//! - Playback sessions with drift-free absolute timing
//! - Press-hold-release dispatch of note groups
//! - The thread-safe player control surface

pub mod dispatcher;
pub mod planner;
pub mod player;
pub mod session;
pub mod state;

pub use dispatcher::dispatch;
pub use planner::{cycle_base, event_target, measure_duration_ms, plan, Timeline};
pub use player::{Player, PlayerError};
pub use session::{select_events, SessionOutcome, SessionReport, SharedRng};
pub use state::PlaybackState;
