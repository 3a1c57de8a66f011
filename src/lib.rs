// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Keyboard drum player.
//!
//! Plays a score of timed key groups against the wall clock by pressing
//! physical keys, with optional seamless looping and random note dropout.

pub mod actuator;
pub mod config;
pub mod control;
pub mod score;
pub mod sequencer;
pub mod timing;

pub use actuator::{KeyActuator, LogActuator};
pub use config::{AppConfig, KeyMapping, PlayerSettings};
pub use score::{NoteGroup, Score, ScoreError};
pub use sequencer::{Player, PlayerError, SessionOutcome, SessionReport};
