// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Control surface for driving the player.
//!
//! This module provides:
//! - Named control actions, parsed from config
//! - A controller that applies actions to a player and a playlist
//! - Keyboard shortcut handling

pub mod keyboard;

pub use keyboard::{format_shortcut, parse_shortcut, KeyBinding, KeyboardController, Shortcut};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::score::Score;
use crate::sequencer::{Player, PlayerError};

/// Action that can be triggered by controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlAction {
    /// Start the current score, or stop if playing
    TogglePlay,
    /// Stop playback
    Stop,
    /// Toggle loop mode
    ToggleLoop,
    /// Toggle variation mode
    ToggleVariation,
    /// Select the next score in the playlist
    Next,
    /// Select the previous score in the playlist
    Previous,
    /// Quit application
    Quit,
}

/// Unrecognized action name in config
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown control action: {0}")]
pub struct UnknownAction(pub String);

impl ControlAction {
    /// Every action, in help display order
    pub const ALL: [ControlAction; 7] = [
        ControlAction::TogglePlay,
        ControlAction::Stop,
        ControlAction::ToggleLoop,
        ControlAction::ToggleVariation,
        ControlAction::Next,
        ControlAction::Previous,
        ControlAction::Quit,
    ];

    /// Config name of this action
    pub fn name(&self) -> &'static str {
        match self {
            ControlAction::TogglePlay => "toggle_play",
            ControlAction::Stop => "stop",
            ControlAction::ToggleLoop => "toggle_loop",
            ControlAction::ToggleVariation => "toggle_variation",
            ControlAction::Next => "next",
            ControlAction::Previous => "previous",
            ControlAction::Quit => "quit",
        }
    }

    /// Description for help display
    pub fn description(&self) -> &'static str {
        match self {
            ControlAction::TogglePlay => "Play/Stop",
            ControlAction::Stop => "Stop",
            ControlAction::ToggleLoop => "Toggle Loop",
            ControlAction::ToggleVariation => "Toggle Variation",
            ControlAction::Next => "Next Score",
            ControlAction::Previous => "Previous Score",
            ControlAction::Quit => "Quit",
        }
    }
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ControlAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        ControlAction::ALL
            .into_iter()
            .find(|action| action.name() == normalized)
            .or(match normalized.as_str() {
                "play" | "pause" => Some(ControlAction::TogglePlay),
                "loop" => Some(ControlAction::ToggleLoop),
                "variation" => Some(ControlAction::ToggleVariation),
                "prev" => Some(ControlAction::Previous),
                _ => None,
            })
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

/// Applies control actions to a player and its playlist
pub struct Controller {
    player: Player,
    playlist: Vec<Arc<Score>>,
    current: usize,
}

impl Controller {
    /// Create a controller positioned at the first score
    pub fn new(player: Player, playlist: Vec<Arc<Score>>) -> Self {
        Self {
            player,
            playlist,
            current: 0,
        }
    }

    /// The controlled player
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Scores available for playback
    pub fn playlist(&self) -> &[Arc<Score>] {
        &self.playlist
    }

    /// Index of the selected score
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The selected score, if the playlist is not empty
    pub fn current(&self) -> Option<&Arc<Score>> {
        self.playlist.get(self.current)
    }

    /// Apply an action.
    ///
    /// Returns `Ok(false)` once the action asks the application to quit.
    pub fn handle(&mut self, action: ControlAction) -> Result<bool, PlayerError> {
        match action {
            ControlAction::TogglePlay => {
                if self.player.is_playing() {
                    self.player.stop();
                } else {
                    self.start_current()?;
                }
            }
            ControlAction::Stop => self.player.stop(),
            ControlAction::ToggleLoop => {
                self.player.toggle_loop();
            }
            ControlAction::ToggleVariation => {
                self.player.toggle_variation();
            }
            ControlAction::Next => self.select(1)?,
            ControlAction::Previous => self.select(self.playlist.len().saturating_sub(1))?,
            ControlAction::Quit => {
                self.player.stop();
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn start_current(&self) -> Result<(), PlayerError> {
        match self.current() {
            Some(score) => self.player.start(Arc::clone(score)),
            None => {
                warn!("Playlist is empty, nothing to play");
                Ok(())
            }
        }
    }

    /// Move the selection forward by `step` (modulo playlist length) and
    /// play the new selection, stopping any score already playing.
    fn select(&mut self, step: usize) -> Result<(), PlayerError> {
        if self.playlist.is_empty() {
            return Ok(());
        }

        self.player.stop();
        self.current = (self.current + step) % self.playlist.len();
        if let Some(score) = self.current() {
            info!(index = self.current, title = score.title(), "Selected score");
        }
        self.start_current()
    }
}
