// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Key actuation abstraction layer.
//!
//! This module provides a trait-based abstraction over whatever turns a
//! physical key name into an input event, allowing different backends
//! (OS key synthesis, logging, test recorders) to be used interchangeably.

#[cfg(feature = "os-input")]
pub mod rdev_backend;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use anyhow::Result;
use tracing::info;

use crate::timing::Clock;

#[cfg(feature = "os-input")]
pub use rdev_backend::RdevActuator;

/// Trait for key actuator implementations.
///
/// Calls are fire-and-forget from the player's point of view: an `Err` is
/// logged and playback continues.
pub trait KeyActuator: Send {
    /// Press (key down) a physical key.
    ///
    /// # Arguments
    /// * `key` - Physical key name from the key mapping (e.g. `"d"`, `"space"`)
    fn press(&mut self, key: &str) -> Result<()>;

    /// Release (key up) a physical key.
    fn release(&mut self, key: &str) -> Result<()>;
}

/// Actuator shared between the player and its session thread
pub type SharedActuator = Arc<Mutex<Box<dyn KeyActuator>>>;

/// Wrap an actuator for sharing with the player
pub fn shared(actuator: impl KeyActuator + 'static) -> SharedActuator {
    Arc::new(Mutex::new(Box::new(actuator)))
}

/// Lock a shared actuator, recovering from a poisoned lock
pub(crate) fn lock(actuator: &SharedActuator) -> MutexGuard<'_, Box<dyn KeyActuator>> {
    actuator.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Actuator that only logs key events
pub struct LogActuator {
    clock: Option<(Arc<dyn Clock>, Instant)>,
}

impl LogActuator {
    /// Log key events without timestamps
    pub fn new() -> Self {
        Self { clock: None }
    }

    /// Log key events with the time elapsed on `clock` since creation
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let start = clock.now();
        Self {
            clock: Some((clock, start)),
        }
    }

    fn elapsed_ms(&self) -> Option<u128> {
        self.clock
            .as_ref()
            .map(|(clock, start)| clock.now().saturating_duration_since(*start).as_millis())
    }
}

impl Default for LogActuator {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyActuator for LogActuator {
    fn press(&mut self, key: &str) -> Result<()> {
        match self.elapsed_ms() {
            Some(at_ms) => info!(key, at_ms, "key down"),
            None => info!(key, "key down"),
        }
        Ok(())
    }

    fn release(&mut self, key: &str) -> Result<()> {
        match self.elapsed_ms() {
            Some(at_ms) => info!(key, at_ms, "key up"),
            None => info!(key, "key up"),
        }
        Ok(())
    }
}
