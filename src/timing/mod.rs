// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Timing and clock module.
//!
//! This module provides the monotonic clocks and cancellable waits
//! used by the playback session.

pub mod clock;

pub use clock::{CancelFlag, Clock, ManualClock, SystemClock};
