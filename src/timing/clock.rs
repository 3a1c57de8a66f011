// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Monotonic clocks for the playback session.
//!
//! The session never accumulates sleep durations: it asks a [`Clock`] to wait
//! until an absolute [`Instant`]. [`SystemClock`] does this against real time,
//! [`ManualClock`] against a virtual timeline that jumps straight to every
//! deadline (dry runs and deterministic tests).

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Cancellation request shared between the control surface and a session.
///
/// Setting the flag wakes any thread blocked in [`CancelFlag::wait_until`].
#[derive(Debug, Default)]
pub struct CancelFlag {
    requested: Mutex<bool>,
    wake: Condvar,
}

impl CancelFlag {
    /// Create a cleared flag
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.requested.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Request cancellation and wake waiters
    pub fn request(&self) {
        let mut requested = self.lock();
        *requested = true;
        self.wake.notify_all();
    }

    /// Clear a previous request
    pub fn clear(&self) {
        *self.lock() = false;
    }

    /// Check whether cancellation was requested
    pub fn is_requested(&self) -> bool {
        *self.lock()
    }

    /// Block until `deadline` passes or cancellation is requested.
    ///
    /// Returns `true` if woken by cancellation. The lock is released while
    /// waiting.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut requested = self.lock();
        loop {
            if *requested {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .wake
                .wait_timeout(requested, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            requested = guard;
        }
    }
}

/// Time source used by the playback session
pub trait Clock: Send + Sync {
    /// Current monotonic instant
    fn now(&self) -> Instant;

    /// Uninterruptible sleep (used for key holds)
    fn sleep(&self, duration: Duration);

    /// Wait until `deadline` unless cancelled first.
    ///
    /// Returns immediately if the deadline already passed. Returns `true` if
    /// cancellation was observed.
    fn wait_until(&self, deadline: Instant, cancel: &CancelFlag) -> bool;
}

/// Real monotonic clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }

    fn wait_until(&self, deadline: Instant, cancel: &CancelFlag) -> bool {
        cancel.wait_until(deadline)
    }
}

/// Virtual clock that advances only when asked to
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    /// Create a clock at virtual time zero
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Duration> {
        self.elapsed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Virtual time zero
    pub fn origin(&self) -> Instant {
        self.origin
    }

    /// Virtual time elapsed since creation
    pub fn elapsed(&self) -> Duration {
        *self.lock()
    }

    /// Move virtual time forward
    pub fn advance(&self, duration: Duration) {
        *self.lock() += duration;
    }

    fn advance_to(&self, deadline: Instant) {
        let target = deadline.saturating_duration_since(self.origin);
        let mut elapsed = self.lock();
        if target > *elapsed {
            *elapsed = target;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }

    fn wait_until(&self, deadline: Instant, cancel: &CancelFlag) -> bool {
        if cancel.is_requested() {
            return true;
        }
        self.advance_to(deadline);
        cancel.is_requested()
    }
}
