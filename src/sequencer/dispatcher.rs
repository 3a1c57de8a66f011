// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Press-hold-release of one note group.

use std::time::Duration;

use tracing::{debug, warn};

use crate::actuator::{self, SharedActuator};
use crate::config::KeyMapping;
use crate::score::NoteGroup;
use crate::timing::Clock;

/// Strike every mapped key of `group` together.
///
/// Unmapped identifiers are skipped with a warning. All resolved keys are
/// pressed back to back, held for `hold`, then released in the same order.
/// Keys whose press failed are neither held nor released. The actuator lock
/// is not held during the hold. Returns the number of keys pressed.
pub fn dispatch(
    group: &NoteGroup,
    mapping: &KeyMapping,
    actuator: &SharedActuator,
    clock: &dyn Clock,
    hold: Duration,
) -> usize {
    let keys: Vec<&str> = group
        .keys
        .iter()
        .filter_map(|name| {
            let physical = mapping.resolve(name);
            if physical.is_none() {
                warn!(key = %name, offset_ms = group.offset_ms, "No key mapping, skipping");
            }
            physical
        })
        .collect();

    if keys.is_empty() {
        return 0;
    }

    debug!(offset_ms = group.offset_ms, keys = ?keys, "Dispatching note group");

    let pressed: Vec<&str> = {
        let mut actuator = actuator::lock(actuator);
        keys.into_iter()
            .filter(|key| match actuator.press(key) {
                Ok(()) => true,
                Err(e) => {
                    warn!(key, error = %e, "Key press failed");
                    false
                }
            })
            .collect()
    };

    if pressed.is_empty() {
        return 0;
    }

    clock.sleep(hold);

    {
        let mut actuator = actuator::lock(actuator);
        for key in &pressed {
            if let Err(e) = actuator.release(key) {
                warn!(key, error = %e, "Key release failed");
            }
        }
    }

    pressed.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::{shared, KeyActuator};
    use crate::timing::ManualClock;
    use anyhow::{bail, Result};
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<(Duration, String)>>>;

    /// Records key events with their virtual timestamp
    struct Recorder {
        clock: Arc<ManualClock>,
        log: Log,
        fail_on: Option<&'static str>,
        fail_all: bool,
    }

    impl KeyActuator for Recorder {
        fn press(&mut self, key: &str) -> Result<()> {
            if self.fail_all || self.fail_on == Some(key) {
                bail!("device busy");
            }
            self.log.lock().unwrap().push((self.clock.elapsed(), format!("down:{}", key)));
            Ok(())
        }

        fn release(&mut self, key: &str) -> Result<()> {
            self.log.lock().unwrap().push((self.clock.elapsed(), format!("up:{}", key)));
            Ok(())
        }
    }

    fn setup(fail_on: Option<&'static str>) -> (Arc<ManualClock>, Log, SharedActuator) {
        setup_with(fail_on, false)
    }

    fn setup_with(
        fail_on: Option<&'static str>,
        fail_all: bool,
    ) -> (Arc<ManualClock>, Log, SharedActuator) {
        let clock = Arc::new(ManualClock::new());
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let actuator = shared(Recorder {
            clock: clock.clone(),
            log: log.clone(),
            fail_on,
            fail_all,
        });
        (clock, log, actuator)
    }

    fn mapping() -> KeyMapping {
        KeyMapping::new()
            .with("bass_drum", "s")
            .with("snare", "d")
            .with("close_hi_hat", "j")
    }

    #[test]
    fn test_press_hold_release() {
        let (clock, log, actuator) = setup(None);
        let group = NoteGroup::new(0, ["snare", "bass_drum"]);

        let pressed = dispatch(&group, &mapping(), &actuator, clock.as_ref(), Duration::from_millis(50));
        assert_eq!(pressed, 2);

        let log = log.lock().unwrap();
        let events: Vec<&str> = log.iter().map(|(_, e)| e.as_str()).collect();
        // Keys are ordered by identifier: bass_drum, snare
        assert_eq!(events, vec!["down:s", "down:d", "up:s", "up:d"]);
        assert_eq!(log[0].0, Duration::ZERO);
        assert_eq!(log[1].0, Duration::ZERO);
        assert_eq!(log[2].0, Duration::from_millis(50));
        assert_eq!(log[3].0, Duration::from_millis(50));
    }

    #[test]
    fn test_unmapped_keys_skipped() {
        let (clock, log, actuator) = setup(None);
        let group = NoteGroup::new(0, ["cowbell", "snare"]);

        let pressed = dispatch(&group, &mapping(), &actuator, clock.as_ref(), Duration::from_millis(50));
        assert_eq!(pressed, 1);

        let events: Vec<String> = log.lock().unwrap().iter().map(|(_, e)| e.clone()).collect();
        assert_eq!(events, vec!["down:d", "up:d"]);
    }

    #[test]
    fn test_nothing_mapped_has_no_effect() {
        let (clock, log, actuator) = setup(None);
        let group = NoteGroup::new(0, ["cowbell", "triangle"]);

        let pressed = dispatch(&group, &mapping(), &actuator, clock.as_ref(), Duration::from_millis(50));
        assert_eq!(pressed, 0);
        assert!(log.lock().unwrap().is_empty());
        // No hold either
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_actuator_failure_does_not_abort() {
        let (clock, log, actuator) = setup(Some("s"));
        let group = NoteGroup::new(0, ["bass_drum", "snare"]);

        let pressed = dispatch(&group, &mapping(), &actuator, clock.as_ref(), Duration::from_millis(50));
        assert_eq!(pressed, 1);

        // The key that never went down is not released
        let events: Vec<String> = log.lock().unwrap().iter().map(|(_, e)| e.clone()).collect();
        assert_eq!(events, vec!["down:d", "up:d"]);
    }

    #[test]
    fn test_all_presses_failing() {
        let (clock, log, actuator) = setup_with(None, true);
        let group = NoteGroup::new(0, ["snare"]);

        let pressed = dispatch(&group, &mapping(), &actuator, clock.as_ref(), Duration::from_millis(50));
        assert_eq!(pressed, 0);
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }
}
