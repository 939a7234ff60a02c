//! Rig-wide constants for the Selene workspace.
//!
//! Single source of truth for default timings and budgets. Every value here
//! can be overridden from the rig configuration file.

use std::time::Duration;

/// Smallest timeout a wait primitive will ever use.
///
/// Zero or negative timeouts are normalised to this value.
pub const MIN_WAIT_TIMEOUT: Duration = Duration::from_secs(1);

/// Poll intervals below this are raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default interval between two polls of a device variable.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default timeout of a generic status wait.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Multiplier applied to an estimated travel time.
pub const DEFAULT_SAFETY_FACTOR: f64 = 2.0;

/// Fixed margin added to a travel-time based timeout.
pub const DEFAULT_MOVE_MARGIN: Duration = Duration::from_secs(1);

/// Settle delay after a reset or a completed positioning.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(500);

/// Command-done phase 1: `bDone` must drop within this time.
pub const DEFAULT_DONE_LOW_TIMEOUT: Duration = Duration::from_secs(5);

/// Command-done phase 2: `bBusy` must rise within this time.
pub const DEFAULT_BUSY_HIGH_TIMEOUT: Duration = Duration::from_secs(5);

/// Command-done phase 3 when no travel estimate is available.
pub const DEFAULT_DONE_HIGH_TIMEOUT: Duration = Duration::from_secs(30);

/// Pneumatic phases 1 and 2 (end switch released, motion flag raised).
pub const DEFAULT_PNEUMATIC_START_TIMEOUT: Duration = Duration::from_secs(3);

/// Number of corrective nudges allowed after a collided insertion.
pub const DEFAULT_COLLISION_RETRIES: u32 = 5;

/// Default number of worklist entries per section period.
pub const DEFAULT_SECTION_PERIOD: usize = 6;

/// Default number of consecutive "top" entries per section period.
pub const DEFAULT_SECTION_BLOCK: usize = 3;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/selene/rig.toml";

/// Normalise a timeout given in seconds.
///
/// Non-positive and non-finite values map to [`MIN_WAIT_TIMEOUT`].
pub fn timeout_from_secs(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        MIN_WAIT_TIMEOUT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn constants_are_consistent() {
        assert!(MIN_WAIT_TIMEOUT > Duration::ZERO);
        assert!(MIN_POLL_INTERVAL < DEFAULT_POLL_INTERVAL);
        assert!(DEFAULT_POLL_INTERVAL <= DEFAULT_WAIT_TIMEOUT);
        assert!(DEFAULT_SAFETY_FACTOR >= 1.0);
        assert!(DEFAULT_SECTION_BLOCK < DEFAULT_SECTION_PERIOD);
        assert_eq!(DEFAULT_COLLISION_RETRIES, 5);
    }

    #[test]
    fn positive_seconds_are_kept() {
        assert_eq!(timeout_from_secs(2.5), Duration::from_millis(2500));
    }

    #[test]
    fn nan_is_normalised() {
        assert_eq!(timeout_from_secs(f64::NAN), MIN_WAIT_TIMEOUT);
        assert_eq!(timeout_from_secs(f64::NEG_INFINITY), MIN_WAIT_TIMEOUT);
    }

    proptest! {
        #[test]
        fn non_positive_seconds_become_one_second(secs in -1.0e9f64..=0.0) {
            prop_assert_eq!(timeout_from_secs(secs), Duration::from_secs(1));
        }
    }
}
