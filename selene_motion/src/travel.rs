//! Travel-time estimation.
//!
//! Trapezoidal profile: accelerate to the commanded velocity, cruise,
//! decelerate. Inputs are validated before any division; a zero or
//! non-finite divisor yields [`TravelTimeError`] instead of a bogus timeout.

use std::time::Duration;

use crate::error::TravelTimeError;

/// Kinematics of one positioning move as read from the axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveProfile {
    pub velocity: f64,
    pub acceleration: f64,
    pub deceleration: f64,
    /// Signed or unsigned distance; only the magnitude is used.
    pub distance: f64,
}

fn nonzero(quantity: &'static str, value: f64) -> Result<f64, TravelTimeError> {
    if value.is_finite() && value != 0.0 {
        Ok(value.abs())
    } else {
        Err(TravelTimeError::InvalidInput { quantity, value })
    }
}

fn finite(quantity: &'static str, value: f64) -> Result<f64, TravelTimeError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TravelTimeError::InvalidInput { quantity, value })
    }
}

fn positive(quantity: &'static str, value: f64) -> Result<f64, TravelTimeError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(TravelTimeError::InvalidInput { quantity, value })
    }
}

fn to_duration(secs: f64) -> Result<Duration, TravelTimeError> {
    Duration::try_from_secs_f64(secs).map_err(|_| TravelTimeError::InvalidInput {
        quantity: "travel time",
        value: secs,
    })
}

/// Expected duration of a positioning move, multiplied by `safety_factor`.
///
/// The ramp-down distance uses the deceleration. When the move is too short
/// to reach cruise velocity the cruise phase is dropped.
pub fn estimate_move_time(
    profile: &MoveProfile,
    safety_factor: f64,
) -> Result<Duration, TravelTimeError> {
    let velocity = nonzero("velocity", profile.velocity)?;
    let acceleration = nonzero("acceleration", profile.acceleration)?;
    let deceleration = nonzero("deceleration", profile.deceleration)?;
    let distance = finite("distance", profile.distance)?.abs();
    let factor = positive("safety factor", safety_factor)?;

    let accel_time = velocity / acceleration;
    let decel_time = velocity / deceleration;
    let accel_distance = 0.5 * acceleration * accel_time * accel_time;
    let decel_distance = 0.5 * deceleration * decel_time * decel_time;
    let cruise_distance = (distance - accel_distance - decel_distance).max(0.0);

    to_duration((accel_time + cruise_distance / velocity + decel_time) * factor)
}

/// Time for a full back-and-forth pass over the soft-limit range at homing
/// velocity.
pub fn estimate_range_time(
    soft_limit_fwd: f64,
    soft_limit_bwd: f64,
    homing_velocity: f64,
    safety_factor: f64,
) -> Result<Duration, TravelTimeError> {
    if soft_limit_fwd == 0.0 && soft_limit_bwd == 0.0 {
        return Err(TravelTimeError::NoSoftLimits);
    }
    let range = (finite("forward soft limit", soft_limit_fwd)?
        - finite("backward soft limit", soft_limit_bwd)?)
    .abs();
    let velocity = nonzero("homing velocity", homing_velocity)?;
    let factor = positive("safety factor", safety_factor)?;
    to_duration(2.0 * range / velocity * factor)
}

/// Time to ramp from standstill to `velocity`.
pub fn estimate_accel_time(
    velocity: f64,
    acceleration: f64,
    safety_factor: f64,
) -> Result<Duration, TravelTimeError> {
    let velocity = finite("velocity", velocity)?.abs();
    let acceleration = nonzero("acceleration", acceleration)?;
    let factor = positive("safety factor", safety_factor)?;
    to_duration(velocity / acceleration * factor)
}

/// Time to ramp from `velocity` down to standstill.
pub fn estimate_decel_time(
    velocity: f64,
    deceleration: f64,
    safety_factor: f64,
) -> Result<Duration, TravelTimeError> {
    let velocity = finite("velocity", velocity)?.abs();
    let deceleration = nonzero("deceleration", deceleration)?;
    let factor = positive("safety factor", safety_factor)?;
    to_duration(velocity / deceleration * factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn secs(d: Duration) -> f64 {
        d.as_secs_f64()
    }

    fn profile(distance: f64) -> MoveProfile {
        MoveProfile {
            velocity: 10.0,
            acceleration: 100.0,
            deceleration: 50.0,
            distance,
        }
    }

    #[test]
    fn long_move_has_cruise_phase() {
        // 0.1 s up, 0.2 s down, 98.5 mm at 10 mm/s.
        let t = estimate_move_time(&profile(100.0), 2.0).unwrap();
        assert!((secs(t) - 20.3).abs() < 1e-9);
    }

    #[test]
    fn short_move_has_no_negative_cruise() {
        let t = estimate_move_time(&profile(0.1), 1.0).unwrap();
        assert!((secs(t) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn direction_does_not_matter() {
        assert_eq!(
            estimate_move_time(&profile(-40.0), 2.0),
            estimate_move_time(&profile(40.0), 2.0)
        );
    }

    #[test]
    fn zero_divisors_are_rejected() {
        for (broken, quantity) in [
            (MoveProfile { velocity: 0.0, ..profile(1.0) }, "velocity"),
            (MoveProfile { acceleration: 0.0, ..profile(1.0) }, "acceleration"),
            (MoveProfile { deceleration: f64::NAN, ..profile(1.0) }, "deceleration"),
        ] {
            match estimate_move_time(&broken, 2.0) {
                Err(TravelTimeError::InvalidInput { quantity: q, .. }) => assert_eq!(q, quantity),
                other => panic!("expected {quantity} error, got {other:?}"),
            }
        }
        assert!(estimate_move_time(&profile(1.0), 0.0).is_err());
    }

    #[test]
    fn range_needs_soft_limits() {
        assert_eq!(
            estimate_range_time(0.0, 0.0, 2.0, 2.0),
            Err(TravelTimeError::NoSoftLimits)
        );
        let t = estimate_range_time(100.0, -20.0, 4.0, 1.5).unwrap();
        assert!((secs(t) - 90.0).abs() < 1e-9);
        assert!(estimate_range_time(100.0, 0.0, 0.0, 2.0).is_err());
    }

    #[test]
    fn ramp_times() {
        let accel = estimate_accel_time(2.0, 8.0, 2.0).unwrap();
        assert!((secs(accel) - 0.5).abs() < 1e-9);
        let decel = estimate_decel_time(-50.0, 100.0, 1.0).unwrap();
        assert!((secs(decel) - 0.5).abs() < 1e-9);
        assert!(estimate_decel_time(50.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn absurd_ratios_do_not_panic() {
        let tiny = MoveProfile {
            velocity: 1e-300,
            ..profile(1e300)
        };
        assert!(estimate_move_time(&tiny, 2.0).is_err());
    }

    proptest! {
        #[test]
        fn estimate_grows_with_distance(
            short in 0.0f64..1_000.0,
            extra in 0.0f64..1_000.0,
            velocity in 0.1f64..100.0,
        ) {
            let p = |distance| MoveProfile { velocity, acceleration: 50.0, deceleration: 25.0, distance };
            let a = estimate_move_time(&p(short), 2.0).unwrap();
            let b = estimate_move_time(&p(short + extra), 2.0).unwrap();
            prop_assert!(b >= a);
        }
    }
}
