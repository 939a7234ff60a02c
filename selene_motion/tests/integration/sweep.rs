//! Integration test: full-range sweep of the rotation axis.

use selene_common::plc::MotionFunction;
use selene_hal::drivers::simulation::{ERROR_NOT_READY, SimAxisConfig};
use selene_motion::axis::Direction;
use selene_motion::config::SweepConfig;
use selene_motion::error::{FailureKind, MotionError, SweepError};
use selene_motion::recovery::measure_full_range;
use std::time::Duration;

use super::{ROTATION_AXIS, SimRig, TRAVEL, simulation};

fn sweep() -> SweepConfig {
    SweepConfig {
        axis: ROTATION_AXIS,
        timeout: Duration::from_secs(120),
        nudge_off: 5.0,
    }
}

#[test]
fn sweep_reports_both_hard_stops() {
    let sim = SimRig::new();

    let report = measure_full_range(&sim.rig, &sweep()).unwrap();

    assert_eq!(report.forward, TRAVEL);
    assert_eq!(report.backward, 0.0);
    assert_eq!(report.range(), TRAVEL);
    // Nudged off the backward stop and left error-free.
    assert_eq!(sim.plc.axis_position(ROTATION_AXIS), Some(5.0));
    assert!(sim.rig.axis(ROTATION_AXIS).check_fault().is_ok());
    assert_eq!(sim.plc.command_count(ROTATION_AXIS, MotionFunction::MoveVelocity), 2);
    assert_eq!(sim.plc.command_count(ROTATION_AXIS, MotionFunction::MoveRelative), 2);
}

#[test]
fn zero_nudge_off_stays_on_the_stop() {
    let sim = SimRig::new();
    let config = SweepConfig {
        nudge_off: 0.0,
        ..sweep()
    };

    let report = measure_full_range(&sim.rig, &config).unwrap();

    assert_eq!(report.range(), TRAVEL);
    assert_eq!(sim.plc.axis_position(ROTATION_AXIS), Some(0.0));
    assert_eq!(sim.plc.command_count(ROTATION_AXIS, MotionFunction::MoveRelative), 0);
}

#[test]
fn missing_backward_stop_reports_no_range() {
    let mut config = simulation();
    let rotation = config
        .axes
        .iter_mut()
        .find(|a| a.index == ROTATION_AXIS)
        .unwrap();
    *rotation = SimAxisConfig {
        position: 340.0,
        travel_min: None,
        travel_max: Some(TRAVEL),
        ..SimAxisConfig::new(ROTATION_AXIS)
    };
    let sim = SimRig::with_simulation(config);
    let sweep = SweepConfig {
        timeout: Duration::from_secs(30),
        ..sweep()
    };

    let err = measure_full_range(&sim.rig, &sweep).unwrap_err();

    assert_eq!(err, SweepError::ExtremeNotReached(Direction::Backward));
    assert_eq!(err.failure_kind(), FailureKind::ExtremeNotReached);

    // The jog was released on timeout.
    let position = sim.plc.axis_position(ROTATION_AXIS).unwrap();
    sim.clock.advance(Duration::from_secs(5));
    assert_eq!(sim.plc.axis_position(ROTATION_AXIS), Some(position));
}

#[test]
fn stale_axis_error_fails_instead_of_measuring() {
    let sim = SimRig::new();
    sim.plc.inject_axis_error(ROTATION_AXIS, ERROR_NOT_READY);

    let err = measure_full_range(&sim.rig, &sweep()).unwrap_err();

    assert_eq!(
        err,
        SweepError::Motion(MotionError::AxisFault {
            axis: ROTATION_AXIS,
            error_id: ERROR_NOT_READY,
        })
    );
    assert_eq!(err.failure_kind(), FailureKind::SweepFault);
    assert_eq!(sim.plc.command_count(ROTATION_AXIS, MotionFunction::MoveVelocity), 0);
    assert_eq!(sim.plc.axis_position(ROTATION_AXIS), Some(100.0));
}

#[test]
fn disabled_axis_is_not_swept() {
    let mut config = simulation();
    let rotation = config
        .axes
        .iter_mut()
        .find(|a| a.index == ROTATION_AXIS)
        .unwrap();
    rotation.enabled = false;
    let sim = SimRig::with_simulation(config);

    let err = measure_full_range(&sim.rig, &sweep()).unwrap_err();

    assert_eq!(err, SweepError::Motion(MotionError::NotEnabled { axis: ROTATION_AXIS }));
    assert_eq!(sim.plc.command_count(ROTATION_AXIS, MotionFunction::MoveVelocity), 0);
}
