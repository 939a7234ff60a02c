//! Integration test: moving onto a hardware limit switch.

use selene_common::plc::{AxisStatusBit, MotionFunction};
use selene_hal::drivers::simulation::SimAxisConfig;
use selene_motion::axis::Direction;
use selene_motion::error::MotionError;
use selene_motion::recovery::move_to_limit_switch;
use std::time::Duration;

use super::{ROTATION_AXIS, SimRig, TRAVEL, simulation};

fn rig_with_rotation(rotation: SimAxisConfig) -> SimRig {
    let mut config = simulation();
    config.axes.retain(|a| a.index != ROTATION_AXIS);
    config.axes.push(rotation);
    SimRig::with_simulation(config)
}

#[test]
fn soft_limits_are_disabled_before_the_move() {
    let sim = rig_with_rotation(SimAxisConfig {
        position: 100.0,
        travel_min: Some(0.0),
        travel_max: Some(TRAVEL),
        soft_limit_fwd: 300.0,
        soft_limit_bwd: 10.0,
        soft_limits_enabled: true,
        ..SimAxisConfig::new(ROTATION_AXIS)
    });

    move_to_limit_switch(
        &sim.rig,
        ROTATION_AXIS,
        Direction::Forward,
        20.0,
        Duration::from_secs(60),
    )
    .unwrap();

    let axis = sim.rig.axis(ROTATION_AXIS);
    assert!(!axis.soft_limits_enabled().unwrap());
    assert_eq!(sim.plc.axis_position(ROTATION_AXIS), Some(TRAVEL));
    assert!(!axis.read_bit(AxisStatusBit::LimitFwd).unwrap());
}

#[test]
fn axis_on_the_switch_backs_off_first() {
    let sim = rig_with_rotation(SimAxisConfig {
        position: TRAVEL,
        travel_min: Some(0.0),
        travel_max: Some(TRAVEL),
        ..SimAxisConfig::new(ROTATION_AXIS)
    });

    move_to_limit_switch(
        &sim.rig,
        ROTATION_AXIS,
        Direction::Forward,
        5.0,
        Duration::from_secs(10),
    )
    .unwrap();

    assert_eq!(sim.plc.command_count(ROTATION_AXIS, MotionFunction::MoveRelative), 1);
    assert_eq!(sim.plc.axis_position(ROTATION_AXIS), Some(TRAVEL));
}

#[test]
fn switch_that_never_releases_is_stuck() {
    let sim = rig_with_rotation(SimAxisConfig {
        position: TRAVEL + 20.0,
        travel_min: Some(0.0),
        travel_max: Some(TRAVEL),
        ..SimAxisConfig::new(ROTATION_AXIS)
    });

    let err = move_to_limit_switch(
        &sim.rig,
        ROTATION_AXIS,
        Direction::Forward,
        5.0,
        Duration::from_secs(10),
    )
    .unwrap_err();

    assert_eq!(
        err,
        MotionError::LimitSwitchStuck {
            axis: ROTATION_AXIS,
            direction: Direction::Forward,
            attempts: 3,
        }
    );
    assert_eq!(sim.plc.command_count(ROTATION_AXIS, MotionFunction::MoveVelocity), 0);
}

#[test]
fn missing_switch_times_out_and_halts() {
    let sim = rig_with_rotation(SimAxisConfig {
        position: 0.0,
        ..SimAxisConfig::new(ROTATION_AXIS)
    });

    let err = move_to_limit_switch(
        &sim.rig,
        ROTATION_AXIS,
        Direction::Forward,
        5.0,
        Duration::from_secs(10),
    )
    .unwrap_err();

    assert!(matches!(err, MotionError::WaitTimeout { axis: ROTATION_AXIS, .. }));
    let position = sim.plc.axis_position(ROTATION_AXIS).unwrap();
    sim.clock.advance(Duration::from_secs(5));
    assert_eq!(sim.plc.axis_position(ROTATION_AXIS), Some(position));
}
