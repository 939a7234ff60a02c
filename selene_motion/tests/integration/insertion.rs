//! Integration test: hex-key insertion with collision retry.

use selene_common::plc::MotionFunction;
use selene_hal::drivers::simulation::{ERROR_NOT_READY, InsertionScript};
use selene_motion::config::InsertionConfig;
use selene_motion::error::{FailureKind, InsertionError, MotionError, Severity};
use selene_motion::recovery::insert_with_retry;
use selene_motion::wait::CommandPhase;

use super::{INSERTION_AXIS, ROTATION_AXIS, SimRig};

#[test]
fn clean_insertion_needs_no_nudge() {
    let sim = SimRig::new();
    let report = insert_with_retry(&sim.rig, &InsertionConfig::default()).unwrap();

    assert_eq!(report.nudges, 0);
    assert_eq!(report.severity(), None);
    assert_eq!(sim.plc.insertion_attempts(), 1);
    assert_eq!(sim.plc.axis_position(INSERTION_AXIS), Some(0.0));
    assert_eq!(sim.plc.command_count(ROTATION_AXIS, MotionFunction::MoveRelative), 0);
}

#[test]
fn collided_key_goes_in_on_last_nudge() {
    let sim = SimRig::new();
    sim.plc
        .queue_insertions([InsertionScript::CollideThenInsert { nudges: 5 }]);

    let report = insert_with_retry(&sim.rig, &InsertionConfig::default()).unwrap();

    assert_eq!(report.nudges, 5);
    assert_eq!(report.severity(), Some(Severity::Transient));
    assert_eq!(sim.plc.command_count(ROTATION_AXIS, MotionFunction::MoveRelative), 5);
    assert_eq!(sim.plc.axis_position(ROTATION_AXIS), Some(250.0));
}

#[test]
fn endless_collision_exhausts_retry_budget() {
    let sim = SimRig::new();
    sim.plc.queue_insertions([InsertionScript::CollideForever]);

    let err = insert_with_retry(&sim.rig, &InsertionConfig::default()).unwrap_err();

    assert_eq!(err, InsertionError::CollisionRetriesExhausted { nudges: 5 });
    assert_eq!(err.severity(), Severity::PerEntry);
    assert_eq!(err.failure_kind(), FailureKind::CollisionRetriesExhausted);
    assert_eq!(sim.plc.command_count(ROTATION_AXIS, MotionFunction::MoveRelative), 5);
}

#[test]
fn smaller_budget_is_honoured() {
    let sim = SimRig::new();
    sim.plc
        .queue_insertions([InsertionScript::CollideThenInsert { nudges: 3 }]);
    let config = InsertionConfig {
        max_retries: 2,
        ..InsertionConfig::default()
    };

    let err = insert_with_retry(&sim.rig, &config).unwrap_err();

    assert_eq!(err, InsertionError::CollisionRetriesExhausted { nudges: 2 });
    assert_eq!(sim.plc.command_count(ROTATION_AXIS, MotionFunction::MoveRelative), 2);
}

#[test]
fn missed_key_is_not_retried() {
    let sim = SimRig::new();
    sim.plc.queue_insertions([InsertionScript::Missed]);

    let err = insert_with_retry(&sim.rig, &InsertionConfig::default()).unwrap_err();

    assert_eq!(err, InsertionError::Missed);
    assert_eq!(err.failure_kind(), FailureKind::InsertionMissed);
    assert_eq!(sim.plc.insertion_attempts(), 1);
    assert_eq!(sim.plc.command_count(ROTATION_AXIS, MotionFunction::MoveRelative), 0);
}

#[test]
fn no_outcome_flag_is_unexpected_state() {
    let sim = SimRig::new();
    sim.plc.queue_insertions([InsertionScript::NoFlags]);

    let err = insert_with_retry(&sim.rig, &InsertionConfig::default()).unwrap_err();

    assert_eq!(
        err,
        InsertionError::UnexpectedState {
            inserted: false,
            collided: false,
            missed: false,
        }
    );
    assert_eq!(err.failure_kind(), FailureKind::UnexpectedInsertionState);
}

#[test]
fn faulted_insertion_axis_fails_the_entry() {
    let sim = SimRig::new();
    sim.plc.inject_axis_error(INSERTION_AXIS, ERROR_NOT_READY);

    let err = insert_with_retry(&sim.rig, &InsertionConfig::default()).unwrap_err();

    assert!(matches!(
        err,
        InsertionError::Motion(MotionError::CommandPhaseTimeout {
            axis: INSERTION_AXIS,
            phase: CommandPhase::BusyHigh,
            ..
        })
    ));
    assert_eq!(err.severity(), Severity::PerEntry);
    assert_eq!(sim.plc.insertion_attempts(), 0);
}

#[test]
fn unknown_flag_symbol_is_a_device_error() {
    let sim = SimRig::new();
    let mut config = InsertionConfig::default();
    config.flags.inserted = "Hex_Screw_States_8_9.bNoSuchFlag".to_string();

    let err = insert_with_retry(&sim.rig, &config).unwrap_err();

    assert!(matches!(err, InsertionError::Motion(MotionError::Link(_))));
    assert_eq!(err.severity(), Severity::Device);
}
