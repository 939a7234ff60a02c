//! Integration test: complete sequencer runs on the simulated rig.

use selene_common::plc::MotionFunction;
use selene_hal::drivers::simulation::{ERROR_NOT_READY, InsertionScript};
use selene_motion::config::RotationHomingConfig;
use selene_motion::error::{FailureKind, Severity};
use selene_motion::sequencer::{
    EntryResult, GateDecision, MemorySink, ResultsTable, ScriptedGate, Section, Sequencer,
    SequencerError, SequencerState, WorklistEntry,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::{INSERTION_AXIS, ROTATION_AXIS, SimRig, TRAVEL, X_AXIS, Z_AXIS, sequence};

fn worklist(len: usize) -> ResultsTable {
    ResultsTable::from_positions((0..len).map(|i| (10.0 * (i + 1) as f64, 5.0)))
}

fn results(table: &ResultsTable) -> Vec<EntryResult> {
    table.entries().iter().map(|e| e.result).collect()
}

#[test]
fn every_entry_measured() {
    let sim = SimRig::new();
    let sink = MemorySink::new();
    let mut sequencer = Sequencer::new(sim.rig, sequence()).with_sink(sink.clone());
    let mut table = worklist(3);

    let summary = sequencer.run(&mut table).unwrap();

    assert_eq!(sequencer.state(), SequencerState::Complete);
    assert_eq!(summary.measured, 3);
    assert_eq!(summary.processed, 3);
    assert!(!summary.interrupted);
    assert_eq!(results(&table), vec![EntryResult::Range(TRAVEL); 3]);
    assert_eq!(sim.plc.insertion_attempts(), 3);
    assert_eq!(sim.plc.command_count(INSERTION_AXIS, MotionFunction::Home), 1);
    assert_eq!(sim.plc.command_count(9, MotionFunction::Home), 1);
    assert_eq!(sim.plc.axis_position(X_AXIS), Some(30.0));
    assert_eq!(sim.plc.axis_position(Z_AXIS), Some(5.0));

    // Initial snapshot plus one per entry.
    let snapshots = sink.snapshots();
    assert_eq!(snapshots.len(), 4);
    assert_eq!(snapshots[1].result(0), Some(EntryResult::Range(TRAVEL)));
    assert_eq!(snapshots[1].result(1), Some(EntryResult::Pending));
    assert_eq!(sink.last(), Some(table));
}

#[test]
fn missed_insertion_fails_only_its_entry() {
    let sim = SimRig::new();
    sim.plc.queue_insertions([
        InsertionScript::Inserted,
        InsertionScript::CollideThenInsert { nudges: 2 },
        InsertionScript::Missed,
    ]);
    let mut sequencer = Sequencer::new(sim.rig, sequence());
    let mut table = worklist(5);

    let summary = sequencer.run(&mut table).unwrap();

    assert_eq!(
        results(&table),
        vec![
            EntryResult::Range(TRAVEL),
            EntryResult::Range(TRAVEL),
            EntryResult::Failed(FailureKind::InsertionMissed),
            EntryResult::Range(TRAVEL),
            EntryResult::Range(TRAVEL),
        ]
    );
    assert_eq!(table.entries()[2].result.range_cell(), "FAIL");
    assert_eq!(summary.measured, 4);
    assert_eq!(summary.failed, 1);
    // No sweep after the missed key.
    assert_eq!(sim.plc.command_count(ROTATION_AXIS, MotionFunction::MoveVelocity), 8);
}

#[test]
fn exhausted_collision_retries_are_recorded() {
    let sim = SimRig::new();
    sim.plc.queue_insertions([InsertionScript::CollideForever]);
    let mut sequencer = Sequencer::new(sim.rig, sequence());
    let mut table = worklist(2);

    sequencer.run(&mut table).unwrap();

    assert_eq!(
        table.result(0),
        Some(EntryResult::Failed(FailureKind::CollisionRetriesExhausted))
    );
    assert_eq!(table.result(1), Some(EntryResult::Range(TRAVEL)));
}

#[test]
fn stalled_positioning_aborts_the_run() {
    let sim = SimRig::new();
    sim.plc.stall_on_target(X_AXIS, 30.0);
    let sink = MemorySink::new();
    let mut sequencer = Sequencer::new(sim.rig, sequence()).with_sink(sink.clone());
    let mut table = worklist(4);

    let err = sequencer.run(&mut table).unwrap_err();

    assert!(matches!(
        err,
        SequencerError::PositionTimeout { index: 2, timeout } if timeout == Duration::from_secs(20)
    ));
    assert_eq!(err.severity(), Severity::Fatal);
    assert_eq!(sequencer.state(), SequencerState::Aborted);
    assert_eq!(
        results(&table),
        vec![
            EntryResult::Range(TRAVEL),
            EntryResult::Range(TRAVEL),
            EntryResult::Pending,
            EntryResult::Pending,
        ]
    );
    assert_eq!(sink.last(), Some(table));
    assert_eq!(sim.plc.insertion_attempts(), 2);
}

#[test]
fn axis_fault_while_positioning_aborts_the_run() {
    let sim = SimRig::new();
    let plc = sim.plc.clone();
    let gate = move |index: usize, _: &WorklistEntry| {
        if index == 1 {
            plc.inject_axis_error(Z_AXIS, ERROR_NOT_READY);
        }
        GateDecision::Proceed
    };
    let mut sequencer = Sequencer::new(sim.rig, sequence()).with_gate(gate);
    let mut table = worklist(3);

    let err = sequencer.run(&mut table).unwrap_err();

    assert!(matches!(
        err,
        SequencerError::PositionFault {
            index: 1,
            axis: Z_AXIS,
            error_id: ERROR_NOT_READY,
        }
    ));
    assert_eq!(table.result(0), Some(EntryResult::Range(TRAVEL)));
    assert_eq!(table.result(1), Some(EntryResult::Pending));
}

#[test]
fn device_error_during_insertion_is_escalated() {
    let sim = SimRig::new();
    let mut config = sequence();
    config.insertion.flags.missed = "Hex_Screw_States_8_9.bNoSuchFlag".to_string();
    let mut sequencer = Sequencer::new(sim.rig, config);
    let mut table = worklist(2);

    let err = sequencer.run(&mut table).unwrap_err();

    assert!(matches!(err, SequencerError::Insertion { index: 0, .. }));
    assert_eq!(err.severity(), Severity::Device);
    assert_eq!(table.result(0), Some(EntryResult::Pending));
}

#[test]
fn top_section_leaves_bottom_entries_unselected() {
    let sim = SimRig::new();
    let mut sequencer = Sequencer::new(sim.rig, sequence()).with_section(Section::Top);
    let mut table = worklist(6);

    let summary = sequencer.run(&mut table).unwrap();

    assert_eq!(
        results(&table),
        vec![
            EntryResult::Range(TRAVEL),
            EntryResult::Range(TRAVEL),
            EntryResult::Range(TRAVEL),
            EntryResult::NotSelected,
            EntryResult::NotSelected,
            EntryResult::NotSelected,
        ]
    );
    assert_eq!(summary.not_selected, 3);
    assert_eq!(sim.plc.insertion_attempts(), 3);
}

#[test]
fn operator_skip_records_skipped() {
    let sim = SimRig::new();
    let gate = ScriptedGate::new([
        GateDecision::Proceed,
        GateDecision::Skip,
        GateDecision::Proceed,
    ]);
    let mut sequencer = Sequencer::new(sim.rig, sequence()).with_gate(gate);
    let mut table = worklist(3);

    let summary = sequencer.run(&mut table).unwrap();

    assert_eq!(table.result(1), Some(EntryResult::Skipped));
    assert_eq!(table.entries()[1].result.status_cell(), "skipped");
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.measured, 2);
    assert_eq!(sim.plc.insertion_attempts(), 2);
}

#[test]
fn stop_request_ends_run_between_entries() {
    let sim = SimRig::new();
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    let gate = move |index: usize, _: &WorklistEntry| {
        if index == 1 {
            flag.store(true, Ordering::SeqCst);
        }
        GateDecision::Proceed
    };
    let mut sequencer = Sequencer::new(sim.rig, sequence())
        .with_gate(gate)
        .with_stop_flag(stop);
    let mut table = worklist(4);

    let summary = sequencer.run(&mut table).unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.measured, 2);
    assert_eq!(summary.pending, 2);
    assert_eq!(sequencer.state(), SequencerState::Complete);
}

#[test]
fn unhomed_rotation_axis_is_homed_through_first_entry() {
    let mut simulation = super::simulation();
    for axis in &mut simulation.axes {
        if axis.index == ROTATION_AXIS {
            axis.homed = false;
        }
    }
    let sim = SimRig::with_simulation(simulation);
    let mut config = sequence();
    config.rotation_homing = Some(RotationHomingConfig {
        axis: ROTATION_AXIS,
        timeout: Duration::from_secs(30),
    });
    let mut sequencer = Sequencer::new(sim.rig, config);
    let mut table = worklist(2);

    sequencer.run(&mut table).unwrap();

    assert_eq!(sim.plc.command_count(ROTATION_AXIS, MotionFunction::Home), 1);
    // One insertion for homing, one per entry.
    assert_eq!(sim.plc.insertion_attempts(), 3);
    assert_eq!(results(&table), vec![EntryResult::Range(TRAVEL); 2]);

    // Already homed: no second homing.
    let rig = sequencer.into_rig();
    let mut config = sequence();
    config.rotation_homing = Some(RotationHomingConfig {
        axis: ROTATION_AXIS,
        timeout: Duration::from_secs(30),
    });
    let mut sequencer = Sequencer::new(rig, config);
    let mut table = worklist(1);
    sequencer.run(&mut table).unwrap();
    assert_eq!(sim.plc.command_count(ROTATION_AXIS, MotionFunction::Home), 1);
}

#[test]
fn dropping_the_sequencer_releases_the_link() {
    let sim = SimRig::new();
    let sequencer = Sequencer::new(sim.rig, sequence());
    drop(sequencer);
    assert!(!selene_common::link::DeviceLink::is_open(&sim.plc));
}
