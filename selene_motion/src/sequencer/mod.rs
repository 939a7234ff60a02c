//! Acceptance sequencer.
//!
//! Drives a worklist of X/Z positions through
//!
//! ```text
//! Init ─► Homing ─► ┌─ Position ─► Insert ─► Measure ─► Record ─┐ ─► Complete
//!                   └──────────────── per selected entry ◄──────┘
//! ```
//!
//! Homing failures and positioning faults abort the run. Insertion and sweep
//! failures are recorded as `FAIL` against their entry and the run goes on.
//! The results table is persisted after every entry, so an abort loses at
//! most the entry in progress.

pub mod gate;
pub mod results;
pub mod section;

pub use gate::{AlwaysProceed, GateDecision, OperatorGate, ScriptedGate};
pub use results::{
    EntryResult, MemorySink, NullSink, ResultsError, ResultsSink, ResultsTable, RunSummary,
    WorklistEntry,
};
pub use section::{EntryFilter, Section, SectionRule, SectionSelection};

use selene_common::link::LinkError;
use selene_common::plc::{AxisIndex, AxisStatusBit, AxisValue};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::{NeutralAction, SequenceConfig};
use crate::error::{InsertionError, MotionError, Severity, SweepError};
use crate::recovery::{insert_with_retry, measure_full_range};
use crate::rig::Rig;
use crate::wait::{WaitOutcome, wait_for};

/// Where the sequencer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Init,
    Homing,
    Position { index: usize },
    Insert { index: usize },
    Measure { index: usize },
    Record { index: usize },
    Complete,
    Aborted,
}

impl fmt::Display for SequencerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => f.write_str("init"),
            Self::Homing => f.write_str("homing"),
            Self::Position { index } => write!(f, "position #{index}"),
            Self::Insert { index } => write!(f, "insert #{index}"),
            Self::Measure { index } => write!(f, "measure #{index}"),
            Self::Record { index } => write!(f, "record #{index}"),
            Self::Complete => f.write_str("complete"),
            Self::Aborted => f.write_str("aborted"),
        }
    }
}

/// Failures that end a run.
#[derive(Debug, Error)]
pub enum SequencerError {
    #[error("Homing of axis {axis} failed: {source}")]
    HomingFailed {
        axis: AxisIndex,
        #[source]
        source: MotionError,
    },

    #[error("Homing of rotation axis {axis} failed: {reason}")]
    RotationHomingFailed { axis: AxisIndex, reason: String },

    #[error("Entry {index}: X/Z not in position within {timeout:?}")]
    PositionTimeout { index: usize, timeout: Duration },

    #[error("Entry {index}: axis {axis} faulted while positioning (error id {error_id:#x})")]
    PositionFault {
        index: usize,
        axis: AxisIndex,
        error_id: u32,
    },

    #[error("Entry {index}: neutral action failed: {source}")]
    NeutralActionFailed {
        index: usize,
        #[source]
        source: MotionError,
    },

    #[error("Entry {index}: device error during insertion: {source}")]
    Insertion {
        index: usize,
        #[source]
        source: InsertionError,
    },

    #[error("Entry {index}: device error during sweep: {source}")]
    Sweep {
        index: usize,
        #[source]
        source: SweepError,
    },

    #[error(transparent)]
    Motion(#[from] MotionError),

    #[error("Failed to persist results: {0}")]
    Results(#[from] ResultsError),
}

impl SequencerError {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Motion(e) => e.severity(),
            Self::Insertion { .. } | Self::Sweep { .. } => Severity::Device,
            _ => Severity::Fatal,
        }
    }
}

impl From<LinkError> for SequencerError {
    fn from(e: LinkError) -> Self {
        Self::Motion(MotionError::Link(e))
    }
}

/// Runs one worklist on one rig.
pub struct Sequencer {
    rig: Rig,
    config: SequenceConfig,
    filter: Box<dyn EntryFilter>,
    gate: Box<dyn OperatorGate>,
    sink: Box<dyn ResultsSink>,
    stop: Arc<AtomicBool>,
    state: SequencerState,
}

impl Sequencer {
    /// Every axis named in `config` is registered with the rig for the
    /// safe-state release on drop.
    pub fn new(mut rig: Rig, config: SequenceConfig) -> Self {
        rig.guard_axes(config.linear_axes(), config.pneumatic_axes());
        let filter = SectionSelection::new(Section::All, config.section_rule);
        Self {
            rig,
            config,
            filter: Box::new(filter),
            gate: Box::new(AlwaysProceed),
            sink: Box::new(NullSink),
            stop: Arc::new(AtomicBool::new(false)),
            state: SequencerState::Init,
        }
    }

    pub fn with_filter(mut self, filter: impl EntryFilter + 'static) -> Self {
        self.filter = Box::new(filter);
        self
    }

    /// Select a section under the configured rule.
    pub fn with_section(self, section: Section) -> Self {
        let rule = self.config.section_rule;
        self.with_filter(SectionSelection::new(section, rule))
    }

    pub fn with_gate(mut self, gate: impl OperatorGate + 'static) -> Self {
        self.gate = Box::new(gate);
        self
    }

    pub fn with_sink(mut self, sink: impl ResultsSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Raised from outside (Ctrl-C) to end the run after the current entry.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn rig(&self) -> &Rig {
        &self.rig
    }

    pub fn into_rig(self) -> Rig {
        self.rig
    }

    fn transition(&mut self, next: SequencerState) {
        debug!(from = %self.state, to = %next, "Sequencer state");
        self.state = next;
    }

    /// Run the whole worklist.
    ///
    /// Per-entry failures end up in `table`; the returned error is reserved
    /// for failures that make continuing unsafe or pointless.
    pub fn run(&mut self, table: &mut ResultsTable) -> Result<RunSummary, SequencerError> {
        match self.execute(table) {
            Ok(summary) => {
                self.transition(SequencerState::Complete);
                info!(%summary, "Run complete");
                Ok(summary)
            }
            Err(e) => {
                self.transition(SequencerState::Aborted);
                error!(error = %e, "Run aborted");
                // The table is already persisted up to the last finished entry.
                if let Err(persist) = self.sink.persist(table) {
                    error!(error = %persist, "Failed to persist results after abort");
                }
                Err(e)
            }
        }
    }

    fn execute(&mut self, table: &mut ResultsTable) -> Result<RunSummary, SequencerError> {
        self.transition(SequencerState::Init);
        let selected = self.filter.select(table.len());
        for index in 0..table.len() {
            if !self.filter.selects(index) {
                table.set_result(index, EntryResult::NotSelected);
            }
        }
        info!(
            entries = table.len(),
            selected = selected.len(),
            "Worklist loaded"
        );
        self.sink.persist(table)?;

        self.transition(SequencerState::Homing);
        self.home_prerequisites()?;
        if let Some(&first) = selected.first() {
            self.home_rotation_axis(table, first)?;
        }

        let mut interrupted = false;
        for index in selected {
            if self.stop.load(Ordering::SeqCst) {
                warn!(index, "Stop requested, ending run before entry");
                interrupted = true;
                break;
            }
            self.run_entry(table, index)?;
            self.sink.persist(table)?;
        }
        Ok(RunSummary::from_table(table, interrupted))
    }

    fn home_prerequisites(&self) -> Result<(), SequencerError> {
        let axes = &self.config.homing_axes;
        info!(?axes, "Homing");
        for &axis in axes {
            self.rig.axis(axis).home()?;
        }
        for &axis in axes {
            self.rig
                .axis(axis)
                .wait_homed(self.config.homing_timeout)
                .map_err(|source| SequencerError::HomingFailed { axis, source })?;
        }
        info!("Homing done");
        Ok(())
    }

    /// The rotation axis can only home with a key engaged: position on the
    /// first entry, insert, then home.
    fn home_rotation_axis(&self, table: &ResultsTable, first: usize) -> Result<(), SequencerError> {
        let Some(rotation) = self.config.rotation_homing.as_ref() else {
            return Ok(());
        };
        let axis = self.rig.axis(rotation.axis);
        if axis.read_bit(AxisStatusBit::Homed)? {
            debug!(axis = rotation.axis, "Rotation axis already homed");
            return Ok(());
        }
        let Some(entry) = table.get(first) else {
            return Ok(());
        };
        info!(
            axis = rotation.axis,
            entry = first,
            "Rotation axis not homed, homing through first entry"
        );
        self.neutralise(first)?;
        self.position(first, entry.x, entry.z)?;
        self.rig.clock().sleep(self.rig.timing().settle);
        insert_with_retry(&self.rig, &self.config.insertion).map_err(|e| {
            SequencerError::RotationHomingFailed {
                axis: rotation.axis,
                reason: e.to_string(),
            }
        })?;
        axis.home()?;
        axis.wait_homed(rotation.timeout).map_err(|e| {
            SequencerError::RotationHomingFailed {
                axis: rotation.axis,
                reason: e.to_string(),
            }
        })?;
        info!(axis = rotation.axis, "Rotation axis homed");
        Ok(())
    }

    fn run_entry(&mut self, table: &mut ResultsTable, index: usize) -> Result<(), SequencerError> {
        let Some(entry) = table.get(index).copied() else {
            return Ok(());
        };
        if self.gate.decide(index, &entry) == GateDecision::Skip {
            info!(index, "Entry skipped by operator");
            table.set_result(index, EntryResult::Skipped);
            return Ok(());
        }

        self.transition(SequencerState::Position { index });
        self.neutralise(index)?;
        self.position(index, entry.x, entry.z)?;
        self.rig.clock().sleep(self.rig.timing().settle);

        self.transition(SequencerState::Insert { index });
        let result = match insert_with_retry(&self.rig, &self.config.insertion) {
            Ok(report) => {
                debug!(index, nudges = report.nudges, "Inserted");
                self.transition(SequencerState::Measure { index });
                match measure_full_range(&self.rig, &self.config.sweep) {
                    Ok(sweep) => EntryResult::Range(sweep.range()),
                    Err(source) if source.severity() == Severity::Device => {
                        return Err(SequencerError::Sweep { index, source });
                    }
                    Err(e) => {
                        warn!(index, error = %e, "Sweep failed");
                        EntryResult::Failed(e.failure_kind())
                    }
                }
            }
            Err(source) if source.severity() == Severity::Device => {
                return Err(SequencerError::Insertion { index, source });
            }
            Err(e) => {
                warn!(index, error = %e, "Insertion failed");
                EntryResult::Failed(e.failure_kind())
            }
        };

        self.transition(SequencerState::Record { index });
        info!(index, x = entry.x, z = entry.z, %result, "Entry done");
        table.set_result(index, result);
        Ok(())
    }

    fn neutralise(&self, index: usize) -> Result<(), SequencerError> {
        for action in &self.config.neutral {
            self.apply_neutral(*action)
                .map_err(|source| SequencerError::NeutralActionFailed { index, source })?;
        }
        Ok(())
    }

    fn apply_neutral(&self, action: NeutralAction) -> Result<(), MotionError> {
        debug!(?action, "Neutral action");
        match action {
            NeutralAction::LinearHome { axis } => {
                let axis = self.rig.axis(axis);
                let home = axis.read_value(AxisValue::HomePosition)?;
                axis.move_absolute_and_wait(home)
            }
            NeutralAction::PneumaticRetract { axis } => self.rig.pneumatic(axis).retract_and_wait(),
        }
    }

    /// Issue both positioning moves, then wait until both axes report in
    /// position. An axis error or the timeout ends the run.
    fn position(&self, index: usize, x: f64, z: f64) -> Result<(), SequencerError> {
        let x_axis = self.rig.axis(self.config.x_axis);
        let z_axis = self.rig.axis(self.config.z_axis);
        info!(index, x, z, "Positioning");
        x_axis.move_absolute(x)?;
        z_axis.move_absolute(z)?;

        let outcome = wait_for(
            self.rig.clock(),
            || {
                x_axis.check_fault()?;
                z_axis.check_fault()?;
                Ok::<_, MotionError>(
                    x_axis.read_bit(AxisStatusBit::InTargetPosition)?
                        && z_axis.read_bit(AxisStatusBit::InTargetPosition)?,
                )
            },
            true,
            self.config.position_timeout,
            self.rig.timing().poll_interval,
        );
        match outcome {
            Ok(WaitOutcome::Reached) => Ok(()),
            Ok(WaitOutcome::TimedOut) => {
                error!(index, x, z, "X/Z not in position");
                Err(SequencerError::PositionTimeout {
                    index,
                    timeout: self.config.position_timeout,
                })
            }
            Err(MotionError::AxisFault { axis, error_id }) => Err(SequencerError::PositionFault {
                index,
                axis,
                error_id,
            }),
            Err(e) => Err(e.into()),
        }
    }
}
