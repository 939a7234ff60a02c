//! Hex-key insertion with collision retry.

use selene_common::plc::AxisValue;
use tracing::{debug, info, warn};

use crate::config::InsertionConfig;
use crate::error::{InsertionError, Severity};
use crate::rig::Rig;

/// Outcome of a successful insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertionReport {
    /// Corrective nudges it took. Zero for a clean insertion.
    pub nudges: u32,
}

impl InsertionReport {
    /// `Transient` when a collision was recovered by nudging, `None` for a
    /// clean insertion.
    pub fn severity(&self) -> Option<Severity> {
        (self.nudges > 0).then_some(Severity::Transient)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Inserted,
    Collided,
    Missed,
}

fn read_outcome(rig: &Rig, config: &InsertionConfig) -> Result<Outcome, InsertionError> {
    let inserted = rig.read_flag(&config.flags.inserted)?;
    let collided = rig.read_flag(&config.flags.collided)?;
    let missed = rig.read_flag(&config.flags.missed)?;
    debug!(inserted, collided, missed, "Insertion flags");
    match (inserted, collided, missed) {
        (true, false, false) => Ok(Outcome::Inserted),
        (false, true, false) => Ok(Outcome::Collided),
        (false, false, true) => Ok(Outcome::Missed),
        _ => Err(InsertionError::UnexpectedState {
            inserted,
            collided,
            missed,
        }),
    }
}

/// Insert the key at the current X/Z position.
///
/// Retracts the insertion axis to its home position, drives it to the
/// inserted position and reads the outcome flags once the move has ended.
/// A collided key gets up to `max_retries` relative nudges of the nudge axis,
/// with the inserted flag checked after each.
pub fn insert_with_retry(
    rig: &Rig,
    config: &InsertionConfig,
) -> Result<InsertionReport, InsertionError> {
    let insertion = rig.axis(config.axis);

    let retracted = insertion.read_value(AxisValue::HomePosition)?;
    insertion.move_absolute_and_wait(retracted)?;
    debug!(axis = config.axis, position = retracted, "Insertion axis retracted");

    insertion.move_absolute(config.inserted_position)?;
    rig.clock().sleep(rig.timing().settle);
    insertion.wait_while_moving(config.motion_timeout)?;

    match read_outcome(rig, config)? {
        Outcome::Inserted => {
            info!(axis = config.axis, "Key inserted");
            Ok(InsertionReport { nudges: 0 })
        }
        Outcome::Missed => {
            warn!(axis = config.axis, "Key missed the screw");
            Err(InsertionError::Missed)
        }
        Outcome::Collided => nudge_until_inserted(rig, config),
    }
}

fn nudge_until_inserted(
    rig: &Rig,
    config: &InsertionConfig,
) -> Result<InsertionReport, InsertionError> {
    let nudge = rig.axis(config.nudge_axis);
    warn!(
        axis = config.axis,
        nudge_axis = config.nudge_axis,
        budget = config.max_retries,
        severity = ?Severity::Transient,
        "Key collided, nudging"
    );
    for attempt in 1..=config.max_retries {
        nudge.move_relative_and_wait(config.nudge_distance)?;
        if rig.read_flag(&config.flags.inserted)? {
            info!(axis = config.axis, nudges = attempt, "Key inserted after nudging");
            return Ok(InsertionReport { nudges: attempt });
        }
        debug!(attempt, "Still collided");
    }
    warn!(nudges = config.max_retries, "Collision retries exhausted");
    Err(InsertionError::CollisionRetriesExhausted {
        nudges: config.max_retries,
    })
}
