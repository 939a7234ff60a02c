//! Error taxonomy of the motion layer.
//!
//! Every failure is a typed value so callers (and tests) can tell a device
//! problem from a bad input, a per-entry failure from a fatal one. The
//! [`Severity`] of an error decides what the sequencer does with it.

use selene_common::link::LinkError;
use selene_common::plc::{AxisIndex, PneumaticAxisError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::axis::Direction;
use crate::pneumatic::PneumaticPhase;
use crate::wait::CommandPhase;

/// How far a failure reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Aborts the run.
    Fatal,
    /// Recorded against the current worklist entry; the run continues.
    PerEntry,
    /// Retried in place with a corrective action between attempts.
    Transient,
    /// Rejected computation input. Nothing was sent to the device.
    InputInvalid,
    /// Communication with the controller failed.
    Device,
}

/// Travel-time estimation failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TravelTimeError {
    /// A divisor or factor is zero, negative where it must not be, or not finite.
    #[error("Undefined travel time: {quantity} is {value}")]
    InvalidInput {
        /// Name of the offending quantity.
        quantity: &'static str,
        /// Value as read from the axis.
        value: f64,
    },

    /// Both soft limits are zero, so the travel range is unknown.
    #[error("Undefined travel range: no soft limits configured")]
    NoSoftLimits,
}

impl TravelTimeError {
    pub const fn severity(&self) -> Severity {
        Severity::InputInvalid
    }
}

/// Failures of axis and pneumatic controller operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MotionError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    TravelTime(#[from] TravelTimeError),

    /// One phase of the command-done handshake was not observed.
    #[error("Axis {axis}: {phase} not observed within {timeout:?}")]
    CommandPhaseTimeout {
        axis: AxisIndex,
        phase: CommandPhase,
        timeout: Duration,
    },

    /// A single-condition wait expired.
    #[error("Axis {axis}: timeout after {timeout:?} waiting for {condition}")]
    WaitTimeout {
        axis: AxisIndex,
        condition: &'static str,
        timeout: Duration,
    },

    /// The axis raised `bError` while it was being watched.
    #[error("Axis {axis} reported error id {error_id:#x}")]
    AxisFault { axis: AxisIndex, error_id: u32 },

    /// A motion was about to start on a disabled drive.
    #[error("Axis {axis} is not enabled")]
    NotEnabled { axis: AxisIndex },

    /// One phase of an extend/retract handshake was not observed.
    #[error("Pneumatic axis {axis}: {phase} not observed within {timeout:?}")]
    PneumaticPhaseTimeout {
        axis: u16,
        phase: PneumaticPhase,
        timeout: Duration,
    },

    /// The pneumatic axis raised `bError`.
    #[error("Pneumatic axis {axis} reported {code:?}")]
    PneumaticFault {
        axis: u16,
        code: Option<PneumaticAxisError>,
    },

    #[error("Axis {axis}: soft limits still enabled after disabling them")]
    SoftLimitsNotDisabled { axis: AxisIndex },

    #[error("Axis {axis}: still on the {direction} limit switch after {attempts} back-off moves")]
    LimitSwitchStuck {
        axis: AxisIndex,
        direction: Direction,
        attempts: u32,
    },
}

impl MotionError {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Link(_) => Severity::Device,
            Self::TravelTime(e) => e.severity(),
            _ => Severity::Fatal,
        }
    }
}

/// Why a worklist entry was marked FAIL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    CollisionRetriesExhausted,
    InsertionMissed,
    UnexpectedInsertionState,
    InsertionFault,
    ExtremeNotReached,
    SweepFault,
}

impl FailureKind {
    pub const ALL: [Self; 6] = [
        Self::CollisionRetriesExhausted,
        Self::InsertionMissed,
        Self::UnexpectedInsertionState,
        Self::InsertionFault,
        Self::ExtremeNotReached,
        Self::SweepFault,
    ];

    /// Stable short name used in the results file.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CollisionRetriesExhausted => "collision",
            Self::InsertionMissed => "missed",
            Self::UnexpectedInsertionState => "unexpected-state",
            Self::InsertionFault => "insertion-fault",
            Self::ExtremeNotReached => "extreme-not-reached",
            Self::SweepFault => "sweep-fault",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hex-key insertion failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InsertionError {
    /// Still collided after the whole nudge budget.
    #[error("Key still collided after {nudges} nudges")]
    CollisionRetriesExhausted { nudges: u32 },

    /// The key missed the screw; the operator has to reposition.
    #[error("Key missed the screw head")]
    Missed,

    /// Not exactly one outcome flag was raised.
    #[error("Unexpected insertion state (inserted={inserted}, collided={collided}, missed={missed})")]
    UnexpectedState {
        inserted: bool,
        collided: bool,
        missed: bool,
    },

    #[error(transparent)]
    Motion(#[from] MotionError),
}

impl InsertionError {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Motion(MotionError::Link(_)) => Severity::Device,
            _ => Severity::PerEntry,
        }
    }

    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::CollisionRetriesExhausted { .. } => FailureKind::CollisionRetriesExhausted,
            Self::Missed => FailureKind::InsertionMissed,
            Self::UnexpectedState { .. } => FailureKind::UnexpectedInsertionState,
            Self::Motion(_) => FailureKind::InsertionFault,
        }
    }
}

impl From<LinkError> for InsertionError {
    fn from(e: LinkError) -> Self {
        Self::Motion(MotionError::Link(e))
    }
}

/// Full-range sweep failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SweepError {
    /// Neither error nor limit was observed in time. The range is undefined.
    #[error("{0} extreme not reached")]
    ExtremeNotReached(Direction),

    #[error(transparent)]
    Motion(#[from] MotionError),
}

impl SweepError {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Motion(MotionError::Link(_)) => Severity::Device,
            _ => Severity::PerEntry,
        }
    }

    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::ExtremeNotReached(_) => FailureKind::ExtremeNotReached,
            Self::Motion(_) => FailureKind::SweepFault,
        }
    }
}

impl From<LinkError> for SweepError {
    fn from(e: LinkError) -> Self {
        Self::Motion(MotionError::Link(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_errors_are_device_errors_everywhere() {
        let link = LinkError::Timeout("GVL.astAxes[8].stStatus.bBusy".into());
        assert_eq!(MotionError::from(link.clone()).severity(), Severity::Device);
        assert_eq!(InsertionError::from(link.clone()).severity(), Severity::Device);
        assert_eq!(SweepError::from(link).severity(), Severity::Device);
    }

    #[test]
    fn travel_time_errors_are_input_invalid() {
        let e = MotionError::from(TravelTimeError::InvalidInput {
            quantity: "velocity",
            value: 0.0,
        });
        assert_eq!(e.severity(), Severity::InputInvalid);
        assert_eq!(e.to_string(), "Undefined travel time: velocity is 0");
    }

    #[test]
    fn per_entry_failures_keep_their_kind() {
        assert_eq!(
            InsertionError::CollisionRetriesExhausted { nudges: 5 }.failure_kind(),
            FailureKind::CollisionRetriesExhausted
        );
        assert_eq!(InsertionError::Missed.severity(), Severity::PerEntry);
        assert_eq!(
            SweepError::ExtremeNotReached(Direction::Backward).failure_kind(),
            FailureKind::ExtremeNotReached
        );
        let fault = InsertionError::Motion(MotionError::AxisFault {
            axis: 8,
            error_id: 0x4260,
        });
        assert_eq!(fault.severity(), Severity::PerEntry);
        assert_eq!(fault.failure_kind(), FailureKind::InsertionFault);
    }

    #[test]
    fn failure_kind_names_roundtrip() {
        for kind in FailureKind::ALL {
            assert_eq!(FailureKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(FailureKind::from_name("ok"), None);
    }
}
