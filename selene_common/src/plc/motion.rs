//! Motion command types (`eCommand`), homing routines and NC axis parameters.
//!
//! Values mirror the enumerations compiled into the controller's motion
//! library. They are stored on the PLC as `INT`.

use serde::{Deserialize, Serialize};

use super::axis::AxisIndex;

/// Motion function selected through `stControl.eCommand`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i16)]
pub enum MotionFunction {
    MoveAbsolute = 0,
    MoveRelative = 1,
    MoveVelocity = 2,
    MoveModulo = 3,
    GearInMultiMaster = 4,
    GearOut = 5,
    Home = 10,
    WriteParameter = 50,
    ReadParameter = 60,
}

impl MotionFunction {
    /// Raw `INT` value written to the controller.
    #[inline]
    pub const fn code(self) -> i16 {
        self as i16
    }

    #[inline]
    pub const fn from_code(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::MoveAbsolute),
            1 => Some(Self::MoveRelative),
            2 => Some(Self::MoveVelocity),
            3 => Some(Self::MoveModulo),
            4 => Some(Self::GearInMultiMaster),
            5 => Some(Self::GearOut),
            10 => Some(Self::Home),
            50 => Some(Self::WriteParameter),
            60 => Some(Self::ReadParameter),
            _ => None,
        }
    }
}

/// Homing strategy stored in `stConfig.eHomeSeq`.
///
/// Part of the axis configuration, not transient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(i16)]
pub enum HomingRoutine {
    /// No homing, the axis is always considered referenced.
    #[default]
    NoHoming = 0,
    /// Drive backward to the limit switch.
    LimitBwd = 1,
    /// Drive forward to the limit switch.
    LimitFwd = 2,
    /// Drive backward to the reference cam.
    RefBwd = 11,
    /// Drive forward to the reference cam.
    RefFwd = 12,
    /// Search the encoder index pulse backward.
    EncPulseBwd = 21,
    /// Search the encoder index pulse forward.
    EncPulseFwd = 22,
    /// Backward limit, then encoder index pulse.
    EncPulseViaBwdLimit = 23,
    /// Forward limit, then encoder index pulse.
    EncPulseViaFwdLimit = 24,
    /// Set the current position as home position, no motion.
    Direct = 90,
}

impl HomingRoutine {
    #[inline]
    pub const fn code(self) -> i16 {
        self as i16
    }

    #[inline]
    pub const fn from_code(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::NoHoming),
            1 => Some(Self::LimitBwd),
            2 => Some(Self::LimitFwd),
            11 => Some(Self::RefBwd),
            12 => Some(Self::RefFwd),
            21 => Some(Self::EncPulseBwd),
            22 => Some(Self::EncPulseFwd),
            23 => Some(Self::EncPulseViaBwdLimit),
            24 => Some(Self::EncPulseViaFwdLimit),
            90 => Some(Self::Direct),
            _ => None,
        }
    }

    /// Returns true if the routine moves the axis.
    #[inline]
    pub const fn moves_axis(&self) -> bool {
        !matches!(self, Self::NoHoming | Self::Direct)
    }
}

/// NC axis parameters reachable through the read/write parameter commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i16)]
pub enum AxisParameter {
    SwLimitFwd = 2,
    SwLimitBwd = 3,
    EnableLimitFwd = 4,
    EnableLimitBwd = 5,
    EnablePositionLagMonitoring = 6,
    MaxPositionLag = 7,
    AxisVeloManSlow = 1004,
    AxisVeloManFast = 1005,
    AxisEnTargetPositionMonitoring = 1015,
    AxisTargetPositionWindow = 1016,
}

impl AxisParameter {
    #[inline]
    pub const fn code(self) -> i16 {
        self as i16
    }

    #[inline]
    pub const fn from_code(value: i16) -> Option<Self> {
        match value {
            2 => Some(Self::SwLimitFwd),
            3 => Some(Self::SwLimitBwd),
            4 => Some(Self::EnableLimitFwd),
            5 => Some(Self::EnableLimitBwd),
            6 => Some(Self::EnablePositionLagMonitoring),
            7 => Some(Self::MaxPositionLag),
            1004 => Some(Self::AxisVeloManSlow),
            1005 => Some(Self::AxisVeloManFast),
            1015 => Some(Self::AxisEnTargetPositionMonitoring),
            1016 => Some(Self::AxisTargetPositionWindow),
            _ => None,
        }
    }
}

/// One master slot of a multi-master gear coupling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GearMaster {
    /// Master axis index.
    pub axis: AxisIndex,
    /// Gear ratio applied to the master's motion.
    pub ratio: f64,
}

/// A supervisory command issued to one axis.
///
/// Exactly one command is active on an axis at a time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MotionCommand {
    /// Move to an absolute position.
    AbsoluteMove(f64),
    /// Move by a distance relative to the current position.
    RelativeMove(f64),
    /// Move at constant signed velocity until halted.
    VelocityMove(f64),
    /// Run the axis' configured homing routine.
    Home,
    /// Couple to up to four master axes.
    GearIn([Option<GearMaster>; 4]),
    /// Release any gear coupling.
    GearOut,
    /// Write an NC axis parameter.
    WriteParameter(AxisParameter, f64),
    /// Request an NC axis parameter into `fReadAxisParameter`.
    ReadParameter(AxisParameter),
}

impl MotionCommand {
    /// The `eCommand` function this command selects.
    pub const fn function(&self) -> MotionFunction {
        match self {
            Self::AbsoluteMove(_) => MotionFunction::MoveAbsolute,
            Self::RelativeMove(_) => MotionFunction::MoveRelative,
            Self::VelocityMove(_) => MotionFunction::MoveVelocity,
            Self::Home => MotionFunction::Home,
            Self::GearIn(_) => MotionFunction::GearInMultiMaster,
            Self::GearOut => MotionFunction::GearOut,
            Self::WriteParameter(..) => MotionFunction::WriteParameter,
            Self::ReadParameter(_) => MotionFunction::ReadParameter,
        }
    }

    /// Returns true if the command leaves the axis in continuous motion.
    pub const fn is_continuous(&self) -> bool {
        matches!(self, Self::VelocityMove(_) | Self::GearIn(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motion_function_roundtrip() {
        for code in [0, 1, 2, 3, 4, 5, 10, 50, 60] {
            let function = MotionFunction::from_code(code).unwrap();
            assert_eq!(function.code(), code);
        }
        assert!(MotionFunction::from_code(7).is_none());
    }

    #[test]
    fn homing_routine_roundtrip() {
        for code in [0, 1, 2, 11, 12, 21, 22, 23, 24, 90] {
            let routine = HomingRoutine::from_code(code).unwrap();
            assert_eq!(routine.code(), code);
        }
        assert!(HomingRoutine::from_code(3).is_none());
    }

    #[test]
    fn homing_routine_motion() {
        assert!(HomingRoutine::LimitBwd.moves_axis());
        assert!(HomingRoutine::EncPulseViaFwdLimit.moves_axis());
        assert!(!HomingRoutine::Direct.moves_axis());
        assert!(!HomingRoutine::NoHoming.moves_axis());
    }

    #[test]
    fn command_selects_function() {
        assert_eq!(
            MotionCommand::RelativeMove(30.0).function(),
            MotionFunction::MoveRelative
        );
        assert_eq!(
            MotionCommand::WriteParameter(AxisParameter::EnableLimitFwd, 0.0).function(),
            MotionFunction::WriteParameter
        );
        assert!(MotionCommand::VelocityMove(-1.0).is_continuous());
        assert!(!MotionCommand::Home.is_continuous());
    }
}
