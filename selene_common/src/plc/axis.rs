//! Symbols of the `ST_AxisStruct` published for every motion axis.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Hardware index of an axis on the controller.
pub type AxisIndex = u16;

/// Full symbol name of a field of axis `axis`.
pub fn axis_symbol(axis: AxisIndex, path: &str) -> String {
    format!("GVL.astAxes[{axis}].{path}")
}

/// `stControl.eCommand` (`INT`).
pub const COMMAND: &str = "stControl.eCommand";
/// `stStatus.nErrorID` (`UDINT`).
pub const ERROR_ID: &str = "stStatus.nErrorID";
/// `stConfig.eHomeSeq` (`INT`).
pub const HOME_SEQUENCE: &str = "stConfig.eHomeSeq";
/// `stConfig.eAxisParameters` (`INT`): parameter selector for read/write parameter.
pub const PARAMETER_SELECT: &str = "stConfig.eAxisParameters";
/// `stConfig.fWriteAxisParameter` (`LREAL`).
pub const PARAMETER_WRITE: &str = "stConfig.fWriteAxisParameter";
/// `stConfig.fReadAxisParameter` (`LREAL`).
pub const PARAMETER_READ: &str = "stConfig.fReadAxisParameter";

/// `stConfig.astMultiMasterAxis[slot].nIndex` (`UINT`), slot in 1..=4.
pub fn gear_master_index(slot: u8) -> String {
    format!("stConfig.astMultiMasterAxis[{slot}].nIndex")
}

/// `stConfig.astMultiMasterAxis[slot].fRatio` (`LREAL`), slot in 1..=4.
pub fn gear_master_ratio(slot: u8) -> String {
    format!("stConfig.astMultiMasterAxis[{slot}].fRatio")
}

/// Boolean status and input flags of an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisStatusBit {
    Enabled,
    CommandAborted,
    Busy,
    Done,
    Homed,
    Moving,
    MovingForward,
    MovingBackward,
    InTargetPosition,
    Geared,
    Error,
    /// Forward limit input. Normally closed: `true` while the switch is free.
    LimitFwd,
    /// Backward limit input. Normally closed: `true` while the switch is free.
    LimitBwd,
    HomeSwitch,
    SoftLimitFwdEnabled,
    SoftLimitBwdEnabled,
}

impl AxisStatusBit {
    /// Path inside the axis structure.
    pub const fn path(&self) -> &'static str {
        match self {
            Self::Enabled => "stStatus.bEnabled",
            Self::CommandAborted => "stStatus.bCommandAborted",
            Self::Busy => "stStatus.bBusy",
            Self::Done => "stStatus.bDone",
            Self::Homed => "stStatus.bHomed",
            Self::Moving => "stStatus.bMoving",
            Self::MovingForward => "stStatus.bMovingForward",
            Self::MovingBackward => "stStatus.bMovingBackward",
            Self::InTargetPosition => "stStatus.bInTargetPosition",
            Self::Geared => "stStatus.bGeared",
            Self::Error => "stStatus.bError",
            Self::LimitFwd => "stInputs.bLimitFwd",
            Self::LimitBwd => "stInputs.bLimitBwd",
            Self::HomeSwitch => "stInputs.bHome",
            Self::SoftLimitFwdEnabled => "stConfig.bEnMaxSoftPosLimit",
            Self::SoftLimitBwdEnabled => "stConfig.bEnMinSoftPosLimit",
        }
    }

    /// Flag used in an [`AxisStatusFlags`] snapshot.
    pub const fn flag(&self) -> AxisStatusFlags {
        match self {
            Self::Enabled => AxisStatusFlags::ENABLED,
            Self::CommandAborted => AxisStatusFlags::COMMAND_ABORTED,
            Self::Busy => AxisStatusFlags::BUSY,
            Self::Done => AxisStatusFlags::DONE,
            Self::Homed => AxisStatusFlags::HOMED,
            Self::Moving => AxisStatusFlags::MOVING,
            Self::MovingForward => AxisStatusFlags::MOVING_FWD,
            Self::MovingBackward => AxisStatusFlags::MOVING_BWD,
            Self::InTargetPosition => AxisStatusFlags::IN_TARGET,
            Self::Geared => AxisStatusFlags::GEARED,
            Self::Error => AxisStatusFlags::ERROR,
            Self::LimitFwd => AxisStatusFlags::LIMIT_FWD,
            Self::LimitBwd => AxisStatusFlags::LIMIT_BWD,
            Self::HomeSwitch => AxisStatusFlags::HOME_SWITCH,
            Self::SoftLimitFwdEnabled => AxisStatusFlags::SOFT_LIMIT_FWD,
            Self::SoftLimitBwdEnabled => AxisStatusFlags::SOFT_LIMIT_BWD,
        }
    }

    /// Every status bit, in snapshot order.
    pub const ALL: [Self; 16] = [
        Self::Enabled,
        Self::CommandAborted,
        Self::Busy,
        Self::Done,
        Self::Homed,
        Self::Moving,
        Self::MovingForward,
        Self::MovingBackward,
        Self::InTargetPosition,
        Self::Geared,
        Self::Error,
        Self::LimitFwd,
        Self::LimitBwd,
        Self::HomeSwitch,
        Self::SoftLimitFwdEnabled,
        Self::SoftLimitBwdEnabled,
    ];
}

bitflags! {
    /// Snapshot of every boolean status flag of one axis.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AxisStatusFlags: u16 {
        const ENABLED         = 0x0001;
        const COMMAND_ABORTED = 0x0002;
        const BUSY            = 0x0004;
        const DONE            = 0x0008;
        const HOMED           = 0x0010;
        const MOVING          = 0x0020;
        const MOVING_FWD      = 0x0040;
        const MOVING_BWD      = 0x0080;
        const IN_TARGET       = 0x0100;
        const GEARED          = 0x0200;
        const ERROR           = 0x0400;
        const LIMIT_FWD       = 0x0800;
        const LIMIT_BWD       = 0x1000;
        const HOME_SWITCH     = 0x2000;
        const SOFT_LIMIT_FWD  = 0x4000;
        const SOFT_LIMIT_BWD  = 0x8000;
    }
}

/// Real-valued observations and setpoints of an axis (`LREAL`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisValue {
    ActPosition,
    ActVelocity,
    /// Commanded velocity (`stControl.fVelocity`), written before velocity moves.
    Velocity,
    JogVelocity,
    Acceleration,
    Deceleration,
    /// Commanded target (`stControl.fPosition`).
    TargetPosition,
    Override,
    HomePosition,
    HomeFinishDistance,
    HomingVelocityToCam,
    HomingVelocityFromCam,
    VelocityMax,
    AccelerationMax,
    DecelerationMax,
    VelocityFastManual,
    VelocitySlowManual,
    SoftLimitFwd,
    SoftLimitBwd,
    PositionLagMax,
    TargetPositionWindow,
}

impl AxisValue {
    /// Path inside the axis structure.
    pub const fn path(&self) -> &'static str {
        match self {
            Self::ActPosition => "stStatus.fActPosition",
            Self::ActVelocity => "stStatus.fActVelocity",
            Self::Velocity => "stControl.fVelocity",
            Self::JogVelocity => "stControl.fJogVelocity",
            Self::Acceleration => "stControl.fAcceleration",
            Self::Deceleration => "stControl.fDeceleration",
            Self::TargetPosition => "stControl.fPosition",
            Self::Override => "stConfig.fOveride",
            Self::HomePosition => "stConfig.fHomePosition",
            Self::HomeFinishDistance => "stConfig.fHomeFinishDistance",
            Self::HomingVelocityToCam => "stConfig.fHomingVelToCam",
            Self::HomingVelocityFromCam => "stConfig.fHomingVelFromCam",
            Self::VelocityMax => "stConfig.fVeloMax",
            Self::AccelerationMax => "stConfig.fMaxAcc",
            Self::DecelerationMax => "stConfig.fMaxDec",
            Self::VelocityFastManual => "stConfig.fVelocityDefaultFast",
            Self::VelocitySlowManual => "stConfig.fVelocityDefaultSlow",
            Self::SoftLimitFwd => "stConfig.fMaxSoftPosLimit",
            Self::SoftLimitBwd => "stConfig.fMinSoftPosLimit",
            Self::PositionLagMax => "stConfig.fMaxPosLagValue",
            Self::TargetPositionWindow => "stConfig.fTargetPositionWindow",
        }
    }

    /// Every value, in declaration order.
    pub const ALL: [Self; 21] = [
        Self::ActPosition,
        Self::ActVelocity,
        Self::Velocity,
        Self::JogVelocity,
        Self::Acceleration,
        Self::Deceleration,
        Self::TargetPosition,
        Self::Override,
        Self::HomePosition,
        Self::HomeFinishDistance,
        Self::HomingVelocityToCam,
        Self::HomingVelocityFromCam,
        Self::VelocityMax,
        Self::AccelerationMax,
        Self::DecelerationMax,
        Self::VelocityFastManual,
        Self::VelocitySlowManual,
        Self::SoftLimitFwd,
        Self::SoftLimitBwd,
        Self::PositionLagMax,
        Self::TargetPositionWindow,
    ];

    /// Whether the controller accepts writes to this value directly.
    ///
    /// Read-only configuration values are changed through NC parameters.
    pub const fn is_writable(&self) -> bool {
        matches!(
            self,
            Self::Velocity
                | Self::JogVelocity
                | Self::Acceleration
                | Self::Deceleration
                | Self::TargetPosition
                | Self::Override
                | Self::HomePosition
                | Self::HomeFinishDistance
        )
    }
}

/// Rising-edge control bits of an axis (`BOOL`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisControlBit {
    Execute,
    Reset,
    Halt,
    Stop,
    Enable,
}

impl AxisControlBit {
    /// Path inside the axis structure.
    pub const fn path(&self) -> &'static str {
        match self {
            Self::Execute => "stControl.bExecute",
            Self::Reset => "stControl.bReset",
            Self::Halt => "stControl.bHalt",
            Self::Stop => "stControl.bStop",
            Self::Enable => "stControl.bEnable",
        }
    }

    pub const ALL: [Self; 5] = [
        Self::Execute,
        Self::Reset,
        Self::Halt,
        Self::Stop,
        Self::Enable,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_includes_axis_index() {
        assert_eq!(
            axis_symbol(6, AxisStatusBit::InTargetPosition.path()),
            "GVL.astAxes[6].stStatus.bInTargetPosition"
        );
        assert_eq!(
            axis_symbol(10, &gear_master_ratio(2)),
            "GVL.astAxes[10].stConfig.astMultiMasterAxis[2].fRatio"
        );
    }

    #[test]
    fn status_flags_are_distinct() {
        let mut all = AxisStatusFlags::empty();
        for bit in AxisStatusBit::ALL {
            assert!(!all.intersects(bit.flag()), "{bit:?} overlaps");
            all |= bit.flag();
        }
        assert_eq!(all, AxisStatusFlags::all());
    }

    #[test]
    fn only_control_values_are_writable() {
        assert!(AxisValue::TargetPosition.is_writable());
        assert!(AxisValue::Velocity.is_writable());
        assert!(!AxisValue::ActPosition.is_writable());
        assert!(!AxisValue::SoftLimitFwd.is_writable());
    }
}
