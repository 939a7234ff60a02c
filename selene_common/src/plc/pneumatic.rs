//! Symbols of the `ST_PneumaticAxis` structure published for every
//! extend/retract actuator.

use serde::{Deserialize, Serialize};

/// Full symbol name of a field of pneumatic axis `axis`.
pub fn pneumatic_symbol(axis: u16, path: &str) -> String {
    format!("GVL.astPneumaticAxes[{axis}].{path}")
}

/// `stPneumaticAxisOutputs.bValveOn` (`BOOL`).
pub const VALVE_ON: &str = "stPneumaticAxisOutputs.bValveOn";
/// `stPneumaticAxisConfig.nTimeToExtend` (`INT`, seconds).
pub const TIME_TO_EXTEND: &str = "stPneumaticAxisConfig.nTimeToExtend";
/// `stPneumaticAxisConfig.nTimeToRetract` (`INT`, seconds).
pub const TIME_TO_RETRACT: &str = "stPneumaticAxisConfig.nTimeToRetract";
/// `stPneumaticAxisStatus.sStatus` (`STRING`).
pub const STATUS_TEXT: &str = "stPneumaticAxisStatus.sStatus";
/// `stPneumaticAxisStatus.eErrorCode` (`INT`).
pub const ERROR_CODE: &str = "stPneumaticAxisStatus.eErrorCode";

/// Boolean status and input flags of a pneumatic axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PneumaticStatusBit {
    Extending,
    Retracting,
    Extended,
    Retracted,
    SolenoidActive,
    Interlocked,
    PssPermitOk,
    Error,
    EndSwitchFwd,
    EndSwitchBwd,
}

impl PneumaticStatusBit {
    /// Path inside the pneumatic axis structure.
    pub const fn path(&self) -> &'static str {
        match self {
            Self::Extending => "stPneumaticAxisStatus.bExtending",
            Self::Retracting => "stPneumaticAxisStatus.bRetracting",
            Self::Extended => "stPneumaticAxisStatus.bExtended",
            Self::Retracted => "stPneumaticAxisStatus.bRetracted",
            Self::SolenoidActive => "stPneumaticAxisStatus.bSolenoidActive",
            Self::Interlocked => "stPneumaticAxisStatus.bInterlocked",
            Self::PssPermitOk => "stPneumaticAxisStatus.bPSSPermitOK",
            Self::Error => "stPneumaticAxisStatus.bError",
            Self::EndSwitchFwd => "stPneumaticAxisInputs.bEndSwitchFwd",
            Self::EndSwitchBwd => "stPneumaticAxisInputs.bEndSwitchBwd",
        }
    }

    pub const ALL: [Self; 10] = [
        Self::Extending,
        Self::Retracting,
        Self::Extended,
        Self::Retracted,
        Self::SolenoidActive,
        Self::Interlocked,
        Self::PssPermitOk,
        Self::Error,
        Self::EndSwitchFwd,
        Self::EndSwitchBwd,
    ];
}

/// Rising-edge control bits of a pneumatic axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PneumaticControlBit {
    Extend,
    Retract,
    Interlock,
    Reset,
}

impl PneumaticControlBit {
    /// Path inside the pneumatic axis structure.
    pub const fn path(&self) -> &'static str {
        match self {
            Self::Extend => "stPneumaticAxisControl.bExtend",
            Self::Retract => "stPneumaticAxisControl.bRetract",
            Self::Interlock => "stPneumaticAxisControl.bInterlock",
            Self::Reset => "stPneumaticAxisControl.bReset",
        }
    }

    pub const ALL: [Self; 4] = [Self::Extend, Self::Retract, Self::Interlock, Self::Reset];
}

/// Error codes reported by a pneumatic axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(i16)]
pub enum PneumaticAxisError {
    #[default]
    NoError = 0,
    ExtendTimedOut = 1,
    RetractTimedOut = 2,
    NotMovingExtend = 3,
    NotMovingRetract = 4,
    InterlockOn = 5,
    NoPssPermit = 6,
    AirPressureError = 7,
}

impl PneumaticAxisError {
    #[inline]
    pub const fn from_code(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::NoError),
            1 => Some(Self::ExtendTimedOut),
            2 => Some(Self::RetractTimedOut),
            3 => Some(Self::NotMovingExtend),
            4 => Some(Self::NotMovingRetract),
            5 => Some(Self::InterlockOn),
            6 => Some(Self::NoPssPermit),
            7 => Some(Self::AirPressureError),
            _ => None,
        }
    }
}
