//! PLC symbol layout and motion codes.
//!
//! The controller exposes one structure per axis (`GVL.astAxes[n]`) and one
//! per pneumatic actuator (`GVL.astPneumaticAxes[n]`). This module is the only
//! place where those symbol paths are spelled out.
//!
//! - [`axis`] - Linear/rotary axis status, setpoint and control symbols
//! - [`pneumatic`] - Pneumatic actuator symbols and error codes
//! - [`motion`] - `eCommand` codes, homing routines, NC axis parameters

pub mod axis;
pub mod motion;
pub mod pneumatic;

pub use axis::{AxisIndex, AxisStatusBit, AxisStatusFlags, AxisValue};
pub use motion::{AxisParameter, GearMaster, HomingRoutine, MotionCommand, MotionFunction};
pub use pneumatic::{PneumaticAxisError, PneumaticStatusBit};

/// Number of configured axes on the controller (`INT`).
pub const AXIS_COUNT_SYMBOL: &str = "GVL_APP.nAXIS_NUM";
