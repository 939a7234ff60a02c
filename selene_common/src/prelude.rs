//! Prelude module for common re-exports.
//!
//! Consumers can do `use selene_common::prelude::*;` and get the link,
//! clock, configuration and PLC layout types without listing paths.
//!
//! # Usage
//!
//! ```rust
//! use selene_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};

// ─── Time ───────────────────────────────────────────────────────────
pub use crate::clock::{Clock, SimClock, SystemClock};

// ─── Device Link ────────────────────────────────────────────────────
pub use crate::link::{DeviceLink, LinkError, PlcType, PlcValue};

// ─── PLC Layout ─────────────────────────────────────────────────────
pub use crate::plc::axis::{AxisControlBit, axis_symbol};
pub use crate::plc::pneumatic::{PneumaticControlBit, pneumatic_symbol};
pub use crate::plc::{
    AxisIndex, AxisParameter, AxisStatusBit, AxisStatusFlags, AxisValue, GearMaster,
    HomingRoutine, MotionCommand, MotionFunction, PneumaticAxisError, PneumaticStatusBit,
};

// ─── Defaults ───────────────────────────────────────────────────────
pub use crate::consts::{
    DEFAULT_COLLISION_RETRIES, DEFAULT_POLL_INTERVAL, DEFAULT_WAIT_TIMEOUT, MIN_WAIT_TIMEOUT,
    timeout_from_secs,
};
