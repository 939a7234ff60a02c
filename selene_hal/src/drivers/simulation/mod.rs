//! Simulation driver module.
//!
//! A software PLC for development and testing without the rig. It publishes
//! the same symbol layout as the real controller (see
//! `selene_common::plc`) and adds fault injection for the failure paths the
//! motion layer has to handle.

mod axis;
mod config;
mod fixture;
mod plc;
mod pneumatic;

pub use axis::{
    ERROR_INVALID_COMMAND, ERROR_INVALID_VELOCITY, ERROR_LIMIT_BWD, ERROR_LIMIT_FWD,
    ERROR_NOT_READY, ERROR_SOFT_LIMIT_BWD, ERROR_SOFT_LIMIT_FWD,
};
pub use config::{
    HexKeyFixtureConfig, InsertionScript, SimAxisConfig, SimPneumaticConfig, SimulationConfig,
};
pub use plc::{CommandRecord, SimulatedPlc};

use crate::driver_registry::DriverContext;
use selene_common::link::{DeviceLink, LinkError};

/// Factory function registered under `"simulation"`.
pub fn create_driver(context: &DriverContext) -> Result<Box<dyn DeviceLink>, LinkError> {
    Ok(Box::new(SimulatedPlc::new(
        &context.simulation,
        context.clock.clone(),
    )))
}
