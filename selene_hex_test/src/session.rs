//! Opening the rig for a run.

use selene_common::clock::{Clock, SimClock, SystemClock};
use selene_common::link::LinkError;
use selene_hal::{DriverContext, DriverRegistry};
use selene_motion::rig::Rig;
use std::sync::Arc;
use tracing::info;

use crate::config::HexTestConfig;

/// Driver used with `--simulate`.
pub const SIMULATION_DRIVER: &str = "simulation";

/// Open the rig described by `config`.
///
/// With `simulate` the simulation driver runs on a virtual clock, so a whole
/// worklist completes in moments. Otherwise the configured driver runs on
/// wall-clock time.
pub fn open_rig(config: &HexTestConfig, simulate: bool) -> Result<Rig, LinkError> {
    let (driver, clock): (&str, Arc<dyn Clock>) = if simulate {
        (SIMULATION_DRIVER, Arc::new(SimClock::new()))
    } else {
        (config.rig.link.driver.as_str(), Arc::new(SystemClock::new()))
    };
    let registry = DriverRegistry::with_builtin_drivers();
    info!(
        driver,
        available = ?registry.list_drivers(),
        ams_net_id = %config.rig.link.ams_net_id,
        port = config.rig.link.port,
        "Opening device link"
    );
    let context = DriverContext {
        clock: clock.clone(),
        simulation: config.simulation.clone().unwrap_or_default(),
    };
    let link = registry.create(driver, &context)?;
    Rig::open(link, clock, config.rig.timing.clone())
}
