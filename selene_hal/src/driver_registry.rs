//! Driver registry for device links.
//!
//! Maps driver names (as given on the command line) to factories. Built at
//! startup and passed by value, no global state.

use selene_common::clock::Clock;
use selene_common::link::{DeviceLink, LinkError};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::drivers::register_all_drivers;
use crate::drivers::simulation::SimulationConfig;

/// Everything a driver factory may need to build its link.
#[derive(Clone)]
pub struct DriverContext {
    /// Time source shared with the motion layer.
    pub clock: Arc<dyn Clock>,
    /// Rig description used by the simulation driver.
    pub simulation: SimulationConfig,
}

/// Constructor of a device link.
pub type DriverFactory = fn(&DriverContext) -> Result<Box<dyn DeviceLink>, LinkError>;

/// Registry of available device link drivers.
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry holding every built-in driver.
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();
        register_all_drivers(&mut registry);
        registry
    }

    /// Register a driver factory. A later registration replaces an earlier one.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) {
        if self.factories.insert(name, factory).is_some() {
            warn!(driver = name, "Driver registered twice, keeping the latest");
        }
    }

    /// Create a link by driver name.
    ///
    /// # Errors
    /// Returns `LinkError::Connection` if no driver with the given name is
    /// registered, or whatever the factory reports.
    pub fn create(
        &self,
        name: &str,
        context: &DriverContext,
    ) -> Result<Box<dyn DeviceLink>, LinkError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| LinkError::Connection(format!("no device link driver '{name}'")))?;
        factory(context)
    }

    /// Registered driver names, sorted.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selene_common::clock::SimClock;

    fn context() -> DriverContext {
        DriverContext {
            clock: Arc::new(SimClock::new()),
            simulation: SimulationConfig::default(),
        }
    }

    #[test]
    fn builtin_registry_knows_simulation() {
        let registry = DriverRegistry::with_builtin_drivers();
        assert_eq!(registry.list_drivers(), vec!["simulation"]);
        let link = registry.create("simulation", &context()).unwrap();
        assert_eq!(link.name(), "simulation");
        assert!(!link.is_open());
    }

    #[test]
    fn unknown_driver_is_a_connection_error() {
        let registry = DriverRegistry::new();
        assert!(matches!(
            registry.create("ads", &context()),
            Err(LinkError::Connection(_))
        ));
    }
}
