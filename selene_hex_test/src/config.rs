//! Runner configuration.

use selene_common::config::ConfigError;
use selene_hal::drivers::simulation::SimulationConfig;
use selene_motion::config::RigConfig;
use serde::{Deserialize, Serialize};

/// A rig file plus the simulated rig used with `--simulate`.
///
/// ```toml
/// [sequence]
/// x_axis = 6
///
/// [[simulation.axes]]
/// index = 6
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HexTestConfig {
    #[serde(flatten)]
    pub rig: RigConfig,
    #[serde(default)]
    pub simulation: Option<SimulationConfig>,
}

impl HexTestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rig.validate()?;
        let Some(simulation) = &self.simulation else {
            return Ok(());
        };
        let sequence = &self.rig.sequence;
        let missing: Vec<_> = sequence
            .linear_axes()
            .into_iter()
            .filter(|index| !simulation.axes.iter().any(|a| a.index == *index))
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "simulation has no axes {missing:?} used by the sequence"
            )));
        }
        if simulation.hex_key.is_none() {
            return Err(ConfigError::ValidationError(
                "simulation needs a [simulation.hex_key] fixture".to_string(),
            ));
        }
        Ok(())
    }
}
