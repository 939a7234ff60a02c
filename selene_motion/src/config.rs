//! Rig configuration.
//!
//! One TOML file describes the link, the timing budget and the acceptance
//! sequence. Durations are written as seconds (integer or float).
//!
//! ```toml
//! [shared]
//! service_name = "selene-hex-test"
//!
//! [link]
//! ams_net_id = "5.82.112.102.1.1"
//! port = 852
//!
//! [timing]
//! poll_interval = 0.5
//!
//! [sequence]
//! x_axis = 6
//! z_axis = 7
//! homing_axes = [8, 9]
//! ```

use selene_common::config::{ConfigError, SharedConfig, secs};
use selene_common::consts::{
    DEFAULT_BUSY_HIGH_TIMEOUT, DEFAULT_COLLISION_RETRIES, DEFAULT_DONE_HIGH_TIMEOUT,
    DEFAULT_DONE_LOW_TIMEOUT, DEFAULT_MOVE_MARGIN, DEFAULT_PNEUMATIC_START_TIMEOUT,
    DEFAULT_POLL_INTERVAL, DEFAULT_SAFETY_FACTOR, DEFAULT_SETTLE, DEFAULT_WAIT_TIMEOUT,
};
use selene_common::plc::AxisIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::sequencer::SectionRule;
use crate::wait::CommandDoneTimeouts;

/// Complete rig file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RigConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub sequence: SequenceConfig,
}

impl RigConfig {
    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.link.validate()?;
        self.timing.validate()?;
        self.sequence.validate()
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

// ─── Link ───────────────────────────────────────────────────────────

/// Where the controller lives and which driver talks to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Registered device link driver.
    pub driver: String,
    pub ams_net_id: String,
    pub port: u16,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            driver: "ads".to_string(),
            ams_net_id: "5.82.112.102.1.1".to_string(),
            port: 852,
        }
    }
}

impl LinkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.driver.is_empty() {
            return Err(invalid("link.driver cannot be empty"));
        }
        let octets = self.ams_net_id.split('.').collect::<Vec<_>>();
        if octets.len() != 6 || octets.iter().any(|o| o.parse::<u8>().is_err()) {
            return Err(invalid(format!(
                "link.ams_net_id '{}' is not six dotted octets",
                self.ams_net_id
            )));
        }
        Ok(())
    }
}

// ─── Timing ─────────────────────────────────────────────────────────

/// Poll pacing and timeout budget shared by every controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    #[serde(with = "secs")]
    pub poll_interval: Duration,
    /// Added to every travel-time estimate.
    #[serde(with = "secs")]
    pub move_margin: Duration,
    pub safety_factor: f64,
    /// Pause after resets and before reading settled state.
    #[serde(with = "secs")]
    pub settle: Duration,
    #[serde(with = "secs")]
    pub done_low_timeout: Duration,
    #[serde(with = "secs")]
    pub busy_high_timeout: Duration,
    /// Phase 3 of commands that have no travel estimate.
    #[serde(with = "secs")]
    pub done_high_timeout: Duration,
    /// Enable/disable acknowledgement.
    #[serde(with = "secs")]
    pub enable_timeout: Duration,
    /// Pneumatic phases 1 and 2.
    #[serde(with = "secs")]
    pub pneumatic_start_timeout: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            move_margin: DEFAULT_MOVE_MARGIN,
            safety_factor: DEFAULT_SAFETY_FACTOR,
            settle: DEFAULT_SETTLE,
            done_low_timeout: DEFAULT_DONE_LOW_TIMEOUT,
            busy_high_timeout: DEFAULT_BUSY_HIGH_TIMEOUT,
            done_high_timeout: DEFAULT_DONE_HIGH_TIMEOUT,
            enable_timeout: DEFAULT_WAIT_TIMEOUT,
            pneumatic_start_timeout: DEFAULT_PNEUMATIC_START_TIMEOUT,
        }
    }
}

impl TimingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.safety_factor.is_finite() && self.safety_factor > 0.0) {
            return Err(invalid(format!(
                "timing.safety_factor must be positive, got {}",
                self.safety_factor
            )));
        }
        Ok(())
    }

    /// Handshake timeouts with a caller-chosen phase 3.
    pub fn command_done_timeouts(&self, done_high: Duration) -> CommandDoneTimeouts {
        CommandDoneTimeouts {
            done_low: self.done_low_timeout,
            busy_high: self.busy_high_timeout,
            done_high,
        }
    }
}

// ─── Sequence ───────────────────────────────────────────────────────

/// Homing of the rotation axis, done through the first selected entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationHomingConfig {
    pub axis: AxisIndex,
    #[serde(with = "secs", default = "default_wait_timeout")]
    pub timeout: Duration,
}

/// Action bringing the mechanism to a neutral state before an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NeutralAction {
    /// Move a linear axis to its configured home position.
    LinearHome { axis: AxisIndex },
    /// Retract a pneumatic actuator.
    PneumaticRetract { axis: u16 },
}

/// Names of the PLC flags the insertion check reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsertionFlags {
    pub inserted: String,
    pub collided: String,
    pub missed: String,
}

impl Default for InsertionFlags {
    fn default() -> Self {
        Self {
            inserted: "Hex_Screw_States_8_9.bHexScrewInserted8".to_string(),
            collided: "Hex_Screw_States_8_9.bHexScrewCollided8".to_string(),
            missed: "Hex_Screw_States_8_9.bHexScrewMissed8".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsertionConfig {
    /// Axis carrying the key.
    pub axis: AxisIndex,
    /// Axis nudged to free a collided key.
    pub nudge_axis: AxisIndex,
    pub inserted_position: f64,
    pub nudge_distance: f64,
    pub max_retries: u32,
    /// Bound on the wait for the insertion move to end.
    #[serde(with = "secs")]
    pub motion_timeout: Duration,
    pub flags: InsertionFlags,
}

impl Default for InsertionConfig {
    fn default() -> Self {
        Self {
            axis: 8,
            nudge_axis: 10,
            inserted_position: 0.0,
            nudge_distance: 30.0,
            max_retries: DEFAULT_COLLISION_RETRIES,
            motion_timeout: DEFAULT_WAIT_TIMEOUT,
            flags: InsertionFlags::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub axis: AxisIndex,
    /// Bound on each jog towards an extreme.
    #[serde(with = "secs")]
    pub timeout: Duration,
    /// Relative move away from a reached limit. Zero skips it.
    pub nudge_off: f64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            axis: 10,
            timeout: Duration::from_secs(120),
            nudge_off: 5.0,
        }
    }
}

fn default_wait_timeout() -> Duration {
    DEFAULT_WAIT_TIMEOUT
}

/// The acceptance sequence: which axes do what.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    pub x_axis: AxisIndex,
    pub z_axis: AxisIndex,
    /// Homed once at the start of a run.
    pub homing_axes: Vec<AxisIndex>,
    #[serde(with = "secs")]
    pub homing_timeout: Duration,
    /// Wall-clock bound on the joint X/Z in-position wait.
    #[serde(with = "secs")]
    pub position_timeout: Duration,
    /// Axis homed through the first entry when it is not homed yet.
    pub rotation_homing: Option<RotationHomingConfig>,
    pub neutral: Vec<NeutralAction>,
    pub insertion: InsertionConfig,
    pub sweep: SweepConfig,
    pub section_rule: SectionRule,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            x_axis: 6,
            z_axis: 7,
            homing_axes: vec![8, 9],
            homing_timeout: Duration::from_secs(60),
            position_timeout: Duration::from_secs(60),
            rotation_homing: None,
            neutral: vec![NeutralAction::LinearHome { axis: 8 }],
            insertion: InsertionConfig::default(),
            sweep: SweepConfig::default(),
            section_rule: SectionRule::default(),
        }
    }
}

impl SequenceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.x_axis == self.z_axis {
            return Err(invalid(format!(
                "sequence.x_axis and sequence.z_axis are both axis {}",
                self.x_axis
            )));
        }
        if self.insertion.axis == self.insertion.nudge_axis {
            return Err(invalid(
                "sequence.insertion.nudge_axis must differ from the insertion axis",
            ));
        }
        if !self.insertion.nudge_distance.is_finite() || !self.sweep.nudge_off.is_finite() {
            return Err(invalid("nudge distances must be finite"));
        }
        self.section_rule.validate()
    }

    /// Every linear axis the sequence commands, in ascending order.
    pub fn linear_axes(&self) -> Vec<AxisIndex> {
        let mut axes = BTreeSet::from([
            self.x_axis,
            self.z_axis,
            self.insertion.axis,
            self.insertion.nudge_axis,
            self.sweep.axis,
        ]);
        axes.extend(self.homing_axes.iter().copied());
        axes.extend(self.rotation_homing.iter().map(|r| r.axis));
        axes.extend(self.neutral.iter().filter_map(|action| match action {
            NeutralAction::LinearHome { axis } => Some(*axis),
            NeutralAction::PneumaticRetract { .. } => None,
        }));
        axes.into_iter().collect()
    }

    /// Every pneumatic axis the sequence commands.
    pub fn pneumatic_axes(&self) -> Vec<u16> {
        let axes: BTreeSet<u16> = self
            .neutral
            .iter()
            .filter_map(|action| match action {
                NeutralAction::PneumaticRetract { axis } => Some(*axis),
                NeutralAction::LinearHome { .. } => None,
            })
            .collect();
        axes.into_iter().collect()
    }
}
