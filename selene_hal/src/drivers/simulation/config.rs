//! Simulation setup, loadable from the `[simulation]` table of a rig file.

use selene_common::plc::{AxisIndex, HomingRoutine};
use serde::{Deserialize, Serialize};

/// Complete description of a simulated rig.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Linear and rotary axes.
    #[serde(default)]
    pub axes: Vec<SimAxisConfig>,

    /// Extend/retract actuators.
    #[serde(default)]
    pub pneumatic_axes: Vec<SimPneumaticConfig>,

    /// Hex-key insertion fixture, if the rig has one.
    #[serde(default)]
    pub hex_key: Option<HexKeyFixtureConfig>,
}

/// Initial state and kinematics of one simulated axis.
///
/// Motion is modelled at constant speed; acceleration and deceleration are
/// only published for travel-time estimation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimAxisConfig {
    pub index: AxisIndex,
    pub position: f64,
    /// Hard travel limit in the backward direction. `None` means the
    /// backward limit switch is never reached.
    pub travel_min: Option<f64>,
    /// Hard travel limit in the forward direction.
    pub travel_max: Option<f64>,
    pub homed: bool,
    pub enabled: bool,
    pub homing_routine: HomingRoutine,
    pub home_position: f64,
    /// Seconds a moving homing routine takes.
    pub home_duration: f64,
    pub velocity: f64,
    pub acceleration: f64,
    pub deceleration: f64,
    pub velocity_max: f64,
    pub slow_manual_velocity: f64,
    pub fast_manual_velocity: f64,
    pub homing_velocity: f64,
    pub target_window: f64,
    pub soft_limit_fwd: f64,
    pub soft_limit_bwd: f64,
    pub soft_limits_enabled: bool,
}

impl Default for SimAxisConfig {
    fn default() -> Self {
        Self {
            index: 1,
            position: 0.0,
            travel_min: None,
            travel_max: None,
            homed: false,
            enabled: true,
            homing_routine: HomingRoutine::LimitBwd,
            home_position: 0.0,
            home_duration: 2.0,
            velocity: 10.0,
            acceleration: 100.0,
            deceleration: 100.0,
            velocity_max: 50.0,
            slow_manual_velocity: 5.0,
            fast_manual_velocity: 20.0,
            homing_velocity: 2.0,
            target_window: 0.01,
            soft_limit_fwd: 0.0,
            soft_limit_bwd: 0.0,
            soft_limits_enabled: false,
        }
    }
}

impl SimAxisConfig {
    /// Default axis at `index`.
    pub fn new(index: AxisIndex) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }
}

/// Initial state of one simulated pneumatic actuator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimPneumaticConfig {
    pub index: u16,
    /// Controller timeout for extending, seconds.
    pub time_to_extend: i16,
    /// Controller timeout for retracting, seconds.
    pub time_to_retract: i16,
    /// Seconds the cylinder actually needs for a full stroke.
    pub stroke_duration: f64,
    pub extended: bool,
    pub interlocked: bool,
}

impl Default for SimPneumaticConfig {
    fn default() -> Self {
        Self {
            index: 1,
            time_to_extend: 5,
            time_to_retract: 5,
            stroke_duration: 2.0,
            extended: false,
            interlocked: false,
        }
    }
}

/// Hex-key insertion fixture.
///
/// When the insertion axis completes a move onto `inserted_position`, the
/// next [`InsertionScript`] decides which outcome flag the PLC raises.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HexKeyFixtureConfig {
    pub insertion_axis: AxisIndex,
    pub nudge_axis: AxisIndex,
    #[serde(default)]
    pub inserted_position: f64,
    pub inserted_flag: String,
    pub collided_flag: String,
    pub missed_flag: String,
    /// Outcomes of successive insertion attempts. Once exhausted every
    /// attempt inserts cleanly.
    #[serde(default)]
    pub scripts: Vec<InsertionScript>,
}

/// Outcome of one simulated insertion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum InsertionScript {
    /// The key goes straight in.
    Inserted,
    /// The key collides and goes in after `nudges` relative moves of the
    /// nudge axis.
    CollideThenInsert { nudges: u32 },
    /// The key collides whatever the nudge axis does.
    CollideForever,
    /// The key misses the screw head.
    Missed,
    /// No outcome flag is raised.
    NoFlags,
}
