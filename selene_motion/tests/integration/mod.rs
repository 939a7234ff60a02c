//! Shared simulated rig for the integration tests.
//!
//! Axis layout matches the default sequence configuration: X on 6, Z on 7,
//! the insertion axis on 8 (retracted at 50, inserted at 0), a homing
//! prerequisite on 9 and the rotation axis on 10 with hard stops at 0 and
//! 360.

mod insertion;
mod limits;
mod sequencer;
mod sweep;

use selene_common::clock::SimClock;
use selene_hal::drivers::simulation::{
    HexKeyFixtureConfig, SimAxisConfig, SimPneumaticConfig, SimulatedPlc, SimulationConfig,
};
use selene_motion::config::{InsertionFlags, SequenceConfig, SweepConfig, TimingConfig};
use selene_motion::rig::Rig;
use std::sync::Arc;
use std::time::Duration;

pub const X_AXIS: u16 = 6;
pub const Z_AXIS: u16 = 7;
pub const INSERTION_AXIS: u16 = 8;
pub const ROTATION_AXIS: u16 = 10;
pub const RETRACTED: f64 = 50.0;
pub const TRAVEL: f64 = 360.0;

pub fn timing() -> TimingConfig {
    TimingConfig {
        poll_interval: Duration::from_millis(100),
        settle: Duration::from_millis(200),
        ..TimingConfig::default()
    }
}

pub fn simulation() -> SimulationConfig {
    let flags = InsertionFlags::default();
    SimulationConfig {
        axes: vec![
            SimAxisConfig::new(X_AXIS),
            SimAxisConfig::new(Z_AXIS),
            SimAxisConfig {
                position: RETRACTED,
                home_position: RETRACTED,
                ..SimAxisConfig::new(INSERTION_AXIS)
            },
            SimAxisConfig::new(9),
            SimAxisConfig {
                position: 100.0,
                travel_min: Some(0.0),
                travel_max: Some(TRAVEL),
                homed: true,
                ..SimAxisConfig::new(ROTATION_AXIS)
            },
        ],
        pneumatic_axes: vec![SimPneumaticConfig::default()],
        hex_key: Some(HexKeyFixtureConfig {
            insertion_axis: INSERTION_AXIS,
            nudge_axis: ROTATION_AXIS,
            inserted_position: 0.0,
            inserted_flag: flags.inserted,
            collided_flag: flags.collided,
            missed_flag: flags.missed,
            scripts: Vec::new(),
        }),
    }
}

pub fn sequence() -> SequenceConfig {
    SequenceConfig {
        position_timeout: Duration::from_secs(20),
        sweep: SweepConfig {
            axis: ROTATION_AXIS,
            timeout: Duration::from_secs(120),
            nudge_off: 5.0,
        },
        ..SequenceConfig::default()
    }
}

/// Simulated controller, its clock and an open rig on top of them.
pub struct SimRig {
    pub plc: SimulatedPlc,
    pub clock: SimClock,
    pub rig: Rig,
}

impl SimRig {
    pub fn new() -> Self {
        Self::with_simulation(simulation())
    }

    pub fn with_simulation(config: SimulationConfig) -> Self {
        let clock = SimClock::new();
        let plc = SimulatedPlc::new(&config, Arc::new(clock.clone()));
        let rig = Rig::open(Box::new(plc.clone()), Arc::new(clock.clone()), timing())
            .expect("simulated link opens");
        Self { plc, clock, rig }
    }
}
