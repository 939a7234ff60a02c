//! Hex-key insertion fixture.
//!
//! Stands in for the PLC program that watches the insertion axis and raises
//! exactly one of the Inserted / Collided / Missed flags per attempt.

use selene_common::plc::{AxisIndex, MotionFunction};
use std::collections::VecDeque;
use tracing::debug;

use super::axis::AxisEvent;
use super::config::{HexKeyFixtureConfig, InsertionScript};

const POSITION_EPSILON: f64 = 1e-6;

pub(crate) struct HexKeyFixture {
    config: HexKeyFixtureConfig,
    scripts: VecDeque<InsertionScript>,
    inserted: bool,
    collided: bool,
    missed: bool,
    /// Nudges still needed while collided; `None` collides forever.
    remaining_nudges: Option<u32>,
    attempts: u32,
}

impl HexKeyFixture {
    pub(crate) fn new(config: HexKeyFixtureConfig) -> Self {
        Self {
            scripts: config.scripts.iter().copied().collect(),
            config,
            inserted: false,
            collided: false,
            missed: false,
            remaining_nudges: None,
            attempts: 0,
        }
    }

    pub(crate) fn queue(&mut self, scripts: impl IntoIterator<Item = InsertionScript>) {
        self.scripts.extend(scripts);
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }

    pub(crate) fn flag(&self, symbol: &str) -> Option<bool> {
        if symbol == self.config.inserted_flag {
            Some(self.inserted)
        } else if symbol == self.config.collided_flag {
            Some(self.collided)
        } else if symbol == self.config.missed_flag {
            Some(self.missed)
        } else {
            None
        }
    }

    /// Overwrite a flag from outside. Returns false for foreign symbols.
    pub(crate) fn set_flag(&mut self, symbol: &str, value: bool) -> bool {
        if symbol == self.config.inserted_flag {
            self.inserted = value;
        } else if symbol == self.config.collided_flag {
            self.collided = value;
        } else if symbol == self.config.missed_flag {
            self.missed = value;
        } else {
            return false;
        }
        true
    }

    pub(crate) fn on_axis_event(&mut self, axis: AxisIndex, event: AxisEvent, position: f64) {
        if axis == self.config.insertion_axis {
            match event {
                AxisEvent::Started(_) => self.clear(),
                AxisEvent::Completed(
                    MotionFunction::MoveAbsolute
                    | MotionFunction::MoveRelative
                    | MotionFunction::MoveModulo,
                ) if (position - self.config.inserted_position).abs() <= POSITION_EPSILON => {
                    self.start_attempt();
                }
                AxisEvent::Completed(_) => {}
            }
        } else if axis == self.config.nudge_axis
            && event == AxisEvent::Completed(MotionFunction::MoveRelative)
            && self.collided
        {
            self.on_nudge();
        }
    }

    fn clear(&mut self) {
        self.inserted = false;
        self.collided = false;
        self.missed = false;
        self.remaining_nudges = None;
    }

    fn start_attempt(&mut self) {
        self.attempts += 1;
        let script = self.scripts.pop_front().unwrap_or(InsertionScript::Inserted);
        debug!(attempt = self.attempts, ?script, "Insertion attempt");
        self.clear();
        match script {
            InsertionScript::Inserted => self.inserted = true,
            InsertionScript::CollideThenInsert { nudges: 0 } => self.inserted = true,
            InsertionScript::CollideThenInsert { nudges } => {
                self.collided = true;
                self.remaining_nudges = Some(nudges);
            }
            InsertionScript::CollideForever => self.collided = true,
            InsertionScript::Missed => self.missed = true,
            InsertionScript::NoFlags => {}
        }
    }

    fn on_nudge(&mut self) {
        let Some(remaining) = self.remaining_nudges.as_mut() else {
            debug!("Nudge while colliding forever");
            return;
        };
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            self.collided = false;
            self.inserted = true;
            self.remaining_nudges = None;
            debug!("Key slipped in after nudge");
        }
    }
}
