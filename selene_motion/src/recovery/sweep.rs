//! Full-range sweep of the rotation axis.

use selene_common::plc::AxisStatusBit;
use tracing::{info, warn};

use crate::axis::{AxisController, Direction};
use crate::config::SweepConfig;
use crate::error::{MotionError, SweepError};
use crate::rig::Rig;
use crate::wait::wait_for;

/// Positions at which the two extremes were found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepReport {
    pub forward: f64,
    pub backward: f64,
}

impl SweepReport {
    pub fn range(&self) -> f64 {
        (self.forward - self.backward).abs()
    }
}

/// Jog forward until the axis errors or its forward limit trips, then
/// backward likewise, and report both extremes.
///
/// A missing extreme is [`SweepError::ExtremeNotReached`]; no partial range
/// is ever reported.
pub fn measure_full_range(rig: &Rig, config: &SweepConfig) -> Result<SweepReport, SweepError> {
    let axis = rig.axis(config.axis);
    let forward = find_extreme(rig, &axis, Direction::Forward, config)?;
    let backward = find_extreme(rig, &axis, Direction::Backward, config)?;
    let report = SweepReport { forward, backward };
    info!(axis = config.axis, forward, backward, range = report.range(), "Full range measured");
    Ok(report)
}

fn find_extreme(
    rig: &Rig,
    axis: &AxisController<'_>,
    direction: Direction,
    config: &SweepConfig,
) -> Result<f64, SweepError> {
    // A refused jog raises bError without moving; that must not read as a stop.
    axis.check_fault()?;
    if !axis.read_bit(AxisStatusBit::Enabled)? {
        warn!(axis = axis.index(), %direction, "Sweep on a disabled axis");
        return Err(MotionError::NotEnabled { axis: axis.index() }.into());
    }

    let limit = direction.limit_bit();
    let start = axis.position()?;
    let mut moved = false;
    let guard = axis.jog(direction)?;
    let outcome = wait_for(
        rig.clock(),
        || {
            // Limit inputs are normally closed.
            if !axis.read_bit(limit)? {
                return Ok::<_, SweepError>(true);
            }
            moved |= axis.read_bit(AxisStatusBit::Moving)? || axis.position()? != start;
            if !axis.read_bit(AxisStatusBit::Error)? {
                return Ok(false);
            }
            if moved {
                Ok(true)
            } else {
                axis.check_fault()?;
                Ok(false)
            }
        },
        true,
        config.timeout,
        rig.timing().poll_interval,
    )?;
    guard.stop()?;

    if !outcome.is_reached() {
        warn!(axis = axis.index(), %direction, timeout = ?config.timeout, "Extreme not reached");
        return Err(SweepError::ExtremeNotReached(direction));
    }

    let position = axis.position()?;
    info!(axis = axis.index(), %direction, position, "Extreme reached");
    axis.reinitialize()?;
    if config.nudge_off != 0.0 {
        axis.move_relative_and_wait(-direction.sign() * config.nudge_off.abs())?;
    }
    Ok(position)
}
