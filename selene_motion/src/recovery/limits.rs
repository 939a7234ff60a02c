//! Drive an axis onto a hardware limit switch.

use selene_common::plc::AxisIndex;
use std::time::Duration;
use tracing::{info, warn};

use crate::axis::Direction;
use crate::error::MotionError;
use crate::rig::Rig;

/// Back-off moves tried when the axis already sits on the switch.
pub const BACK_OFF_ATTEMPTS: u32 = 3;
/// Distance of one back-off move.
pub const BACK_OFF_DISTANCE: f64 = 3.0;

/// Move `index` in `direction` at `velocity` until the limit switch trips.
///
/// Software limits are disabled first since they would stop the axis short
/// of the switch. An axis already on the switch backs off first. The
/// switches are normally closed: the input reads `false` while active.
pub fn move_to_limit_switch(
    rig: &Rig,
    index: AxisIndex,
    direction: Direction,
    velocity: f64,
    timeout: Duration,
) -> Result<(), MotionError> {
    let axis = rig.axis(index);

    if axis.soft_limits_enabled()? {
        axis.set_soft_limits_enabled(false)?;
        if axis.soft_limits_enabled()? {
            return Err(MotionError::SoftLimitsNotDisabled { axis: index });
        }
    }

    let limit = direction.limit_bit();
    if !axis.read_bit(limit)? {
        warn!(axis = index, %direction, "Already on limit switch, backing off");
        let mut freed = false;
        for _ in 0..BACK_OFF_ATTEMPTS {
            axis.move_relative_and_wait(-direction.sign() * BACK_OFF_DISTANCE)?;
            rig.clock().sleep(rig.timing().settle);
            if axis.read_bit(limit)? {
                freed = true;
                break;
            }
        }
        if !freed {
            return Err(MotionError::LimitSwitchStuck {
                axis: index,
                direction,
                attempts: BACK_OFF_ATTEMPTS,
            });
        }
    }

    let guard = axis.move_velocity(direction.sign() * velocity.abs())?;
    let reached = axis.wait_for_bit(limit, false, timeout);
    guard.stop()?;
    reached?;
    rig.clock().sleep(rig.timing().settle);
    info!(axis = index, %direction, position = axis.position()?, "On limit switch");
    Ok(())
}
