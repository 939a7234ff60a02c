//! Axis controller.
//!
//! [`AxisController`] is a thin, copyable proxy for one `GVL.astAxes[n]`
//! structure on the controller. It holds no state of its own: every status
//! query reads the device, every command writes setpoints, `eCommand` and a
//! rising `bExecute`.
//!
//! Commands are non-blocking. The `*_and_wait` variants add the
//! command-done handshake with a timeout derived from a travel-time estimate.
//! The controller does not guard against issuing a command while another is
//! pending; the controller program supersedes the running function.

use selene_common::clock::Clock;
use selene_common::link::{DeviceLink, LinkError, PlcValue};
use selene_common::plc::axis::{
    AxisControlBit, COMMAND, ERROR_ID, HOME_SEQUENCE, PARAMETER_READ, PARAMETER_SELECT,
    PARAMETER_WRITE, axis_symbol, gear_master_index, gear_master_ratio,
};
use selene_common::plc::{
    AxisIndex, AxisParameter, AxisStatusBit, AxisStatusFlags, AxisValue, GearMaster,
    HomingRoutine, MotionCommand,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

use crate::config::TimingConfig;
use crate::error::MotionError;
use crate::travel::{self, MoveProfile};
use crate::wait::{self, PhaseOutcome, WaitOutcome};

/// Travel direction of an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub const fn sign(self) -> f64 {
        match self {
            Self::Forward => 1.0,
            Self::Backward => -1.0,
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }

    /// Hardware limit input in this direction. Normally closed: `false`
    /// means the switch is active.
    pub const fn limit_bit(self) -> AxisStatusBit {
        match self {
            Self::Forward => AxisStatusBit::LimitFwd,
            Self::Backward => AxisStatusBit::LimitBwd,
        }
    }

    const fn soft_limit_parameter(self) -> AxisParameter {
        match self {
            Self::Forward => AxisParameter::EnableLimitFwd,
            Self::Backward => AxisParameter::EnableLimitBwd,
        }
    }

    const fn soft_limit_position_parameter(self) -> AxisParameter {
        match self {
            Self::Forward => AxisParameter::SwLimitFwd,
            Self::Backward => AxisParameter::SwLimitBwd,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
        })
    }
}

/// Target of a positioning move, for travel-time estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveTarget {
    Absolute(f64),
    Relative(f64),
}

/// One consistent read of the values worth logging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisStatus {
    pub axis: AxisIndex,
    pub flags: AxisStatusFlags,
    pub position: f64,
    pub velocity: f64,
    pub error_id: u32,
}

impl AxisStatus {
    pub fn contains(&self, bit: AxisStatusBit) -> bool {
        self.flags.contains(bit.flag())
    }
}

impl fmt::Display for AxisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "axis {} @ {:.3} v={:.3} {:?}",
            self.axis, self.position, self.velocity, self.flags
        )?;
        if self.error_id != 0 {
            write!(f, " error={:#x}", self.error_id)?;
        }
        Ok(())
    }
}

/// Proxy for one NC axis.
#[derive(Clone, Copy)]
pub struct AxisController<'a> {
    link: &'a dyn DeviceLink,
    clock: &'a dyn Clock,
    timing: &'a TimingConfig,
    index: AxisIndex,
}

impl fmt::Debug for AxisController<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AxisController")
            .field("link", &self.link.name())
            .field("index", &self.index)
            .finish()
    }
}

impl<'a> AxisController<'a> {
    pub fn new(
        link: &'a dyn DeviceLink,
        clock: &'a dyn Clock,
        timing: &'a TimingConfig,
        index: AxisIndex,
    ) -> Self {
        Self {
            link,
            clock,
            timing,
            index,
        }
    }

    pub fn index(&self) -> AxisIndex {
        self.index
    }

    fn symbol(&self, path: &str) -> String {
        axis_symbol(self.index, path)
    }

    fn write(&self, path: &str, value: PlcValue) -> Result<(), LinkError> {
        let symbol = self.symbol(path);
        debug!(axis = self.index, %symbol, %value, "Write");
        self.link.write(&symbol, value)
    }

    // ─── Observation ────────────────────────────────────────────────

    pub fn read_bit(&self, bit: AxisStatusBit) -> Result<bool, LinkError> {
        let value = self.link.read_bool(&self.symbol(bit.path()))?;
        trace!(axis = self.index, bit = bit.path(), value, "Read");
        Ok(value)
    }

    pub fn read_value(&self, value: AxisValue) -> Result<f64, LinkError> {
        let read = self.link.read_lreal(&self.symbol(value.path()))?;
        trace!(axis = self.index, value = value.path(), read, "Read");
        Ok(read)
    }

    pub fn position(&self) -> Result<f64, LinkError> {
        self.read_value(AxisValue::ActPosition)
    }

    pub fn error_id(&self) -> Result<u32, LinkError> {
        self.link.read_udint(&self.symbol(ERROR_ID))
    }

    /// Configured homing routine; `None` for a code this crate does not know.
    pub fn home_sequence(&self) -> Result<Option<HomingRoutine>, LinkError> {
        let code = self.link.read_int(&self.symbol(HOME_SEQUENCE))?;
        Ok(HomingRoutine::from_code(code))
    }

    pub fn status(&self) -> Result<AxisStatus, LinkError> {
        let mut flags = AxisStatusFlags::empty();
        for bit in AxisStatusBit::ALL {
            if self.read_bit(bit)? {
                flags |= bit.flag();
            }
        }
        Ok(AxisStatus {
            axis: self.index,
            flags,
            position: self.position()?,
            velocity: self.read_value(AxisValue::ActVelocity)?,
            error_id: self.error_id()?,
        })
    }

    /// `Err(AxisFault)` when `bError` is set.
    pub fn check_fault(&self) -> Result<(), MotionError> {
        if self.read_bit(AxisStatusBit::Error)? {
            let error_id = self.error_id()?;
            warn!(axis = self.index, error_id, "Axis in error");
            return Err(MotionError::AxisFault {
                axis: self.index,
                error_id,
            });
        }
        Ok(())
    }

    /// Whether the actual position lies within the target position window
    /// around `target`, or around the commanded target if `None`.
    pub fn check_target_position_window(&self, target: Option<f64>) -> Result<bool, LinkError> {
        let target = match target {
            Some(target) => target,
            None => self.read_value(AxisValue::TargetPosition)?,
        };
        let window = self.read_value(AxisValue::TargetPositionWindow)?;
        let position = self.position()?;
        Ok((position - target).abs() < window)
    }

    // ─── Control bits ───────────────────────────────────────────────

    fn set_control(&self, bit: AxisControlBit, value: bool) -> Result<(), LinkError> {
        self.write(bit.path(), PlcValue::Bool(value))
    }

    pub fn execute(&self) -> Result<(), LinkError> {
        self.set_control(AxisControlBit::Execute, true)
    }

    pub fn reset(&self) -> Result<(), LinkError> {
        info!(axis = self.index, "Reset");
        self.set_control(AxisControlBit::Reset, true)
    }

    /// Controlled stop with the configured deceleration.
    pub fn halt(&self) -> Result<(), LinkError> {
        debug!(axis = self.index, "Halt");
        self.set_control(AxisControlBit::Halt, true)
    }

    pub fn stop(&self) -> Result<(), LinkError> {
        debug!(axis = self.index, "Stop");
        self.set_control(AxisControlBit::Stop, true)
    }

    pub fn enable(&self) -> Result<(), LinkError> {
        info!(axis = self.index, "Enable");
        self.set_control(AxisControlBit::Enable, true)
    }

    pub fn disable(&self) -> Result<(), LinkError> {
        info!(axis = self.index, "Disable");
        self.set_control(AxisControlBit::Enable, false)
    }

    // ─── Commands ───────────────────────────────────────────────────

    /// Write the setpoints of `command`, its function code, then execute.
    pub fn issue(&self, command: MotionCommand) -> Result<(), LinkError> {
        debug!(axis = self.index, ?command, "Issue");
        match command {
            MotionCommand::AbsoluteMove(position) | MotionCommand::RelativeMove(position) => {
                self.write(AxisValue::TargetPosition.path(), PlcValue::LReal(position))?;
            }
            MotionCommand::VelocityMove(velocity) => {
                self.write(AxisValue::Velocity.path(), PlcValue::LReal(velocity))?;
            }
            MotionCommand::GearIn(masters) => {
                for (slot, master) in (1u8..).zip(masters) {
                    if let Some(GearMaster { axis, ratio }) = master {
                        self.write(&gear_master_index(slot), PlcValue::UInt(axis))?;
                        self.write(&gear_master_ratio(slot), PlcValue::LReal(ratio))?;
                    }
                }
            }
            MotionCommand::WriteParameter(parameter, value) => {
                self.write(PARAMETER_SELECT, PlcValue::Int(parameter.code()))?;
                self.write(PARAMETER_WRITE, PlcValue::LReal(value))?;
            }
            MotionCommand::ReadParameter(parameter) => {
                self.write(PARAMETER_SELECT, PlcValue::Int(parameter.code()))?;
            }
            MotionCommand::Home | MotionCommand::GearOut => {}
        }
        self.write(COMMAND, PlcValue::Int(command.function().code()))?;
        self.execute()
    }

    pub fn move_absolute(&self, position: f64) -> Result<(), LinkError> {
        info!(axis = self.index, position, "Move absolute");
        self.issue(MotionCommand::AbsoluteMove(position))
    }

    pub fn move_relative(&self, distance: f64) -> Result<(), LinkError> {
        info!(axis = self.index, distance, "Move relative");
        self.issue(MotionCommand::RelativeMove(distance))
    }

    /// Move and block until the controller reports the move done.
    ///
    /// The travel time is estimated before anything is written, so an axis
    /// with zero velocity or ramps is rejected without moving.
    pub fn move_absolute_and_wait(&self, position: f64) -> Result<(), MotionError> {
        let estimate = self.estimate_move_time(MoveTarget::Absolute(position))?;
        self.move_absolute(position)?;
        self.wait_for_command_done(estimate + self.timing.move_margin)
    }

    pub fn move_relative_and_wait(&self, distance: f64) -> Result<(), MotionError> {
        let estimate = self.estimate_move_time(MoveTarget::Relative(distance))?;
        self.move_relative(distance)?;
        self.wait_for_command_done(estimate + self.timing.move_margin)
    }

    /// Start a continuous move. The returned guard halts the axis when it
    /// goes out of scope.
    pub fn move_velocity(&self, velocity: f64) -> Result<JogGuard<'a>, LinkError> {
        info!(axis = self.index, velocity, "Move velocity");
        self.issue(MotionCommand::VelocityMove(velocity))?;
        Ok(JogGuard::new(*self))
    }

    /// Continuous move at the slow manual velocity.
    pub fn jog(&self, direction: Direction) -> Result<JogGuard<'a>, LinkError> {
        let slow = self.read_value(AxisValue::VelocitySlowManual)?;
        info!(axis = self.index, %direction, velocity = slow, "Jog");
        self.issue(MotionCommand::VelocityMove(direction.sign() * slow.abs()))?;
        Ok(JogGuard::new(*self))
    }

    pub fn jog_forward(&self) -> Result<JogGuard<'a>, LinkError> {
        self.jog(Direction::Forward)
    }

    pub fn jog_backward(&self) -> Result<JogGuard<'a>, LinkError> {
        self.jog(Direction::Backward)
    }

    pub fn jog_stop(&self) -> Result<(), LinkError> {
        self.halt()
    }

    /// Home with the routine configured on the controller.
    pub fn home(&self) -> Result<(), LinkError> {
        let routine = self.home_sequence()?;
        let position = self.read_value(AxisValue::HomePosition)?;
        let finish = self.read_value(AxisValue::HomeFinishDistance)?;
        info!(axis = self.index, ?routine, position, finish, "Home");
        self.issue(MotionCommand::Home)
    }

    /// Configure a homing routine, then home.
    pub fn home_with(
        &self,
        routine: HomingRoutine,
        position: f64,
        finish_distance: f64,
    ) -> Result<(), LinkError> {
        info!(axis = self.index, ?routine, position, finish_distance, "Home with routine");
        self.write(HOME_SEQUENCE, PlcValue::Int(routine.code()))?;
        self.write(AxisValue::HomePosition.path(), PlcValue::LReal(position))?;
        self.write(
            AxisValue::HomeFinishDistance.path(),
            PlcValue::LReal(finish_distance),
        )?;
        self.issue(MotionCommand::Home)
    }

    /// Couple to up to four master axes.
    pub fn gear_in(&self, masters: [Option<GearMaster>; 4]) -> Result<(), MotionError> {
        info!(axis = self.index, ?masters, "Gear in");
        self.issue(MotionCommand::GearIn(masters))?;
        self.wait_for_command_done(self.timing.done_high_timeout)
    }

    pub fn gear_out(&self) -> Result<(), MotionError> {
        info!(axis = self.index, "Gear out");
        self.issue(MotionCommand::GearOut)?;
        self.wait_for_command_done(self.timing.done_high_timeout)
    }

    // ─── NC parameters ──────────────────────────────────────────────

    pub fn write_parameter(&self, parameter: AxisParameter, value: f64) -> Result<(), MotionError> {
        debug!(axis = self.index, ?parameter, value, "Write NC parameter");
        self.issue(MotionCommand::WriteParameter(parameter, value))?;
        self.wait_for_command_done(self.timing.done_high_timeout)
    }

    pub fn read_parameter(&self, parameter: AxisParameter) -> Result<f64, MotionError> {
        self.issue(MotionCommand::ReadParameter(parameter))?;
        self.wait_for_command_done(self.timing.done_high_timeout)?;
        let value = self.link.read_lreal(&self.symbol(PARAMETER_READ))?;
        debug!(axis = self.index, ?parameter, value, "Read NC parameter");
        Ok(value)
    }

    /// Enable or disable the software limit in one direction.
    pub fn set_soft_limit_enabled(
        &self,
        direction: Direction,
        enabled: bool,
    ) -> Result<(), MotionError> {
        let value = if enabled { 1.0 } else { 0.0 };
        self.write_parameter(direction.soft_limit_parameter(), value)
    }

    /// Enable or disable both software limits.
    pub fn set_soft_limits_enabled(&self, enabled: bool) -> Result<(), MotionError> {
        info!(axis = self.index, enabled, "Software limits");
        self.set_soft_limit_enabled(Direction::Forward, enabled)?;
        self.set_soft_limit_enabled(Direction::Backward, enabled)
    }

    pub fn set_soft_limit(&self, direction: Direction, position: f64) -> Result<(), MotionError> {
        self.write_parameter(direction.soft_limit_position_parameter(), position)
    }

    pub fn soft_limits_enabled(&self) -> Result<bool, LinkError> {
        Ok(self.read_bit(AxisStatusBit::SoftLimitFwdEnabled)?
            || self.read_bit(AxisStatusBit::SoftLimitBwdEnabled)?)
    }

    pub fn set_slow_manual_velocity(&self, velocity: f64) -> Result<(), MotionError> {
        self.write_parameter(AxisParameter::AxisVeloManSlow, velocity)
    }

    pub fn set_target_position_window(&self, window: f64) -> Result<(), MotionError> {
        self.write_parameter(AxisParameter::AxisTargetPositionWindow, window)
    }

    pub fn set_target_position_monitoring(&self, enabled: bool) -> Result<(), MotionError> {
        let value = if enabled { 1.0 } else { 0.0 };
        self.write_parameter(AxisParameter::AxisEnTargetPositionMonitoring, value)
    }

    // ─── Travel time ────────────────────────────────────────────────

    pub fn estimate_move_time(&self, target: MoveTarget) -> Result<Duration, MotionError> {
        let distance = match target {
            MoveTarget::Absolute(position) => position - self.position()?,
            MoveTarget::Relative(distance) => distance,
        };
        let profile = MoveProfile {
            velocity: self.read_value(AxisValue::Velocity)?,
            acceleration: self.read_value(AxisValue::Acceleration)?,
            deceleration: self.read_value(AxisValue::Deceleration)?,
            distance,
        };
        let estimate = travel::estimate_move_time(&profile, self.timing.safety_factor)?;
        debug!(axis = self.index, ?target, ?estimate, "Travel time");
        Ok(estimate)
    }

    pub fn estimate_range_time(&self) -> Result<Duration, MotionError> {
        Ok(travel::estimate_range_time(
            self.read_value(AxisValue::SoftLimitFwd)?,
            self.read_value(AxisValue::SoftLimitBwd)?,
            self.read_value(AxisValue::HomingVelocityFromCam)?,
            self.timing.safety_factor,
        )?)
    }

    pub fn estimate_accel_time(&self) -> Result<Duration, MotionError> {
        Ok(travel::estimate_accel_time(
            self.read_value(AxisValue::HomingVelocityFromCam)?,
            self.read_value(AxisValue::Acceleration)?,
            self.timing.safety_factor,
        )?)
    }

    pub fn estimate_decel_time(&self) -> Result<Duration, MotionError> {
        Ok(travel::estimate_decel_time(
            self.read_value(AxisValue::VelocityMax)?,
            self.read_value(AxisValue::Deceleration)?,
            self.timing.safety_factor,
        )?)
    }

    // ─── Waits ──────────────────────────────────────────────────────

    /// Command-done handshake with `done_high` as phase-3 timeout.
    pub fn wait_for_command_done(&self, done_high: Duration) -> Result<(), MotionError> {
        let timeouts = self.timing.command_done_timeouts(done_high);
        let outcome = wait::wait_for_command_done(
            self.clock,
            |bit| self.read_bit(bit),
            &timeouts,
            self.timing.poll_interval,
        )?;
        match outcome {
            PhaseOutcome::Completed => Ok(()),
            PhaseOutcome::TimedOut { phase, timeout } => {
                warn!(axis = self.index, %phase, ?timeout, "Command not done");
                Err(MotionError::CommandPhaseTimeout {
                    axis: self.index,
                    phase,
                    timeout,
                })
            }
        }
    }

    /// Wait for a status bit to read `expected`.
    pub fn wait_for_bit(
        &self,
        bit: AxisStatusBit,
        expected: bool,
        timeout: Duration,
    ) -> Result<(), MotionError> {
        let outcome = wait::wait_for(
            self.clock,
            || self.read_bit(bit),
            expected,
            timeout,
            self.timing.poll_interval,
        )?;
        if outcome.is_reached() {
            return Ok(());
        }
        warn!(axis = self.index, bit = bit.path(), expected, "Wait timed out");
        Err(MotionError::WaitTimeout {
            axis: self.index,
            condition: bit.path(),
            timeout: wait::effective_timeout(timeout),
        })
    }

    pub fn wait_homed(&self, timeout: Duration) -> Result<(), MotionError> {
        self.wait_for_bit(AxisStatusBit::Homed, true, timeout)
    }

    pub fn wait_enabled(&self, enabled: bool, timeout: Duration) -> Result<(), MotionError> {
        self.wait_for_bit(AxisStatusBit::Enabled, enabled, timeout)
    }

    /// Wait until `bMoving` drops. An axis error while waiting is a fault.
    pub fn wait_while_moving(&self, timeout: Duration) -> Result<(), MotionError> {
        let outcome = wait::wait_for(
            self.clock,
            || {
                self.check_fault()?;
                Ok::<_, MotionError>(self.read_bit(AxisStatusBit::Moving)?)
            },
            false,
            timeout,
            self.timing.poll_interval,
        )?;
        match outcome {
            WaitOutcome::Reached => Ok(()),
            WaitOutcome::TimedOut => Err(MotionError::WaitTimeout {
                axis: self.index,
                condition: "motion end",
                timeout: wait::effective_timeout(timeout),
            }),
        }
    }

    /// Wait until the actual velocity rounds to zero or the axis reports
    /// not moving.
    pub fn wait_for_stop(&self, timeout: Duration) -> Result<(), MotionError> {
        let outcome = wait::wait_for(
            self.clock,
            || {
                let velocity = self.read_value(AxisValue::ActVelocity)?;
                let stopped = (velocity * 100.0).round() == 0.0;
                Ok::<_, LinkError>(stopped || !self.read_bit(AxisStatusBit::Moving)?)
            },
            true,
            timeout,
            self.timing.poll_interval,
        )?;
        match outcome {
            WaitOutcome::Reached => Ok(()),
            WaitOutcome::TimedOut => Err(MotionError::WaitTimeout {
                axis: self.index,
                condition: "standstill",
                timeout: wait::effective_timeout(timeout),
            }),
        }
    }

    // ─── Recovery ───────────────────────────────────────────────────

    /// Bring the axis back to enabled and error-free.
    ///
    /// Disables first if enabled, resets, then enables. Safe to repeat.
    pub fn reinitialize(&self) -> Result<(), MotionError> {
        let timeout = self.timing.enable_timeout;
        if self.read_bit(AxisStatusBit::Enabled)? {
            self.disable()?;
            self.clock.sleep(self.timing.settle);
            self.wait_enabled(false, timeout)?;
        }
        self.reset()?;
        self.clock.sleep(self.timing.settle);
        if !self.read_bit(AxisStatusBit::Enabled)? {
            self.enable()?;
            self.clock.sleep(self.timing.settle);
            self.wait_enabled(true, timeout)?;
        }
        info!(axis = self.index, "Axis reinitialised");
        Ok(())
    }
}

/// Halts a continuously moving axis when dropped.
///
/// Every exit path of a procedure that started a velocity move, including
/// `?` and unwinding, releases the axis.
#[must_use = "dropping the guard halts the axis immediately"]
pub struct JogGuard<'a> {
    axis: AxisController<'a>,
    armed: bool,
}

impl<'a> JogGuard<'a> {
    fn new(axis: AxisController<'a>) -> Self {
        Self { axis, armed: true }
    }

    pub fn axis(&self) -> &AxisController<'a> {
        &self.axis
    }

    /// Halt now and report the result.
    pub fn stop(mut self) -> Result<(), LinkError> {
        self.armed = false;
        self.axis.halt()
    }
}

impl Drop for JogGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self.axis.halt() {
            Ok(()) => warn!(axis = self.axis.index, "Continuous move halted on scope exit"),
            Err(e) => error!(axis = self.axis.index, error = %e, "Failed to halt continuous move"),
        }
    }
}
