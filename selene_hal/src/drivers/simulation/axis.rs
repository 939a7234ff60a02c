//! Simulated NC axis.
//!
//! Mirrors the observable behaviour of one `ST_AxisStruct` on the
//! controller: an `eCommand` + rising `bExecute` starts a function, `bDone`
//! drops and `bBusy` rises in the same PLC cycle, and completion is only
//! reported once time has advanced. Motion runs at constant speed.

use selene_common::link::{LinkError, PlcValue};
use selene_common::plc::axis::{
    self as layout, AxisControlBit, gear_master_index, gear_master_ratio,
};
use selene_common::plc::{AxisParameter, AxisStatusBit, AxisValue, HomingRoutine, MotionFunction};
use tracing::{debug, trace, warn};

use super::config::SimAxisConfig;

// ─── NC error ids raised by the simulator ───────────────────────────

/// Drive not enabled when a motion function was executed.
pub const ERROR_NOT_READY: u32 = 0x4260;
/// Commanded velocity is zero or invalid.
pub const ERROR_INVALID_VELOCITY: u32 = 0x4222;
/// Unknown `eCommand` or NC parameter.
pub const ERROR_INVALID_COMMAND: u32 = 0x4221;
/// Forward hardware limit switch hit.
pub const ERROR_LIMIT_FWD: u32 = 0x4357;
/// Backward hardware limit switch hit.
pub const ERROR_LIMIT_BWD: u32 = 0x4356;
/// Forward software limit hit.
pub const ERROR_SOFT_LIMIT_FWD: u32 = 0x4550;
/// Backward software limit hit.
pub const ERROR_SOFT_LIMIT_BWD: u32 = 0x4551;

const POSITION_EPSILON: f64 = 1e-9;

/// Command lifecycle event reported to fixtures and the command log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum AxisEvent {
    Started(MotionFunction),
    Completed(MotionFunction),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Motion {
    Idle,
    /// Completes on the next time step.
    Instant(MotionFunction),
    Positioning {
        function: MotionFunction,
        goal: f64,
        speed: f64,
    },
    Velocity(f64),
    Homing {
        remaining: f64,
        moving: bool,
    },
    /// Accepted but never progresses.
    Stalled,
}

pub(crate) struct SimAxis {
    config: SimAxisConfig,

    // ─── Status ─────────────────────────────────────────────────────
    position: f64,
    goal: f64,
    enabled: bool,
    homed: bool,
    busy: bool,
    done: bool,
    aborted: bool,
    geared: bool,
    error: bool,
    error_id: u32,
    motion: Motion,

    // ─── Control ────────────────────────────────────────────────────
    command: i16,
    execute: bool,
    reset: bool,
    halt: bool,
    stop: bool,
    velocity: f64,
    jog_velocity: f64,
    acceleration: f64,
    deceleration: f64,
    target: f64,
    override_pct: f64,

    // ─── Config / NC parameters ─────────────────────────────────────
    home_sequence: i16,
    home_position: f64,
    home_finish_distance: f64,
    parameter_select: i16,
    parameter_write: f64,
    parameter_read: f64,
    gear_masters: [(u16, f64); 4],
    slow_manual: f64,
    fast_manual: f64,
    soft_limit_fwd: f64,
    soft_limit_bwd: f64,
    soft_fwd_enabled: bool,
    soft_bwd_enabled: bool,
    lag_monitoring: bool,
    lag_max: f64,
    target_monitoring: bool,
    target_window: f64,

    // ─── Fault injection ────────────────────────────────────────────
    stall_targets: Vec<f64>,
    ignore_execute: bool,
}

impl SimAxis {
    pub(crate) fn new(config: SimAxisConfig) -> Self {
        Self {
            position: config.position,
            goal: config.position,
            enabled: config.enabled,
            homed: config.homed,
            busy: false,
            done: true,
            aborted: false,
            geared: false,
            error: false,
            error_id: 0,
            motion: Motion::Idle,
            command: MotionFunction::MoveAbsolute.code(),
            execute: false,
            reset: false,
            halt: false,
            stop: false,
            velocity: config.velocity,
            jog_velocity: config.slow_manual_velocity,
            acceleration: config.acceleration,
            deceleration: config.deceleration,
            target: config.position,
            override_pct: 100.0,
            home_sequence: config.homing_routine.code(),
            home_position: config.home_position,
            home_finish_distance: 0.0,
            parameter_select: 0,
            parameter_write: 0.0,
            parameter_read: 0.0,
            gear_masters: [(0, 0.0); 4],
            slow_manual: config.slow_manual_velocity,
            fast_manual: config.fast_manual_velocity,
            soft_limit_fwd: config.soft_limit_fwd,
            soft_limit_bwd: config.soft_limit_bwd,
            soft_fwd_enabled: config.soft_limits_enabled,
            soft_bwd_enabled: config.soft_limits_enabled,
            lag_monitoring: true,
            lag_max: 1.0,
            target_monitoring: true,
            target_window: config.target_window,
            stall_targets: Vec::new(),
            ignore_execute: false,
            config,
        }
    }

    pub(crate) fn index(&self) -> u16 {
        self.config.index
    }

    pub(crate) fn position(&self) -> f64 {
        self.position
    }

    /// Setpoint that accompanies `function` in the command log.
    pub(crate) fn setpoint(&self, function: MotionFunction) -> f64 {
        match function {
            MotionFunction::MoveVelocity => self.velocity,
            MotionFunction::WriteParameter => self.parameter_write,
            MotionFunction::Home => self.home_position,
            _ => self.target,
        }
    }

    // ─── Fault injection ────────────────────────────────────────────

    pub(crate) fn stall_on_target(&mut self, target: f64) {
        self.stall_targets.push(target);
    }

    pub(crate) fn set_ignore_execute(&mut self, ignore: bool) {
        self.ignore_execute = ignore;
    }

    pub(crate) fn inject_error(&mut self, error_id: u32) {
        warn!(axis = self.index(), error_id, "Injected axis error");
        self.fault(error_id);
    }

    // ─── Time ───────────────────────────────────────────────────────

    /// Advance the axis model by `dt` seconds.
    pub(crate) fn advance(&mut self, dt: f64) -> Option<AxisEvent> {
        if dt <= 0.0 {
            return None;
        }

        match self.motion {
            Motion::Idle | Motion::Stalled => None,
            Motion::Instant(function) => Some(self.complete(function)),
            Motion::Homing { remaining, moving } => {
                if remaining <= dt {
                    self.homed = true;
                    self.position = self.home_position;
                    self.goal = self.position;
                    Some(self.complete(MotionFunction::Home))
                } else {
                    self.motion = Motion::Homing {
                        remaining: remaining - dt,
                        moving,
                    };
                    None
                }
            }
            Motion::Positioning {
                function,
                goal,
                speed,
            } => {
                let remaining = goal - self.position;
                let step = speed * dt;
                let next = if remaining.abs() <= step {
                    goal
                } else {
                    self.position + step * remaining.signum()
                };
                if self.limit_reached(next, remaining) {
                    return None;
                }
                self.position = next;
                if (next - goal).abs() <= POSITION_EPSILON {
                    Some(self.complete(function))
                } else {
                    None
                }
            }
            Motion::Velocity(speed) => {
                let next = self.position + speed * dt;
                if !self.limit_reached(next, speed) {
                    self.position = next;
                }
                None
            }
        }
    }

    /// Clamp at a travel or software limit crossed on the way to `next`.
    fn limit_reached(&mut self, next: f64, direction: f64) -> bool {
        if direction > 0.0 {
            if self.soft_fwd_enabled && next > self.soft_limit_fwd {
                self.position = self.soft_limit_fwd;
                self.fault(ERROR_SOFT_LIMIT_FWD);
                return true;
            }
            if let Some(max) = self.config.travel_max
                && next > max
            {
                self.position = max;
                self.fault(ERROR_LIMIT_FWD);
                return true;
            }
        } else if direction < 0.0 {
            if self.soft_bwd_enabled && next < self.soft_limit_bwd {
                self.position = self.soft_limit_bwd;
                self.fault(ERROR_SOFT_LIMIT_BWD);
                return true;
            }
            if let Some(min) = self.config.travel_min
                && next < min
            {
                self.position = min;
                self.fault(ERROR_LIMIT_BWD);
                return true;
            }
        }
        false
    }

    fn complete(&mut self, function: MotionFunction) -> AxisEvent {
        self.motion = Motion::Idle;
        self.busy = false;
        self.done = true;
        debug!(axis = self.index(), ?function, position = self.position, "Command done");
        AxisEvent::Completed(function)
    }

    fn fault(&mut self, error_id: u32) {
        self.motion = Motion::Idle;
        self.goal = self.position;
        self.busy = false;
        self.done = false;
        self.error = true;
        self.error_id = error_id;
        debug!(axis = self.index(), error_id, position = self.position, "Axis error");
    }

    fn is_moving(&self) -> bool {
        match self.motion {
            Motion::Positioning { .. } | Motion::Velocity(_) | Motion::Stalled => true,
            Motion::Homing { moving, .. } => moving,
            Motion::Idle | Motion::Instant(_) => false,
        }
    }

    fn act_velocity(&self) -> f64 {
        match self.motion {
            Motion::Positioning { goal, speed, .. } => speed * (goal - self.position).signum(),
            Motion::Velocity(speed) => speed,
            Motion::Homing { moving: true, .. } => -self.config.homing_velocity,
            _ => 0.0,
        }
    }

    fn on_fwd_limit(&self) -> bool {
        self.config.travel_max.is_some_and(|max| self.position >= max)
    }

    fn on_bwd_limit(&self) -> bool {
        self.config.travel_min.is_some_and(|min| self.position <= min)
    }

    // ─── Symbol access ──────────────────────────────────────────────

    pub(crate) fn read(&self, path: &str) -> Option<PlcValue> {
        if let Some(bit) = AxisStatusBit::ALL.iter().find(|b| b.path() == path) {
            return Some(PlcValue::Bool(self.status_bit(*bit)));
        }
        if let Some(value) = AxisValue::ALL.iter().find(|v| v.path() == path) {
            return Some(PlcValue::LReal(self.value(*value)));
        }
        if let Some(bit) = AxisControlBit::ALL.iter().find(|b| b.path() == path) {
            return Some(PlcValue::Bool(self.control_bit(*bit)));
        }
        match path {
            layout::COMMAND => Some(PlcValue::Int(self.command)),
            layout::ERROR_ID => Some(PlcValue::UDInt(self.error_id)),
            layout::HOME_SEQUENCE => Some(PlcValue::Int(self.home_sequence)),
            layout::PARAMETER_SELECT => Some(PlcValue::Int(self.parameter_select)),
            layout::PARAMETER_WRITE => Some(PlcValue::LReal(self.parameter_write)),
            layout::PARAMETER_READ => Some(PlcValue::LReal(self.parameter_read)),
            _ => self.gear_slot(path).map(|(slot, is_index)| {
                let (axis, ratio) = self.gear_masters[slot];
                if is_index {
                    PlcValue::UInt(axis)
                } else {
                    PlcValue::LReal(ratio)
                }
            }),
        }
    }

    /// Apply a write. The caller has already checked that `path` exists and
    /// that `value` carries the symbol's type.
    pub(crate) fn write(
        &mut self,
        symbol: &str,
        path: &str,
        value: PlcValue,
    ) -> Result<Option<AxisEvent>, LinkError> {
        if let Some(bit) = AxisControlBit::ALL.iter().find(|b| b.path() == path) {
            return Ok(self.write_control(*bit, value.to_bool(symbol)?));
        }
        if let Some(field) = AxisValue::ALL.iter().find(|v| v.path() == path) {
            let value = value.to_lreal(symbol)?;
            if field.is_writable() {
                self.set_value(*field, value);
            } else {
                trace!(symbol, "Write to NC-owned value ignored");
            }
            return Ok(None);
        }
        match path {
            layout::COMMAND => self.command = value.to_int(symbol)?,
            layout::HOME_SEQUENCE => self.home_sequence = value.to_int(symbol)?,
            layout::PARAMETER_SELECT => self.parameter_select = value.to_int(symbol)?,
            layout::PARAMETER_WRITE => self.parameter_write = value.to_lreal(symbol)?,
            _ => match self.gear_slot(path) {
                Some((slot, true)) => self.gear_masters[slot].0 = value.to_uint(symbol)?,
                Some((slot, false)) => self.gear_masters[slot].1 = value.to_lreal(symbol)?,
                None => trace!(symbol, "Write to status value ignored"),
            },
        }
        Ok(None)
    }

    fn gear_slot(&self, path: &str) -> Option<(usize, bool)> {
        (1..=4u8).find_map(|slot| {
            if path == gear_master_index(slot) {
                Some((usize::from(slot - 1), true))
            } else if path == gear_master_ratio(slot) {
                Some((usize::from(slot - 1), false))
            } else {
                None
            }
        })
    }

    fn status_bit(&self, bit: AxisStatusBit) -> bool {
        match bit {
            AxisStatusBit::Enabled => self.enabled,
            AxisStatusBit::CommandAborted => self.aborted,
            AxisStatusBit::Busy => self.busy,
            AxisStatusBit::Done => self.done,
            AxisStatusBit::Homed => self.homed,
            AxisStatusBit::Moving => self.is_moving(),
            AxisStatusBit::MovingForward => self.act_velocity() > 0.0,
            AxisStatusBit::MovingBackward => self.act_velocity() < 0.0,
            AxisStatusBit::InTargetPosition => {
                self.motion == Motion::Idle
                    && !self.error
                    && (self.position - self.goal).abs() <= self.target_window
            }
            AxisStatusBit::Geared => self.geared,
            AxisStatusBit::Error => self.error,
            // Normally closed inputs.
            AxisStatusBit::LimitFwd => !self.on_fwd_limit(),
            AxisStatusBit::LimitBwd => !self.on_bwd_limit(),
            AxisStatusBit::HomeSwitch => {
                (self.position - self.home_position).abs() <= self.target_window
            }
            AxisStatusBit::SoftLimitFwdEnabled => self.soft_fwd_enabled,
            AxisStatusBit::SoftLimitBwdEnabled => self.soft_bwd_enabled,
        }
    }

    fn value(&self, value: AxisValue) -> f64 {
        match value {
            AxisValue::ActPosition => self.position,
            AxisValue::ActVelocity => self.act_velocity(),
            AxisValue::Velocity => self.velocity,
            AxisValue::JogVelocity => self.jog_velocity,
            AxisValue::Acceleration => self.acceleration,
            AxisValue::Deceleration => self.deceleration,
            AxisValue::TargetPosition => self.target,
            AxisValue::Override => self.override_pct,
            AxisValue::HomePosition => self.home_position,
            AxisValue::HomeFinishDistance => self.home_finish_distance,
            AxisValue::HomingVelocityToCam | AxisValue::HomingVelocityFromCam => {
                self.config.homing_velocity
            }
            AxisValue::VelocityMax => self.config.velocity_max,
            AxisValue::AccelerationMax => self.config.acceleration,
            AxisValue::DecelerationMax => self.config.deceleration,
            AxisValue::VelocityFastManual => self.fast_manual,
            AxisValue::VelocitySlowManual => self.slow_manual,
            AxisValue::SoftLimitFwd => self.soft_limit_fwd,
            AxisValue::SoftLimitBwd => self.soft_limit_bwd,
            AxisValue::PositionLagMax => self.lag_max,
            AxisValue::TargetPositionWindow => self.target_window,
        }
    }

    fn set_value(&mut self, field: AxisValue, value: f64) {
        match field {
            AxisValue::Velocity => self.velocity = value,
            AxisValue::JogVelocity => self.jog_velocity = value,
            AxisValue::Acceleration => self.acceleration = value,
            AxisValue::Deceleration => self.deceleration = value,
            AxisValue::TargetPosition => self.target = value,
            AxisValue::Override => self.override_pct = value,
            AxisValue::HomePosition => self.home_position = value,
            AxisValue::HomeFinishDistance => self.home_finish_distance = value,
            _ => {}
        }
    }

    fn control_bit(&self, bit: AxisControlBit) -> bool {
        match bit {
            AxisControlBit::Execute => self.execute,
            AxisControlBit::Reset => self.reset,
            AxisControlBit::Halt => self.halt,
            AxisControlBit::Stop => self.stop,
            AxisControlBit::Enable => self.enabled,
        }
    }

    fn write_control(&mut self, bit: AxisControlBit, value: bool) -> Option<AxisEvent> {
        match bit {
            AxisControlBit::Execute => {
                self.execute = value;
                if value {
                    return self.start_command();
                }
            }
            AxisControlBit::Halt | AxisControlBit::Stop => {
                if bit == AxisControlBit::Halt {
                    self.halt = value;
                } else {
                    self.stop = value;
                }
                if value {
                    self.halt_motion();
                }
            }
            AxisControlBit::Reset => {
                self.reset = value;
                if value {
                    self.error = false;
                    self.error_id = 0;
                    self.aborted = false;
                }
            }
            AxisControlBit::Enable => {
                if value != self.enabled {
                    self.enabled = value;
                    if !value && self.motion != Motion::Idle {
                        self.motion = Motion::Idle;
                        self.goal = self.position;
                        self.busy = false;
                        self.aborted = true;
                    }
                }
            }
        }
        None
    }

    fn halt_motion(&mut self) {
        if self.motion != Motion::Idle {
            debug!(axis = self.index(), position = self.position, "Halted");
            self.motion = Motion::Idle;
            self.busy = false;
            self.done = true;
        }
        self.goal = self.position;
    }

    fn start_command(&mut self) -> Option<AxisEvent> {
        let Some(function) = MotionFunction::from_code(self.command) else {
            self.fault(ERROR_INVALID_COMMAND);
            return None;
        };
        if self.error {
            debug!(axis = self.index(), ?function, "Execute refused while in error");
            self.done = false;
            return None;
        }
        if self.ignore_execute {
            self.done = false;
            return None;
        }
        let needs_drive = matches!(
            function,
            MotionFunction::MoveAbsolute
                | MotionFunction::MoveRelative
                | MotionFunction::MoveVelocity
                | MotionFunction::MoveModulo
                | MotionFunction::Home
                | MotionFunction::GearInMultiMaster
        );
        if needs_drive && !self.enabled {
            self.fault(ERROR_NOT_READY);
            return None;
        }

        let motion = match function {
            MotionFunction::MoveAbsolute | MotionFunction::MoveModulo => {
                self.positioning(function, self.target)?
            }
            MotionFunction::MoveRelative => {
                self.positioning(function, self.position + self.target)?
            }
            MotionFunction::MoveVelocity => {
                if !self.velocity.is_finite() {
                    self.fault(ERROR_INVALID_VELOCITY);
                    return None;
                }
                Motion::Velocity(self.velocity)
            }
            MotionFunction::GearInMultiMaster => {
                self.geared = true;
                Motion::Instant(function)
            }
            MotionFunction::GearOut => {
                self.geared = false;
                Motion::Instant(function)
            }
            MotionFunction::Home => {
                let routine =
                    HomingRoutine::from_code(self.home_sequence).unwrap_or(HomingRoutine::NoHoming);
                let moving = routine.moves_axis();
                Motion::Homing {
                    remaining: if moving { self.config.home_duration } else { 0.0 },
                    moving,
                }
            }
            MotionFunction::WriteParameter => {
                if !self.write_parameter() {
                    self.fault(ERROR_INVALID_COMMAND);
                    return None;
                }
                Motion::Instant(function)
            }
            MotionFunction::ReadParameter => {
                let Some(value) = self.read_parameter() else {
                    self.fault(ERROR_INVALID_COMMAND);
                    return None;
                };
                self.parameter_read = value;
                Motion::Instant(function)
            }
        };

        self.done = false;
        self.busy = true;
        self.aborted = false;
        self.motion = motion;
        debug!(axis = self.index(), ?function, setpoint = self.setpoint(function), "Command started");
        Some(AxisEvent::Started(function))
    }

    fn positioning(&mut self, function: MotionFunction, goal: f64) -> Option<Motion> {
        let speed = self.velocity.abs();
        if speed <= 0.0 || !speed.is_finite() {
            self.fault(ERROR_INVALID_VELOCITY);
            return None;
        }
        self.goal = goal;
        if self
            .stall_targets
            .iter()
            .any(|t| (t - goal).abs() <= POSITION_EPSILON)
        {
            debug!(axis = self.index(), goal, "Stalling on target");
            return Some(Motion::Stalled);
        }
        Some(Motion::Positioning {
            function,
            goal,
            speed,
        })
    }

    fn write_parameter(&mut self) -> bool {
        let Some(parameter) = AxisParameter::from_code(self.parameter_select) else {
            return false;
        };
        let value = self.parameter_write;
        match parameter {
            AxisParameter::SwLimitFwd => self.soft_limit_fwd = value,
            AxisParameter::SwLimitBwd => self.soft_limit_bwd = value,
            AxisParameter::EnableLimitFwd => self.soft_fwd_enabled = value != 0.0,
            AxisParameter::EnableLimitBwd => self.soft_bwd_enabled = value != 0.0,
            AxisParameter::EnablePositionLagMonitoring => self.lag_monitoring = value != 0.0,
            AxisParameter::MaxPositionLag => self.lag_max = value,
            AxisParameter::AxisVeloManSlow => self.slow_manual = value,
            AxisParameter::AxisVeloManFast => self.fast_manual = value,
            AxisParameter::AxisEnTargetPositionMonitoring => {
                self.target_monitoring = value != 0.0
            }
            AxisParameter::AxisTargetPositionWindow => self.target_window = value,
        }
        true
    }

    fn read_parameter(&self) -> Option<f64> {
        let flag = |on: bool| if on { 1.0 } else { 0.0 };
        let value = match AxisParameter::from_code(self.parameter_select)? {
            AxisParameter::SwLimitFwd => self.soft_limit_fwd,
            AxisParameter::SwLimitBwd => self.soft_limit_bwd,
            AxisParameter::EnableLimitFwd => flag(self.soft_fwd_enabled),
            AxisParameter::EnableLimitBwd => flag(self.soft_bwd_enabled),
            AxisParameter::EnablePositionLagMonitoring => flag(self.lag_monitoring),
            AxisParameter::MaxPositionLag => self.lag_max,
            AxisParameter::AxisVeloManSlow => self.slow_manual,
            AxisParameter::AxisVeloManFast => self.fast_manual,
            AxisParameter::AxisEnTargetPositionMonitoring => flag(self.target_monitoring),
            AxisParameter::AxisTargetPositionWindow => self.target_window,
        };
        Some(value)
    }
}
