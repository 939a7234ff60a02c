//! Pneumatic axis controller.
//!
//! Extend/retract actuators (`GVL.astPneumaticAxes[n]`). Like the linear
//! axis proxy, the controller is stateless; each compound wait walks the
//! three-phase handshake end switch released, motion flag raised, end
//! position reached.

use selene_common::clock::Clock;
use selene_common::consts::timeout_from_secs;
use selene_common::link::{DeviceLink, LinkError, PlcValue};
use selene_common::plc::pneumatic::{
    ERROR_CODE, PneumaticControlBit, STATUS_TEXT, TIME_TO_EXTEND, TIME_TO_RETRACT, VALVE_ON,
    pneumatic_symbol,
};
use selene_common::plc::{PneumaticAxisError, PneumaticStatusBit};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::config::TimingConfig;
use crate::error::MotionError;
use crate::wait::{self, Phase, PhaseOutcome};

/// Phase of an extend, retract or valve handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PneumaticPhase {
    LeaveRetracted,
    Extending,
    Extended,
    LeaveExtended,
    Retracting,
    Retracted,
    /// Valve switched: the start end switch released.
    SwitchReleased,
    /// Valve switched: the opposite end switch reached.
    SwitchReached,
}

impl fmt::Display for PneumaticPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LeaveRetracted => "bRetracted low",
            Self::Extending => "bExtending high",
            Self::Extended => "bExtended high",
            Self::LeaveExtended => "bExtended low",
            Self::Retracting => "bRetracting high",
            Self::Retracted => "bRetracted high",
            Self::SwitchReleased => "end switch released",
            Self::SwitchReached => "opposite end switch reached",
        })
    }
}

/// Proxy for one pneumatic actuator.
#[derive(Clone, Copy)]
pub struct PneumaticAxisController<'a> {
    link: &'a dyn DeviceLink,
    clock: &'a dyn Clock,
    timing: &'a TimingConfig,
    index: u16,
}

impl fmt::Debug for PneumaticAxisController<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PneumaticAxisController")
            .field("link", &self.link.name())
            .field("index", &self.index)
            .finish()
    }
}

impl<'a> PneumaticAxisController<'a> {
    pub fn new(
        link: &'a dyn DeviceLink,
        clock: &'a dyn Clock,
        timing: &'a TimingConfig,
        index: u16,
    ) -> Self {
        Self {
            link,
            clock,
            timing,
            index,
        }
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    fn symbol(&self, path: &str) -> String {
        pneumatic_symbol(self.index, path)
    }

    fn write(&self, path: &str, value: PlcValue) -> Result<(), LinkError> {
        let symbol = self.symbol(path);
        debug!(pneumatic = self.index, %symbol, %value, "Write");
        self.link.write(&symbol, value)
    }

    // ─── Observation ────────────────────────────────────────────────

    pub fn read_bit(&self, bit: PneumaticStatusBit) -> Result<bool, LinkError> {
        let value = self.link.read_bool(&self.symbol(bit.path()))?;
        trace!(pneumatic = self.index, bit = bit.path(), value, "Read");
        Ok(value)
    }

    pub fn is_extended(&self) -> Result<bool, LinkError> {
        self.read_bit(PneumaticStatusBit::Extended)
    }

    pub fn is_retracted(&self) -> Result<bool, LinkError> {
        self.read_bit(PneumaticStatusBit::Retracted)
    }

    pub fn valve(&self) -> Result<bool, LinkError> {
        self.link.read_bool(&self.symbol(VALVE_ON))
    }

    pub fn status_text(&self) -> Result<String, LinkError> {
        self.link.read_text(&self.symbol(STATUS_TEXT))
    }

    /// Current error code; `None` for a code this crate does not know.
    pub fn error_code(&self) -> Result<Option<PneumaticAxisError>, LinkError> {
        let code = self.link.read_int(&self.symbol(ERROR_CODE))?;
        Ok(PneumaticAxisError::from_code(code))
    }

    /// Controller timeout for extending. Non-positive values mean one second.
    pub fn time_to_extend(&self) -> Result<Duration, LinkError> {
        let secs = self.link.read_int(&self.symbol(TIME_TO_EXTEND))?;
        Ok(timeout_from_secs(f64::from(secs)))
    }

    pub fn time_to_retract(&self) -> Result<Duration, LinkError> {
        let secs = self.link.read_int(&self.symbol(TIME_TO_RETRACT))?;
        Ok(timeout_from_secs(f64::from(secs)))
    }

    pub fn set_time_to_extend(&self, secs: i16) -> Result<(), LinkError> {
        self.write(TIME_TO_EXTEND, PlcValue::Int(secs))
    }

    pub fn set_time_to_retract(&self, secs: i16) -> Result<(), LinkError> {
        self.write(TIME_TO_RETRACT, PlcValue::Int(secs))
    }

    fn check_fault(&self) -> Result<(), MotionError> {
        if self.read_bit(PneumaticStatusBit::Error)? {
            let code = self.error_code()?;
            warn!(pneumatic = self.index, ?code, "Pneumatic axis in error");
            return Err(MotionError::PneumaticFault {
                axis: self.index,
                code,
            });
        }
        Ok(())
    }

    // ─── Commands ───────────────────────────────────────────────────

    fn set_control(&self, bit: PneumaticControlBit, value: bool) -> Result<(), LinkError> {
        self.write(bit.path(), PlcValue::Bool(value))
    }

    pub fn extend(&self) -> Result<(), LinkError> {
        info!(pneumatic = self.index, "Extend");
        self.set_control(PneumaticControlBit::Extend, true)
    }

    pub fn retract(&self) -> Result<(), LinkError> {
        info!(pneumatic = self.index, "Retract");
        self.set_control(PneumaticControlBit::Retract, true)
    }

    pub fn interlock(&self, on: bool) -> Result<(), LinkError> {
        info!(pneumatic = self.index, on, "Interlock");
        self.set_control(PneumaticControlBit::Interlock, on)
    }

    pub fn reset(&self) -> Result<(), LinkError> {
        info!(pneumatic = self.index, "Reset");
        self.set_control(PneumaticControlBit::Reset, true)
    }

    pub fn set_valve(&self, on: bool) -> Result<(), LinkError> {
        info!(pneumatic = self.index, on, "Valve");
        self.write(VALVE_ON, PlcValue::Bool(on))
    }

    // ─── Compound operations ────────────────────────────────────────

    /// Extend and wait. The final phase gets the controller's own timeout
    /// plus the move margin, so a controller-side timeout surfaces as
    /// [`MotionError::PneumaticFault`] with its code.
    pub fn extend_and_wait(&self) -> Result<(), MotionError> {
        let timeout = self.time_to_extend()? + self.timing.move_margin;
        self.extend()?;
        self.wait_for_extended(timeout)
    }

    pub fn retract_and_wait(&self) -> Result<(), MotionError> {
        let timeout = self.time_to_retract()? + self.timing.move_margin;
        self.retract()?;
        self.wait_for_retracted(timeout)
    }

    /// Open the valve and wait until the cylinder has left its end position
    /// and reached the other one.
    pub fn valve_on_and_wait(&self, timeout: Duration) -> Result<(), MotionError> {
        self.switch_valve_and_wait(true, timeout)
    }

    pub fn valve_off_and_wait(&self, timeout: Duration) -> Result<(), MotionError> {
        self.switch_valve_and_wait(false, timeout)
    }

    fn switch_valve_and_wait(&self, on: bool, timeout: Duration) -> Result<(), MotionError> {
        let from_bwd = self.read_bit(PneumaticStatusBit::EndSwitchBwd)?;
        let (start, end) = if from_bwd {
            (PneumaticStatusBit::EndSwitchBwd, PneumaticStatusBit::EndSwitchFwd)
        } else {
            (PneumaticStatusBit::EndSwitchFwd, PneumaticStatusBit::EndSwitchBwd)
        };
        self.set_valve(on)?;
        self.wait_phases(&[
            Phase {
                phase: PneumaticPhase::SwitchReleased,
                signal: start,
                expected: false,
                timeout: self.timing.pneumatic_start_timeout,
            },
            Phase {
                phase: PneumaticPhase::SwitchReached,
                signal: end,
                expected: true,
                timeout,
            },
        ])
    }

    /// Retracted low, then extending high, then extended high.
    pub fn wait_for_extended(&self, timeout: Duration) -> Result<(), MotionError> {
        let start = self.timing.pneumatic_start_timeout;
        self.wait_phases(&[
            Phase {
                phase: PneumaticPhase::LeaveRetracted,
                signal: PneumaticStatusBit::Retracted,
                expected: false,
                timeout: start,
            },
            Phase {
                phase: PneumaticPhase::Extending,
                signal: PneumaticStatusBit::Extending,
                expected: true,
                timeout: start,
            },
            Phase {
                phase: PneumaticPhase::Extended,
                signal: PneumaticStatusBit::Extended,
                expected: true,
                timeout,
            },
        ])
    }

    /// Extended low, then retracting high, then retracted high.
    pub fn wait_for_retracted(&self, timeout: Duration) -> Result<(), MotionError> {
        let start = self.timing.pneumatic_start_timeout;
        self.wait_phases(&[
            Phase {
                phase: PneumaticPhase::LeaveExtended,
                signal: PneumaticStatusBit::Extended,
                expected: false,
                timeout: start,
            },
            Phase {
                phase: PneumaticPhase::Retracting,
                signal: PneumaticStatusBit::Retracting,
                expected: true,
                timeout: start,
            },
            Phase {
                phase: PneumaticPhase::Retracted,
                signal: PneumaticStatusBit::Retracted,
                expected: true,
                timeout,
            },
        ])
    }

    fn wait_phases(
        &self,
        phases: &[Phase<PneumaticPhase, PneumaticStatusBit>],
    ) -> Result<(), MotionError> {
        let outcome = wait::wait_for_phases(
            self.clock,
            |bit| {
                self.check_fault()?;
                Ok::<_, MotionError>(self.read_bit(bit)?)
            },
            phases,
            self.timing.poll_interval,
        )?;
        match outcome {
            PhaseOutcome::Completed => Ok(()),
            PhaseOutcome::TimedOut { phase, timeout } => {
                warn!(pneumatic = self.index, %phase, ?timeout, "Pneumatic phase not observed");
                Err(MotionError::PneumaticPhaseTimeout {
                    axis: self.index,
                    phase,
                    timeout,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selene_common::clock::SimClock;
    use selene_hal::drivers::simulation::{SimPneumaticConfig, SimulatedPlc, SimulationConfig};
    use std::sync::Arc;

    fn plc(pneumatic: SimPneumaticConfig) -> (SimulatedPlc, SimClock) {
        let clock = SimClock::new();
        let config = SimulationConfig {
            pneumatic_axes: vec![pneumatic],
            ..SimulationConfig::default()
        };
        let mut plc = SimulatedPlc::new(&config, Arc::new(clock.clone()));
        plc.open().unwrap();
        (plc, clock)
    }

    fn timing() -> TimingConfig {
        TimingConfig {
            poll_interval: Duration::from_millis(100),
            ..TimingConfig::default()
        }
    }

    #[test]
    fn extend_then_retract() {
        let (plc, clock) = plc(SimPneumaticConfig::default());
        let timing = timing();
        let cylinder = PneumaticAxisController::new(&plc, &clock, &timing, 1);
        assert!(cylinder.is_retracted().unwrap());

        cylinder.extend_and_wait().unwrap();
        assert!(cylinder.is_extended().unwrap());
        assert_eq!(cylinder.status_text().unwrap(), "Extended");
        assert!(clock.now() <= Duration::from_millis(2200));

        cylinder.retract_and_wait().unwrap();
        assert!(cylinder.is_retracted().unwrap());
    }

    #[test]
    fn retract_when_already_retracted_completes() {
        let (plc, clock) = plc(SimPneumaticConfig::default());
        let timing = timing();
        let cylinder = PneumaticAxisController::new(&plc, &clock, &timing, 1);
        cylinder.retract_and_wait().unwrap();
        assert!(cylinder.is_retracted().unwrap());
    }

    #[test]
    fn interlock_is_a_fault() {
        let (plc, clock) = plc(SimPneumaticConfig::default());
        plc.set_interlocked(1, true);
        let timing = timing();
        let cylinder = PneumaticAxisController::new(&plc, &clock, &timing, 1);
        let err = cylinder.extend_and_wait().unwrap_err();
        assert_eq!(
            err,
            MotionError::PneumaticFault {
                axis: 1,
                code: Some(PneumaticAxisError::InterlockOn),
            }
        );
    }

    #[test]
    fn slow_cylinder_fails_with_controller_error() {
        let (plc, clock) = plc(SimPneumaticConfig {
            stroke_duration: 4.0,
            ..SimPneumaticConfig::default()
        });
        let timing = timing();
        let cylinder = PneumaticAxisController::new(&plc, &clock, &timing, 1);
        cylinder.set_time_to_extend(2).unwrap();
        assert_eq!(cylinder.time_to_extend().unwrap(), Duration::from_secs(2));
        let err = cylinder.extend_and_wait().unwrap_err();
        assert!(matches!(
            err,
            MotionError::PneumaticFault {
                code: Some(PneumaticAxisError::ExtendTimedOut),
                ..
            }
        ));
        cylinder.reset().unwrap();
        assert_eq!(cylinder.error_code().unwrap(), Some(PneumaticAxisError::NoError));
    }

    #[test]
    fn valve_switch_waits_for_opposite_switch() {
        let (plc, clock) = plc(SimPneumaticConfig::default());
        let timing = timing();
        let cylinder = PneumaticAxisController::new(&plc, &clock, &timing, 1);
        cylinder.valve_on_and_wait(Duration::from_secs(5)).unwrap();
        assert!(cylinder.read_bit(PneumaticStatusBit::EndSwitchFwd).unwrap());
        assert!(cylinder.valve().unwrap());
        cylinder.valve_off_and_wait(Duration::from_secs(5)).unwrap();
        assert!(cylinder.read_bit(PneumaticStatusBit::EndSwitchBwd).unwrap());
    }

    #[test]
    fn non_positive_controller_timeout_means_one_second() {
        let (plc, clock) = plc(SimPneumaticConfig {
            time_to_retract: 0,
            ..SimPneumaticConfig::default()
        });
        let timing = timing();
        let cylinder = PneumaticAxisController::new(&plc, &clock, &timing, 1);
        assert_eq!(cylinder.time_to_retract().unwrap(), Duration::from_secs(1));
    }
}
