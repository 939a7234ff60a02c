//! Simulated pneumatic actuator.

use selene_common::link::{LinkError, PlcValue};
use selene_common::plc::PneumaticAxisError;
use selene_common::plc::pneumatic::{
    ERROR_CODE, PneumaticControlBit, PneumaticStatusBit, STATUS_TEXT, TIME_TO_EXTEND,
    TIME_TO_RETRACT, VALVE_ON,
};
use tracing::{debug, trace};

use super::config::SimPneumaticConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stroke {
    Extending,
    Retracting,
}

pub(crate) struct SimPneumatic {
    config: SimPneumaticConfig,
    extended: bool,
    retracted: bool,
    stroke: Option<(Stroke, f64)>,
    valve_on: bool,
    interlocked: bool,
    error: PneumaticAxisError,
    time_to_extend: i16,
    time_to_retract: i16,
    controls: [bool; 4],
}

impl SimPneumatic {
    pub(crate) fn new(config: SimPneumaticConfig) -> Self {
        Self {
            extended: config.extended,
            retracted: !config.extended,
            stroke: None,
            valve_on: config.extended,
            interlocked: config.interlocked,
            error: PneumaticAxisError::NoError,
            time_to_extend: config.time_to_extend,
            time_to_retract: config.time_to_retract,
            controls: [false; 4],
            config,
        }
    }

    pub(crate) fn index(&self) -> u16 {
        self.config.index
    }

    pub(crate) fn set_interlocked(&mut self, interlocked: bool) {
        self.interlocked = interlocked;
        if interlocked && self.stroke.is_some() {
            self.fault(PneumaticAxisError::InterlockOn);
        }
    }

    pub(crate) fn advance(&mut self, dt: f64) {
        let Some((stroke, elapsed)) = self.stroke else {
            return;
        };
        if dt <= 0.0 {
            return;
        }
        let elapsed = elapsed + dt;
        let (limit, timeout_error) = match stroke {
            Stroke::Extending => (self.time_to_extend, PneumaticAxisError::ExtendTimedOut),
            Stroke::Retracting => (self.time_to_retract, PneumaticAxisError::RetractTimedOut),
        };
        if elapsed >= self.config.stroke_duration {
            self.stroke = None;
            match stroke {
                Stroke::Extending => self.extended = true,
                Stroke::Retracting => self.retracted = true,
            }
            debug!(axis = self.index(), ?stroke, "Stroke finished");
        } else if elapsed >= f64::from(limit) {
            self.fault(timeout_error);
        } else {
            self.stroke = Some((stroke, elapsed));
        }
    }

    fn fault(&mut self, error: PneumaticAxisError) {
        self.stroke = None;
        self.error = error;
        debug!(axis = self.index(), ?error, "Pneumatic axis error");
    }

    fn start(&mut self, stroke: Stroke) {
        if self.interlocked {
            self.fault(PneumaticAxisError::InterlockOn);
            return;
        }
        if self.error != PneumaticAxisError::NoError {
            trace!(axis = self.index(), "Stroke refused while in error");
            return;
        }
        // A cylinder already at the end position reports it on the next cycle.
        let elapsed = match stroke {
            Stroke::Extending if self.extended => self.config.stroke_duration,
            Stroke::Retracting if self.retracted => self.config.stroke_duration,
            _ => 0.0,
        };
        self.extended = false;
        self.retracted = false;
        self.valve_on = stroke == Stroke::Extending;
        self.stroke = Some((stroke, elapsed));
        debug!(axis = self.index(), ?stroke, "Stroke started");
    }

    fn status_text(&self) -> String {
        if self.error != PneumaticAxisError::NoError {
            return format!("Error: {:?}", self.error);
        }
        let text = match self.stroke {
            Some((Stroke::Extending, _)) => "Extending",
            Some((Stroke::Retracting, _)) => "Retracting",
            None if self.interlocked => "Interlocked",
            None if self.extended => "Extended",
            None if self.retracted => "Retracted",
            None => "Idle",
        };
        text.to_string()
    }

    fn status_bit(&self, bit: PneumaticStatusBit) -> bool {
        match bit {
            PneumaticStatusBit::Extending => matches!(self.stroke, Some((Stroke::Extending, _))),
            PneumaticStatusBit::Retracting => {
                matches!(self.stroke, Some((Stroke::Retracting, _)))
            }
            PneumaticStatusBit::Extended | PneumaticStatusBit::EndSwitchFwd => self.extended,
            PneumaticStatusBit::Retracted | PneumaticStatusBit::EndSwitchBwd => self.retracted,
            PneumaticStatusBit::SolenoidActive => self.valve_on,
            PneumaticStatusBit::Interlocked => self.interlocked,
            PneumaticStatusBit::PssPermitOk => true,
            PneumaticStatusBit::Error => self.error != PneumaticAxisError::NoError,
        }
    }

    pub(crate) fn read(&self, path: &str) -> Option<PlcValue> {
        if let Some(bit) = PneumaticStatusBit::ALL.iter().find(|b| b.path() == path) {
            return Some(PlcValue::Bool(self.status_bit(*bit)));
        }
        if let Some(pos) = PneumaticControlBit::ALL.iter().position(|b| b.path() == path) {
            return Some(PlcValue::Bool(self.controls[pos]));
        }
        match path {
            VALVE_ON => Some(PlcValue::Bool(self.valve_on)),
            TIME_TO_EXTEND => Some(PlcValue::Int(self.time_to_extend)),
            TIME_TO_RETRACT => Some(PlcValue::Int(self.time_to_retract)),
            STATUS_TEXT => Some(PlcValue::String(self.status_text())),
            ERROR_CODE => Some(PlcValue::Int(self.error as i16)),
            _ => None,
        }
    }

    pub(crate) fn write(
        &mut self,
        symbol: &str,
        path: &str,
        value: PlcValue,
    ) -> Result<(), LinkError> {
        if let Some(pos) = PneumaticControlBit::ALL.iter().position(|b| b.path() == path) {
            let on = value.to_bool(symbol)?;
            self.controls[pos] = on;
            match PneumaticControlBit::ALL[pos] {
                PneumaticControlBit::Extend if on => self.start(Stroke::Extending),
                PneumaticControlBit::Retract if on => self.start(Stroke::Retracting),
                PneumaticControlBit::Interlock => self.set_interlocked(on),
                PneumaticControlBit::Reset if on => self.error = PneumaticAxisError::NoError,
                _ => {}
            }
            return Ok(());
        }
        match path {
            VALVE_ON => {
                let on = value.to_bool(symbol)?;
                if on != self.valve_on || self.stroke.is_none() {
                    self.start(if on { Stroke::Extending } else { Stroke::Retracting });
                }
            }
            TIME_TO_EXTEND => self.time_to_extend = value.to_int(symbol)?,
            TIME_TO_RETRACT => self.time_to_retract = value.to_int(symbol)?,
            _ => trace!(symbol, "Write to status value ignored"),
        }
        Ok(())
    }
}
