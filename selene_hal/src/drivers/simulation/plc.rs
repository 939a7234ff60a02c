//! Simulated PLC exposing the rig's symbol layout over [`DeviceLink`].

use parking_lot::Mutex;
use selene_common::clock::Clock;
use selene_common::link::{DeviceLink, LinkError, PlcType, PlcValue};
use selene_common::plc::{AXIS_COUNT_SYMBOL, AxisIndex, MotionFunction};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use super::axis::{AxisEvent, SimAxis};
use super::config::{InsertionScript, SimulationConfig};
use super::fixture::HexKeyFixture;
use super::pneumatic::SimPneumatic;

const AXIS_PREFIX: &str = "GVL.astAxes[";
const PNEUMATIC_PREFIX: &str = "GVL.astPneumaticAxes[";

/// One executed motion function, as seen by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CommandRecord {
    /// Clock time of the execute.
    pub at: Duration,
    pub axis: AxisIndex,
    pub function: MotionFunction,
    /// Target, distance, velocity or parameter value, depending on `function`.
    pub setpoint: f64,
}

enum Target<'a> {
    Axis(u16, &'a str),
    Pneumatic(u16, &'a str),
    Global,
}

fn split_indexed(rest: &str) -> Option<(u16, &str)> {
    let (index, path) = rest.split_once("].")?;
    Some((index.parse().ok()?, path))
}

fn parse_symbol(symbol: &str) -> Target<'_> {
    if let Some((index, path)) = symbol.strip_prefix(AXIS_PREFIX).and_then(split_indexed) {
        Target::Axis(index, path)
    } else if let Some((index, path)) =
        symbol.strip_prefix(PNEUMATIC_PREFIX).and_then(split_indexed)
    {
        Target::Pneumatic(index, path)
    } else {
        Target::Global
    }
}

struct PlcState {
    open: bool,
    last_update: Duration,
    axes: BTreeMap<AxisIndex, SimAxis>,
    pneumatics: BTreeMap<u16, SimPneumatic>,
    fixture: Option<HexKeyFixture>,
    variables: HashMap<String, PlcValue>,
    commands: Vec<CommandRecord>,
}

impl PlcState {
    /// Bring every model up to `now`.
    fn update(&mut self, now: Duration) {
        let dt = now.saturating_sub(self.last_update).as_secs_f64();
        self.last_update = now;
        if dt <= 0.0 {
            return;
        }
        for axis in self.axes.values_mut() {
            if let Some(event) = axis.advance(dt)
                && let Some(fixture) = self.fixture.as_mut()
            {
                fixture.on_axis_event(axis.index(), event, axis.position());
            }
        }
        for pneumatic in self.pneumatics.values_mut() {
            pneumatic.advance(dt);
        }
    }

    fn read(&self, symbol: &str) -> Result<PlcValue, LinkError> {
        let value = match parse_symbol(symbol) {
            Target::Axis(index, path) => self.axes.get(&index).and_then(|a| a.read(path)),
            Target::Pneumatic(index, path) => {
                self.pneumatics.get(&index).and_then(|p| p.read(path))
            }
            Target::Global => self
                .fixture
                .as_ref()
                .and_then(|f| f.flag(symbol))
                .map(PlcValue::Bool)
                .or_else(|| self.variables.get(symbol).cloned()),
        };
        value.ok_or_else(|| LinkError::UnknownSymbol(symbol.to_string()))
    }

    fn write(&mut self, symbol: &str, value: PlcValue, now: Duration) -> Result<(), LinkError> {
        let current = self.read(symbol)?;
        if current.plc_type() != value.plc_type() {
            return Err(LinkError::TypeMismatch {
                symbol: symbol.to_string(),
                expected: current.plc_type(),
                found: value.plc_type(),
            });
        }

        match parse_symbol(symbol) {
            Target::Axis(index, path) => {
                let unknown = || LinkError::UnknownSymbol(symbol.to_string());
                let axis = self.axes.get_mut(&index).ok_or_else(unknown)?;
                let Some(event) = axis.write(symbol, path, value)? else {
                    return Ok(());
                };
                let position = axis.position();
                if let AxisEvent::Started(function) = event {
                    self.commands.push(CommandRecord {
                        at: now,
                        axis: index,
                        function,
                        setpoint: axis.setpoint(function),
                    });
                }
                if let Some(fixture) = self.fixture.as_mut() {
                    fixture.on_axis_event(index, event, position);
                }
            }
            Target::Pneumatic(index, path) => {
                let unknown = || LinkError::UnknownSymbol(symbol.to_string());
                let pneumatic = self.pneumatics.get_mut(&index).ok_or_else(unknown)?;
                pneumatic.write(symbol, path, value)?;
            }
            Target::Global => {
                let flag = value.to_bool(symbol).ok();
                let handled = match (self.fixture.as_mut(), flag) {
                    (Some(fixture), Some(flag)) => fixture.set_flag(symbol, flag),
                    _ => false,
                };
                if !handled {
                    self.variables.insert(symbol.to_string(), value);
                }
            }
        }
        Ok(())
    }
}

/// A PLC simulated in process.
///
/// The simulator owns no thread: every read or write first advances the
/// axis, pneumatic and fixture models to the current time of the shared
/// [`Clock`]. Paired with a `SimClock`, a whole test run executes
/// deterministically in virtual time.
///
/// Clones share the same controller state, so a test can keep a handle for
/// inspection and fault injection after giving the link away.
#[derive(Clone)]
pub struct SimulatedPlc {
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<PlcState>>,
}

impl SimulatedPlc {
    /// Build a controller from a simulation setup.
    pub fn new(config: &SimulationConfig, clock: Arc<dyn Clock>) -> Self {
        let axes: BTreeMap<_, _> = config
            .axes
            .iter()
            .map(|a| (a.index, SimAxis::new(a.clone())))
            .collect();
        let pneumatics = config
            .pneumatic_axes
            .iter()
            .map(|p| (p.index, SimPneumatic::new(p.clone())))
            .collect();
        let axis_count = axes.keys().next_back().copied().unwrap_or(0);
        let mut variables = HashMap::new();
        variables.insert(
            AXIS_COUNT_SYMBOL.to_string(),
            PlcValue::Int(i16::try_from(axis_count).unwrap_or(i16::MAX)),
        );

        let state = PlcState {
            open: false,
            last_update: clock.now(),
            axes,
            pneumatics,
            fixture: config.hex_key.clone().map(HexKeyFixture::new),
            variables,
            commands: Vec::new(),
        };
        Self {
            clock,
            state: Arc::new(Mutex::new(state)),
        }
    }

    // ─── Inspection ─────────────────────────────────────────────────

    /// Every motion function executed so far.
    pub fn commands(&self) -> Vec<CommandRecord> {
        self.state.lock().commands.clone()
    }

    /// Number of executed `function`s on `axis`.
    pub fn command_count(&self, axis: AxisIndex, function: MotionFunction) -> usize {
        self.state
            .lock()
            .commands
            .iter()
            .filter(|c| c.axis == axis && c.function == function)
            .count()
    }

    /// Current position of `axis`, brought up to the clock's time.
    pub fn axis_position(&self, axis: AxisIndex) -> Option<f64> {
        let mut state = self.state.lock();
        state.update(self.clock.now());
        state.axes.get(&axis).map(SimAxis::position)
    }

    /// Number of insertion attempts the hex-key fixture has judged.
    pub fn insertion_attempts(&self) -> u32 {
        self.state
            .lock()
            .fixture
            .as_ref()
            .map_or(0, HexKeyFixture::attempts)
    }

    /// Value of a free-standing variable.
    pub fn variable(&self, symbol: &str) -> Option<PlcValue> {
        self.state.lock().read(symbol).ok()
    }

    // ─── Fault injection ────────────────────────────────────────────

    /// Define or overwrite a free-standing variable.
    pub fn set_variable(&self, symbol: &str, value: PlcValue) {
        self.state
            .lock()
            .variables
            .insert(symbol.to_string(), value);
    }

    /// Append outcomes for the next insertion attempts.
    pub fn queue_insertions(&self, scripts: impl IntoIterator<Item = InsertionScript>) {
        match self.state.lock().fixture.as_mut() {
            Some(fixture) => fixture.queue(scripts),
            None => warn!("No hex-key fixture configured, insertion scripts dropped"),
        }
    }

    /// Positioning moves of `axis` onto `target` are accepted but never arrive.
    pub fn stall_on_target(&self, axis: AxisIndex, target: f64) {
        self.with_axis(axis, |a| a.stall_on_target(target));
    }

    /// `axis` clears `bDone` on execute but never raises `bBusy`.
    pub fn ignore_execute(&self, axis: AxisIndex, ignore: bool) {
        self.with_axis(axis, |a| a.set_ignore_execute(ignore));
    }

    /// Raise an NC error on `axis`, as another client or the drive would.
    pub fn inject_axis_error(&self, axis: AxisIndex, error_id: u32) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.update(now);
        match state.axes.get_mut(&axis) {
            Some(a) => a.inject_error(error_id),
            None => warn!(axis, "Unknown simulated axis"),
        }
    }

    /// Toggle the interlock of a pneumatic axis.
    pub fn set_interlocked(&self, axis: u16, interlocked: bool) {
        match self.state.lock().pneumatics.get_mut(&axis) {
            Some(p) => p.set_interlocked(interlocked),
            None => warn!(axis, "Unknown simulated pneumatic axis"),
        }
    }

    fn with_axis(&self, axis: AxisIndex, f: impl FnOnce(&mut SimAxis)) {
        match self.state.lock().axes.get_mut(&axis) {
            Some(a) => f(a),
            None => warn!(axis, "Unknown simulated axis"),
        }
    }
}

impl DeviceLink for SimulatedPlc {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn open(&mut self) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        state.open = true;
        info!(
            axes = state.axes.len(),
            pneumatic_axes = state.pneumatics.len(),
            fixture = state.fixture.is_some(),
            "Simulated PLC online"
        );
        Ok(())
    }

    fn close(&mut self) -> Result<(), LinkError> {
        self.state.lock().open = false;
        debug!("Simulated PLC closed");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    fn read(&self, symbol: &str, ty: PlcType) -> Result<PlcValue, LinkError> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        if !state.open {
            return Err(LinkError::NotOpen);
        }
        state.update(now);
        let value = state.read(symbol)?;
        if value.plc_type() != ty {
            return Err(LinkError::TypeMismatch {
                symbol: symbol.to_string(),
                expected: ty,
                found: value.plc_type(),
            });
        }
        trace!(symbol, %value, "read");
        Ok(value)
    }

    fn write(&self, symbol: &str, value: PlcValue) -> Result<(), LinkError> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        if !state.open {
            return Err(LinkError::NotOpen);
        }
        state.update(now);
        debug!(symbol, %value, "write");
        state.write(symbol, value, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation::config::{HexKeyFixtureConfig, SimAxisConfig};
    use selene_common::clock::SimClock;
    use selene_common::plc::AxisStatusBit;
    use selene_common::plc::axis::{AxisControlBit, COMMAND, axis_symbol};
    use selene_common::plc::AxisValue;

    fn plc() -> (SimulatedPlc, SimClock) {
        let clock = SimClock::new();
        let config = SimulationConfig {
            axes: vec![
                SimAxisConfig {
                    home_position: 50.0,
                    homed: true,
                    position: 50.0,
                    ..SimAxisConfig::new(8)
                },
                SimAxisConfig::new(10),
            ],
            pneumatic_axes: Vec::new(),
            hex_key: Some(HexKeyFixtureConfig {
                insertion_axis: 8,
                nudge_axis: 10,
                inserted_position: 0.0,
                inserted_flag: "Hex.bInserted".into(),
                collided_flag: "Hex.bCollided".into(),
                missed_flag: "Hex.bMissed".into(),
                scripts: vec![InsertionScript::CollideThenInsert { nudges: 1 }],
            }),
        };
        let mut plc = SimulatedPlc::new(&config, Arc::new(clock.clone()));
        plc.open().unwrap();
        (plc, clock)
    }

    fn execute(plc: &SimulatedPlc, axis: u16, function: MotionFunction, setpoint: f64) {
        plc.write(&axis_symbol(axis, AxisValue::TargetPosition.path()), PlcValue::LReal(setpoint))
            .unwrap();
        plc.write(&axis_symbol(axis, COMMAND), PlcValue::Int(function.code()))
            .unwrap();
        plc.write(
            &axis_symbol(axis, AxisControlBit::Execute.path()),
            PlcValue::Bool(true),
        )
        .unwrap();
    }

    #[test]
    fn closed_link_refuses_access() {
        let (mut plc, _) = plc();
        plc.close().unwrap();
        assert_eq!(
            plc.read("Hex.bInserted", PlcType::Bool),
            Err(LinkError::NotOpen)
        );
    }

    #[test]
    fn unknown_symbols_and_types_are_reported() {
        let (plc, _) = plc();
        assert!(matches!(
            plc.read("GVL.astAxes[99].stStatus.bBusy", PlcType::Bool),
            Err(LinkError::UnknownSymbol(_))
        ));
        assert!(matches!(
            plc.read(&axis_symbol(8, AxisStatusBit::Busy.path()), PlcType::Int),
            Err(LinkError::TypeMismatch { .. })
        ));
        assert_eq!(
            plc.read(AXIS_COUNT_SYMBOL, PlcType::Int),
            Ok(PlcValue::Int(10))
        );
    }

    #[test]
    fn motion_follows_the_clock() {
        let (plc, clock) = plc();
        execute(&plc, 10, MotionFunction::MoveAbsolute, 20.0);
        assert_eq!(plc.axis_position(10), Some(0.0));
        clock.advance(Duration::from_secs(1));
        assert_eq!(plc.axis_position(10), Some(10.0));
        clock.advance(Duration::from_secs(5));
        assert_eq!(plc.axis_position(10), Some(20.0));
        assert_eq!(plc.command_count(10, MotionFunction::MoveAbsolute), 1);
    }

    #[test]
    fn fixture_reacts_to_insertion_and_nudge() {
        let (plc, clock) = plc();
        execute(&plc, 8, MotionFunction::MoveAbsolute, 0.0);
        clock.advance(Duration::from_secs(10));
        assert_eq!(
            plc.read("Hex.bCollided", PlcType::Bool),
            Ok(PlcValue::Bool(true))
        );

        execute(&plc, 10, MotionFunction::MoveRelative, 30.0);
        clock.advance(Duration::from_secs(10));
        assert_eq!(
            plc.read("Hex.bInserted", PlcType::Bool),
            Ok(PlcValue::Bool(true))
        );
        assert_eq!(plc.insertion_attempts(), 1);
    }

    #[test]
    fn global_variables_roundtrip() {
        let (plc, _) = plc();
        plc.set_variable("MAIN.fLevel", PlcValue::LReal(1.5));
        plc.write("MAIN.fLevel", PlcValue::LReal(2.5)).unwrap();
        assert_eq!(plc.variable("MAIN.fLevel"), Some(PlcValue::LReal(2.5)));
        assert!(matches!(
            plc.write("MAIN.fLevel", PlcValue::Bool(true)),
            Err(LinkError::TypeMismatch { .. })
        ));
    }
}
