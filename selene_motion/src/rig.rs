//! Run context.
//!
//! A [`Rig`] owns the open device link, the clock and the timing budget for
//! one run, and hands out axis controllers borrowing from it. Dropping the
//! rig brings every axis it was told about to a safe state and closes the
//! link.

use selene_common::clock::Clock;
use selene_common::link::{DeviceLink, LinkError};
use selene_common::plc::{AXIS_COUNT_SYMBOL, AxisIndex};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::axis::AxisController;
use crate::config::TimingConfig;
use crate::pneumatic::PneumaticAxisController;

pub struct Rig {
    link: Box<dyn DeviceLink>,
    clock: Arc<dyn Clock>,
    timing: TimingConfig,
    linear_axes: Vec<AxisIndex>,
    pneumatic_axes: Vec<u16>,
}

impl Rig {
    /// Take ownership of `link` and open it if needed.
    pub fn open(
        mut link: Box<dyn DeviceLink>,
        clock: Arc<dyn Clock>,
        timing: TimingConfig,
    ) -> Result<Self, LinkError> {
        if !link.is_open() {
            link.open()?;
        }
        info!(driver = link.name(), "Device link open");
        Ok(Self {
            link,
            clock,
            timing,
            linear_axes: Vec::new(),
            pneumatic_axes: Vec::new(),
        })
    }

    /// Register axes that must be halted (linear) or vented (pneumatic)
    /// when the rig is dropped.
    pub fn guard_axes(
        &mut self,
        linear: impl IntoIterator<Item = AxisIndex>,
        pneumatic: impl IntoIterator<Item = u16>,
    ) {
        for axis in linear {
            if !self.linear_axes.contains(&axis) {
                self.linear_axes.push(axis);
            }
        }
        for axis in pneumatic {
            if !self.pneumatic_axes.contains(&axis) {
                self.pneumatic_axes.push(axis);
            }
        }
    }

    pub fn axis(&self, index: AxisIndex) -> AxisController<'_> {
        AxisController::new(self.link.as_ref(), self.clock.as_ref(), &self.timing, index)
    }

    pub fn pneumatic(&self, index: u16) -> PneumaticAxisController<'_> {
        PneumaticAxisController::new(self.link.as_ref(), self.clock.as_ref(), &self.timing, index)
    }

    pub fn link(&self) -> &dyn DeviceLink {
        self.link.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Number of axes the controller program declares.
    pub fn axis_count(&self) -> Result<i16, LinkError> {
        self.link.read_int(AXIS_COUNT_SYMBOL)
    }

    /// Read a free-standing `BOOL`.
    pub fn read_flag(&self, symbol: &str) -> Result<bool, LinkError> {
        self.link.read_bool(symbol)
    }

    /// Best-effort halt of every guarded linear axis. Returns the number of
    /// axes that could not be halted.
    pub fn halt_all(&self) -> usize {
        let mut failures = 0;
        for &index in &self.linear_axes {
            if let Err(e) = self.axis(index).halt() {
                warn!(axis = index, error = %e, "Halt failed");
                failures += 1;
            }
        }
        failures
    }

    fn vent_all(&self) -> usize {
        let mut failures = 0;
        for &index in &self.pneumatic_axes {
            if let Err(e) = self.pneumatic(index).set_valve(false) {
                warn!(pneumatic = index, error = %e, "Valve off failed");
                failures += 1;
            }
        }
        failures
    }
}

impl Drop for Rig {
    fn drop(&mut self) {
        if !self.link.is_open() {
            return;
        }
        let failures = self.halt_all() + self.vent_all();
        debug!(failures, "Axes released");
        match self.link.close() {
            Ok(()) => info!(driver = self.link.name(), "Device link closed"),
            Err(e) => warn!(error = %e, "Failed to close device link"),
        }
    }
}
