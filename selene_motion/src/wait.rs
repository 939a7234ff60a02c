//! Status wait primitives.
//!
//! [`wait_for`] is the one polling loop of the workspace. Every device
//! synchronisation (command done, homed, limit reached, cylinder extended)
//! is composed from it, so timeout normalisation and poll pacing behave the
//! same everywhere.

use selene_common::clock::Clock;
use selene_common::consts::{
    DEFAULT_BUSY_HIGH_TIMEOUT, DEFAULT_DONE_HIGH_TIMEOUT, DEFAULT_DONE_LOW_TIMEOUT,
    MIN_POLL_INTERVAL, MIN_WAIT_TIMEOUT,
};
use selene_common::plc::AxisStatusBit;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::trace;

/// Result of a single-condition wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Reached,
    TimedOut,
}

impl WaitOutcome {
    pub const fn is_reached(self) -> bool {
        matches!(self, Self::Reached)
    }
}

/// Timeout actually applied for a requested one. Zero means "at least one
/// second", never "return immediately".
pub fn effective_timeout(timeout: Duration) -> Duration {
    if timeout.is_zero() {
        MIN_WAIT_TIMEOUT
    } else {
        timeout
    }
}

/// Poll `read` until it returns `expected` or `timeout` expires.
///
/// The first read happens immediately and one last read happens at the
/// deadline. Sleeps never overshoot the deadline. A read error ends the wait
/// and is returned as is.
pub fn wait_for<T, E, F>(
    clock: &dyn Clock,
    mut read: F,
    expected: T,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<WaitOutcome, E>
where
    T: PartialEq + fmt::Debug,
    F: FnMut() -> Result<T, E>,
{
    let timeout = effective_timeout(timeout);
    let poll = poll_interval.max(MIN_POLL_INTERVAL);
    let deadline = clock.now() + timeout;

    loop {
        let value = read()?;
        if value == expected {
            return Ok(WaitOutcome::Reached);
        }
        let now = clock.now();
        if now >= deadline {
            trace!(?expected, last = ?value, ?timeout, "Wait timed out");
            return Ok(WaitOutcome::TimedOut);
        }
        clock.sleep(poll.min(deadline - now));
    }
}

/// One step of a multi-phase handshake: `signal` must read `expected`
/// within `timeout`.
#[derive(Debug, Clone, Copy)]
pub struct Phase<P, S> {
    pub phase: P,
    pub signal: S,
    pub expected: bool,
    pub timeout: Duration,
}

/// Result of a multi-phase handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOutcome<P> {
    Completed,
    /// `phase` was not observed within `timeout` (already normalised).
    TimedOut { phase: P, timeout: Duration },
}

/// Walk `phases` in order. A later phase is only watched once every earlier
/// one has been observed, so a signal that happens to be in its final state
/// early never counts as success.
pub fn wait_for_phases<P, S, E, F>(
    clock: &dyn Clock,
    mut read: F,
    phases: &[Phase<P, S>],
    poll_interval: Duration,
) -> Result<PhaseOutcome<P>, E>
where
    P: Copy,
    S: Copy,
    F: FnMut(S) -> Result<bool, E>,
{
    for step in phases {
        let outcome = wait_for(
            clock,
            || read(step.signal),
            step.expected,
            step.timeout,
            poll_interval,
        )?;
        if !outcome.is_reached() {
            return Ok(PhaseOutcome::TimedOut {
                phase: step.phase,
                timeout: effective_timeout(step.timeout),
            });
        }
    }
    Ok(PhaseOutcome::Completed)
}

/// Phase of the command-done handshake of an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandPhase {
    /// `bDone` drops: the controller accepted the execute.
    DoneLow,
    /// `bBusy` rises: the function is running.
    BusyHigh,
    /// `bDone` rises again: the function finished.
    DoneHigh,
}

impl fmt::Display for CommandPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DoneLow => "bDone low",
            Self::BusyHigh => "bBusy high",
            Self::DoneHigh => "bDone high",
        })
    }
}

/// Per-phase timeouts of the command-done handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDoneTimeouts {
    pub done_low: Duration,
    pub busy_high: Duration,
    pub done_high: Duration,
}

impl Default for CommandDoneTimeouts {
    fn default() -> Self {
        Self {
            done_low: DEFAULT_DONE_LOW_TIMEOUT,
            busy_high: DEFAULT_BUSY_HIGH_TIMEOUT,
            done_high: DEFAULT_DONE_HIGH_TIMEOUT,
        }
    }
}

/// Wait for `bDone` low, then `bBusy` high, then `bDone` high.
pub fn wait_for_command_done<E, F>(
    clock: &dyn Clock,
    read: F,
    timeouts: &CommandDoneTimeouts,
    poll_interval: Duration,
) -> Result<PhaseOutcome<CommandPhase>, E>
where
    F: FnMut(AxisStatusBit) -> Result<bool, E>,
{
    let phases = [
        Phase {
            phase: CommandPhase::DoneLow,
            signal: AxisStatusBit::Done,
            expected: false,
            timeout: timeouts.done_low,
        },
        Phase {
            phase: CommandPhase::BusyHigh,
            signal: AxisStatusBit::Busy,
            expected: true,
            timeout: timeouts.busy_high,
        },
        Phase {
            phase: CommandPhase::DoneHigh,
            signal: AxisStatusBit::Done,
            expected: true,
            timeout: timeouts.done_high,
        },
    ];
    wait_for_phases(clock, read, &phases, poll_interval)
}
