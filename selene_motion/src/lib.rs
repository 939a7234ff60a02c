//! # Selene Motion
//!
//! Axis control and the hex-key acceptance sequence of the Selene rig,
//! written against the `DeviceLink` capability so the same code drives the
//! real PLC or the simulation.
//!
//! # Module Structure
//!
//! - [`wait`] - Polled waits, multi-phase waits and command-done detection
//! - [`travel`] - Trapezoidal travel-time estimates
//! - [`axis`] - Linear axis controller and jog guard
//! - [`pneumatic`] - Pneumatic axis controller
//! - [`rig`] - Run context owning the link; safe state on drop
//! - [`recovery`] - Insertion with retry, full-range sweep, limit-switch moves
//! - [`sequencer`] - Worklist sequencer, section selection, results
//! - [`config`] - Rig configuration (TOML)
//! - [`error`] - Error types and severity classes
//!
//! # Layering
//!
//! ```text
//! sequencer ──► recovery ──► axis / pneumatic ──► wait ──► DeviceLink + Clock
//!                                   │
//!                                   └──► travel
//! ```

pub mod axis;
pub mod config;
pub mod error;
pub mod pneumatic;
pub mod recovery;
pub mod rig;
pub mod sequencer;
pub mod travel;
pub mod wait;

pub use axis::{AxisController, AxisStatus, Direction, JogGuard, MoveTarget};
pub use config::{RigConfig, SequenceConfig, TimingConfig};
pub use error::{FailureKind, InsertionError, MotionError, Severity, SweepError, TravelTimeError};
pub use pneumatic::PneumaticAxisController;
pub use rig::Rig;
pub use sequencer::{ResultsTable, RunSummary, Sequencer, SequencerError, SequencerState};
