//! # Selene Hex-Key Test
//!
//! Runner for the hex-key acceptance test: reads a worklist of X/Z
//! positions, drives the sequencer over it and keeps a results CSV current
//! after every entry.
//!
//! # Module Structure
//!
//! - [`config`] - Rig file with an optional `[simulation]` table
//! - [`session`] - Clock and device link selection, rig opening
//! - [`worklist`] - Worklist parsing and the results CSV sink
//! - [`gate`] - Operator confirmation on stdin

pub mod config;
pub mod gate;
pub mod session;
pub mod worklist;

pub use config::HexTestConfig;
pub use gate::StdinGate;
pub use session::open_rig;
pub use worklist::{CsvResultsSink, WorklistError, read_worklist, write_results};
