//! # Selene HAL Library
//!
//! Device link drivers for the Selene rig. Drivers implement the
//! `DeviceLink` trait defined in `selene_common::link` and are looked up by
//! name through a [`DriverRegistry`].
//!
//! # Module Structure
//!
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Device link implementations
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐     ┌──────────────────┐     ┌──────────────────┐
//! │  selene_motion    │────►│   DeviceLink     │◄────│ DriverRegistry   │
//! │ (axis controllers)│     │   (trait object) │     │  "simulation"    │
//! └───────────────────┘     └────────┬─────────┘     └──────────────────┘
//!                                    │
//!                                    ▼
//!                           ┌──────────────────┐
//!                           │  SimulatedPlc    │ axes, pneumatics,
//!                           │  (shared clock)  │ hex-key fixture
//!                           └──────────────────┘
//! ```

pub mod driver_registry;
pub mod drivers;

pub use crate::driver_registry::{DriverContext, DriverFactory, DriverRegistry};
pub use crate::drivers::simulation::{InsertionScript, SimulatedPlc, SimulationConfig};
