//! Selene Common Library
//!
//! Shared types for every crate of the Selene rig workspace: the device link
//! capability, the PLC value model and symbol layout, motion enumerations,
//! the clock abstraction and TOML configuration loading.
//!
//! # Module Structure
//!
//! - [`link`] - `DeviceLink` trait, typed PLC values and link errors
//! - [`plc`] - PLC symbol layout for linear and pneumatic axes, motion codes
//! - [`clock`] - Time source used by every blocking wait
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Shared defaults (poll interval, timeouts, retry budget)
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use selene_common::prelude::*;
//! ```

pub mod clock;
pub mod config;
pub mod consts;
pub mod link;
pub mod plc;
pub mod prelude;
