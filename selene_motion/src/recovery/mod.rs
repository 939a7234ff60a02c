//! Recovery procedures.
//!
//! Bounded sequences that try to bring the mechanism to a measurable state
//! and report a typed outcome instead of looping forever:
//!
//! - [`insertion::insert_with_retry`]: insert the hex key, nudging the
//!   coupled axis while the key is collided.
//! - [`sweep::measure_full_range`]: jog to both extremes and report the
//!   distance between them.
//! - [`limits::move_to_limit_switch`]: drive an axis onto a hardware limit.
//!
//! Axis reinitialisation lives on the controller itself
//! ([`AxisController::reinitialize`](crate::axis::AxisController::reinitialize)).

pub mod insertion;
pub mod limits;
pub mod sweep;

pub use insertion::{InsertionReport, insert_with_retry};
pub use limits::move_to_limit_switch;
pub use sweep::{SweepReport, measure_full_range};
