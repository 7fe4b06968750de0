//! Hardware boundary: capability traits consumed by the move controllers,
//! plus simulated implementations for tests and the demo binary.
//!
//! The core never assumes a specific transport behind an axis (motor record,
//! EPICS, simulated); it only talks to the capability traits in [`axis`].

pub mod axis;
pub mod mock;

pub use self::axis::{AxisController, Detector, Scannable};
pub use self::mock::{FaultyAxis, MockAxis, MockDetector, StuckAxis};
