//! # Flyscan
//!
//! Coordination layer for continuous-motion ("fly") scans: move controllers
//! drive one or more axes through a pre-planned trajectory while publishing
//! trigger events synchronized to detector exposures, so data is collected
//! during travel instead of stepping and settling at every point.
//!
//! The crate is a library first; the `flyscan` binary is a small simulated
//! demo over the same public API.
//!
//! ## Crate Structure
//!
//! - **`controller`**: The [`MoveController`] state machine, the background
//!   execution task walking the trajectory, the move variants
//!   (constant-velocity, raster, explicit trajectory), and the
//!   [`ScanController`] orchestration binding.
//! - **`trajectory`** / **`schedule`**: The scan data model: per-axis point
//!   sequences and trigger timing (uniform period or explicit deltas).
//! - **`hardware`**: Capability traits the core consumes
//!   ([`AxisController`], `Detector`, `Scannable`) plus simulated
//!   implementations for tests and the demo.
//! - **`clock`**: Injectable time source so timed waits are testable under
//!   tokio's paused clock.
//! - **`config`**: TOML-backed [`Settings`] for timeouts and channel sizes.
//! - **`error`**: The typed error taxonomy (`ConfigError`, `DeviceError`,
//!   `Interrupted`, `ScanError`).
//! - **`logging`**: `tracing` subscriber setup for the demo binary and
//!   embedding applications.

pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod hardware;
pub mod logging;
pub mod schedule;
pub mod trajectory;

pub use crate::clock::{Clock, TokioClock};
pub use crate::config::Settings;
pub use crate::controller::profile::{
    ConstantVelocityMove, MoveProfile, RasterMove, TrajectoryMove,
};
pub use crate::controller::scan::ScanController;
pub use crate::controller::{ControllerState, MoveController, MoveStatus, TriggerEvent};
pub use crate::error::{ConfigError, DeviceError, Interrupted, ScanError};
pub use crate::hardware::axis::{AxisController, Detector, Scannable};
pub use crate::schedule::TriggerSchedule;
pub use crate::trajectory::{Point, Trajectory};
