//! Error types for scan coordination.
//!
//! The library splits failures into three categories, matching where they
//! are detected:
//!
//! - **[`ConfigError`]**: an invalid trajectory or trigger schedule. Always
//!   detected before any hardware motion begins, so a rejected configuration
//!   never leaves an axis partially moved.
//! - **[`DeviceError`]**: a hardware or state-machine fault raised while
//!   preparing or executing a move (an axis failed to reach position, an
//!   operation was requested in the wrong state, a capability is not
//!   supported by the bound hardware).
//! - **[`Interrupted`]**: a cooperative cancellation signal received while
//!   blocked in a wait.
//!
//! [`ScanError`] is the umbrella type for operations that can fail in more
//! than one category; `#[from]` conversions let callers use `?` across the
//! layers. Errors are always surfaced to the caller as typed results, never
//! logged and swallowed.

use std::time::Duration;
use thiserror::Error;

/// Invalid trajectory or trigger-schedule configuration.
///
/// All variants are raised before the first hardware command of a move.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The trajectory contains no points.
    #[error("trajectory has no points")]
    EmptyTrajectory,

    /// A point's length disagrees with the trajectory's axis count.
    #[error("point has {got} values but trajectory has {expected} axes")]
    PointLengthMismatch {
        /// Axis count fixed at trajectory creation.
        expected: usize,
        /// Length of the offending point.
        got: usize,
    },

    /// An axis is driven in some points but absent in others.
    #[error("axis {axis} is driven in some points but absent in others")]
    InconsistentAxis {
        /// Index of the offending axis.
        axis: usize,
    },

    /// An axis index is outside the trajectory's axis count.
    #[error("axis index {axis} out of range for {axis_count} axes")]
    AxisIndexOutOfRange {
        /// Requested axis index.
        axis: usize,
        /// Axis count fixed at trajectory creation.
        axis_count: usize,
    },

    /// A per-axis position sequence disagrees with the existing point count.
    #[error("axis {axis} was given {got} positions but the trajectory has {expected} points")]
    AxisTrajectoryLength {
        /// Existing point count.
        expected: usize,
        /// Length of the offending sequence.
        got: usize,
        /// Index of the offending axis.
        axis: usize,
    },

    /// The trajectory's axis count disagrees with the bound axis controllers.
    #[error("trajectory has {trajectory_axes} axes but the controller binds {bound_axes}")]
    AxisCountMismatch {
        /// Axis count of the configured trajectory.
        trajectory_axes: usize,
        /// Number of axis controllers bound to the move controller.
        bound_axes: usize,
    },

    /// Neither a uniform period nor explicit deltas have been set.
    #[error("no trigger timing configured (set a uniform period or explicit deltas)")]
    ScheduleUnset,

    /// Explicit deltas cover fewer points than the trajectory requires.
    #[error("schedule provides {available} intervals but {required} are needed")]
    DeltaCountMismatch {
        /// Number of intervals the trajectory requires.
        required: usize,
        /// Number of intervals the schedule provides.
        available: usize,
    },

    /// A trigger interval must be a positive, finite number of seconds.
    #[error("trigger interval must be positive and finite, got {value}")]
    NonPositiveInterval {
        /// The rejected interval value.
        value: f64,
    },

    /// A constant-velocity step of zero can never reach the end position.
    #[error("step must be non-zero and finite")]
    ZeroStep,

    /// The end position lies in the opposite direction from the step.
    #[error("end {end} is not reachable from start {start} with step {step}")]
    UnreachableEnd {
        /// Sweep start position.
        start: f64,
        /// Sweep end position.
        end: f64,
        /// Sweep step, including its sign.
        step: f64,
    },

    /// Per-point and per-axis configuration were mixed on one controller.
    #[error("cannot mix per-point and per-axis trajectory configuration")]
    MixedConfiguration,
}

/// Hardware or state-machine fault during preparation or execution.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// An operation was requested in a state that does not permit it.
    #[error("{operation} is not valid in the {state} state")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// The controller state at the time of the call.
        state: String,
    },

    /// An axis controller reported a fault.
    #[error("axis '{axis}' fault: {message}")]
    AxisFault {
        /// Name of the faulting axis.
        axis: String,
        /// Fault description from the axis controller.
        message: String,
    },

    /// Axes did not reach the move's start position within the timeout.
    #[error("axes did not reach the start position within {timeout:?}")]
    PrepareTimeout {
        /// The configured preparation timeout.
        timeout: Duration,
    },

    /// The bound hardware does not support the requested operation.
    #[error("operation not supported: {0}")]
    NotSupported(String),

    /// A driver-internal failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DeviceError {
    /// A state violation for `operation` observed in `state`.
    pub fn invalid_state(operation: &'static str, state: impl std::fmt::Display) -> Self {
        Self::InvalidState {
            operation,
            state: state.to_string(),
        }
    }

    /// A fault reported by the named axis.
    pub fn axis_fault(axis: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AxisFault {
            axis: axis.into(),
            message: message.into(),
        }
    }
}

/// Cooperative cancellation received while blocked in a wait.
#[derive(Debug, Error)]
#[error("interrupted: {reason}")]
pub struct Interrupted {
    reason: String,
}

impl Interrupted {
    /// An interruption with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Umbrella error for operations that can fail in more than one category.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Invalid trajectory or schedule.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Hardware or state-machine fault.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Cooperative cancellation.
    #[error(transparent)]
    Interrupted(#[from] Interrupted),

    /// Settings file could not be loaded or parsed.
    #[error("settings error: {0}")]
    Settings(#[from] config::ConfigError),

    /// Settings parsed but hold a logically invalid value.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_names_operation_and_state() {
        let err = DeviceError::invalid_state("start_move", "Idle");
        assert_eq!(err.to_string(), "start_move is not valid in the Idle state");
    }

    #[test]
    fn config_error_converts_into_scan_error() {
        let err: ScanError = ConfigError::EmptyTrajectory.into();
        assert!(matches!(err, ScanError::Config(ConfigError::EmptyTrajectory)));
    }

    #[test]
    fn device_error_wraps_driver_internals() {
        let inner = anyhow::anyhow!("encoder glitch");
        let err = DeviceError::from(inner);
        assert_eq!(err.to_string(), "encoder glitch");
    }
}
