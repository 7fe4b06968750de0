//! Capability traits for the hardware a scan coordinates.
//!
//! These are fine-grained, single-purpose traits in the style of a
//! capability-based hardware layer: a stage axis implements
//! [`AxisController`], a camera or counter implements [`Detector`], and
//! anything the orchestration layer can bind into a scan implements
//! [`Scannable`]. The move controllers consume these traits and never
//! implement them.
//!
//! # Contract
//!
//! - Positions are in device-native units (typically mm or degrees).
//! - All methods are async and take `&self`; implementations use interior
//!   mutability (Mutex/RwLock) for state.
//! - `move_to` initiates motion and may return before the axis arrives;
//!   callers poll `is_in_position` to observe settling.

use crate::error::DeviceError;
use async_trait::async_trait;

/// A single controllable degree of freedom driven toward target positions.
#[async_trait]
pub trait AxisController: Send + Sync {
    /// Stable name used in logs and fault messages.
    fn name(&self) -> &str;

    /// Command the axis toward an absolute position.
    ///
    /// Initiates motion; does not wait for arrival.
    async fn move_to(&self, position: f64) -> Result<(), DeviceError>;

    /// True when the axis has settled at its commanded position.
    async fn is_in_position(&self) -> bool;

    /// The current position, possibly approximate while moving.
    async fn current_position(&self) -> f64;
}

/// A device that captures one exposure per trigger.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Stable name used in logs and fault messages.
    fn name(&self) -> &str;

    /// Prepare the detector to respond to triggers.
    async fn arm(&self) -> Result<(), DeviceError>;

    /// Capture one exposure. The detector must be armed first.
    async fn trigger(&self) -> Result<(), DeviceError>;
}

/// Anything the orchestration layer can bind into a scan.
///
/// Consumed at configuration time only; the state machine itself never
/// drives a scannable directly.
pub trait Scannable: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &str;
}
