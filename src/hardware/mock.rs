//! Simulated hardware for tests and the demo binary.
//!
//! All mocks are async-safe (tokio sleeps, never thread sleeps) so they
//! behave under tokio's paused test clock.
//!
//! - [`MockAxis`]: settles instantly by default, or after a travel delay
//!   derived from a configured speed.
//! - [`StuckAxis`]: accepts commands but never reaches position, for
//!   preparation-timeout tests.
//! - [`FaultyAxis`]: fails every command, for error-path tests.
//! - [`MockDetector`]: counts triggers and rejects triggering while unarmed.

use crate::error::DeviceError;
use crate::hardware::axis::{AxisController, Detector, Scannable};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug)]
struct AxisShared {
    position: RwLock<f64>,
    in_position: RwLock<bool>,
}

/// Simulated axis with an optional finite travel speed.
pub struct MockAxis {
    name: String,
    shared: Arc<AxisShared>,
    /// Units per second; infinite means the axis settles immediately.
    speed: f64,
}

impl MockAxis {
    /// An axis at position 0.0 that settles instantly.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_speed(name, f64::INFINITY)
    }

    /// An axis that travels at `speed` units per second.
    pub fn with_speed(name: impl Into<String>, speed: f64) -> Self {
        Self {
            name: name.into(),
            shared: Arc::new(AxisShared {
                position: RwLock::new(0.0),
                in_position: RwLock::new(true),
            }),
            speed,
        }
    }
}

#[async_trait]
impl AxisController for MockAxis {
    fn name(&self) -> &str {
        &self.name
    }

    async fn move_to(&self, position: f64) -> Result<(), DeviceError> {
        let current = *self.shared.position.read().await;
        debug!(axis = %self.name, from = current, to = position, "commanded");

        if !self.speed.is_finite() {
            *self.shared.position.write().await = position;
            *self.shared.in_position.write().await = true;
            return Ok(());
        }

        *self.shared.in_position.write().await = false;
        let travel = Duration::from_secs_f64((position - current).abs() / self.speed);
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            tokio::time::sleep(travel).await;
            *shared.position.write().await = position;
            *shared.in_position.write().await = true;
        });
        Ok(())
    }

    async fn is_in_position(&self) -> bool {
        *self.shared.in_position.read().await
    }

    async fn current_position(&self) -> f64 {
        *self.shared.position.read().await
    }
}

impl Scannable for MockAxis {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Axis that accepts commands but never reports in-position.
pub struct StuckAxis {
    name: String,
    position: RwLock<f64>,
}

impl StuckAxis {
    /// A stuck axis at position 0.0.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: RwLock::new(0.0),
        }
    }
}

#[async_trait]
impl AxisController for StuckAxis {
    fn name(&self) -> &str {
        &self.name
    }

    async fn move_to(&self, position: f64) -> Result<(), DeviceError> {
        *self.position.write().await = position;
        Ok(())
    }

    async fn is_in_position(&self) -> bool {
        false
    }

    async fn current_position(&self) -> f64 {
        *self.position.read().await
    }
}

/// Axis that faults on every command.
pub struct FaultyAxis {
    name: String,
}

impl FaultyAxis {
    /// A faulting axis with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl AxisController for FaultyAxis {
    fn name(&self) -> &str {
        &self.name
    }

    async fn move_to(&self, _position: f64) -> Result<(), DeviceError> {
        Err(DeviceError::axis_fault(&self.name, "drive rejected command"))
    }

    async fn is_in_position(&self) -> bool {
        false
    }

    async fn current_position(&self) -> f64 {
        0.0
    }
}

/// Detector that counts triggers; triggering while unarmed is a fault.
pub struct MockDetector {
    name: String,
    armed: AtomicBool,
    triggers: AtomicUsize,
}

impl MockDetector {
    /// An unarmed detector with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            armed: AtomicBool::new(false),
            triggers: AtomicUsize::new(0),
        }
    }

    /// Number of triggers received since creation.
    pub fn trigger_count(&self) -> usize {
        self.triggers.load(Ordering::SeqCst)
    }

    /// True if the detector has been armed.
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Detector for MockDetector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn arm(&self) -> Result<(), DeviceError> {
        self.armed.store(true, Ordering::SeqCst);
        debug!(detector = %self.name, "armed");
        Ok(())
    }

    async fn trigger(&self) -> Result<(), DeviceError> {
        if !self.armed.load(Ordering::SeqCst) {
            return Err(DeviceError::NotSupported(format!(
                "detector '{}' triggered while unarmed",
                self.name
            )));
        }
        let count = self.triggers.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(detector = %self.name, frame = count, "triggered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn instant_axis_settles_immediately() {
        let axis = MockAxis::new("x");
        axis.move_to(12.5).await.unwrap();
        assert!(axis.is_in_position().await);
        assert_eq!(axis.current_position().await, 12.5);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_axis_settles_after_travel_time() {
        let axis = MockAxis::with_speed("x", 10.0);
        axis.move_to(20.0).await.unwrap();
        assert!(!axis.is_in_position().await);

        // 20 units at 10 units/s settles after 2s of virtual time.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(axis.is_in_position().await);
        assert_eq!(axis.current_position().await, 20.0);
    }

    #[tokio::test]
    async fn stuck_axis_never_settles() {
        let axis = StuckAxis::new("jam");
        axis.move_to(1.0).await.unwrap();
        assert!(!axis.is_in_position().await);
    }

    #[tokio::test]
    async fn faulty_axis_reports_fault() {
        let axis = FaultyAxis::new("bad");
        let err = axis.move_to(1.0).await.unwrap_err();
        assert!(err.to_string().contains("bad"));
    }

    #[tokio::test]
    async fn detector_rejects_unarmed_trigger() {
        let detector = MockDetector::new("counter");
        assert!(detector.trigger().await.is_err());

        detector.arm().await.unwrap();
        detector.trigger().await.unwrap();
        detector.trigger().await.unwrap();
        assert_eq!(detector.trigger_count(), 2);
    }
}
