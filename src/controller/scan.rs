//! Full-scan orchestration binding: a move controller plus the scannables
//! and detectors taking part in the scan.
//!
//! [`ScanController`] wraps a [`MoveController`] and relays every trigger
//! event to the bound detectors from a background relay task. Binding is
//! configuration-time only and rejected while a move is running. The relay
//! never blocks execution: a failing detector is logged and skipped, and a
//! lagging relay drops events rather than stalling the move.

use crate::controller::{ControllerState, MoveController, MoveStatus, TriggerEvent};
use crate::error::{DeviceError, Interrupted, ScanError};
use crate::hardware::axis::{Detector, Scannable};
use crate::schedule::TriggerSchedule;
use crate::trajectory::Trajectory;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Move controller extended with scannable and detector bindings.
pub struct ScanController {
    controller: MoveController,
    scannables: Vec<Arc<dyn Scannable>>,
    detectors: Vec<Arc<dyn Detector>>,
    point_being_prepared: Arc<AtomicUsize>,
    relay: Option<JoinHandle<()>>,
}

impl ScanController {
    /// Wrap a move controller with empty bindings.
    pub fn new(controller: MoveController) -> Self {
        Self {
            controller,
            scannables: Vec::new(),
            detectors: Vec::new(),
            point_being_prepared: Arc::new(AtomicUsize::new(0)),
            relay: None,
        }
    }

    /// The wrapped move controller.
    pub fn controller(&self) -> &MoveController {
        &self.controller
    }

    /// Bind the scannables taking part in the scan.
    ///
    /// Configuration-time only; rejected while a move is running.
    pub fn set_scannables_to_move(
        &mut self,
        scannables: Vec<Arc<dyn Scannable>>,
    ) -> Result<(), ScanError> {
        if self.controller.is_moving() {
            return Err(
                DeviceError::invalid_state("set_scannables_to_move", self.controller.state())
                    .into(),
            );
        }
        self.scannables = scannables;
        Ok(())
    }

    /// Bind the detectors to trigger at each point.
    ///
    /// Configuration-time only; rejected while a move is running.
    pub fn set_detectors(&mut self, detectors: Vec<Arc<dyn Detector>>) -> Result<(), ScanError> {
        if self.controller.is_moving() {
            return Err(
                DeviceError::invalid_state("set_detectors", self.controller.state()).into(),
            );
        }
        self.detectors = detectors;
        Ok(())
    }

    /// Names of the bound scannables, in binding order.
    pub fn scannable_names(&self) -> Vec<&str> {
        self.scannables.iter().map(|s| s.name()).collect()
    }

    /// Index of the next point awaiting preparation: last relayed trigger
    /// plus one. Orchestration layers use this to resume after a retry.
    pub fn point_being_prepared(&self) -> usize {
        self.point_being_prepared.load(Ordering::SeqCst)
    }

    /// Reset the preparation cursor to the first point.
    pub fn reset_point_being_prepared(&self) {
        self.point_being_prepared.store(0, Ordering::SeqCst);
    }

    /// Configure the wrapped controller. See
    /// [`MoveController::configure`].
    pub async fn configure(
        &mut self,
        trajectory: Trajectory,
        schedule: TriggerSchedule,
    ) -> Result<(), ScanError> {
        self.controller.configure(trajectory, schedule).await
    }

    /// Move axes to the start position, then arm every bound detector.
    ///
    /// An arming fault is surfaced as a [`DeviceError`]; recover with
    /// [`Self::stop_and_reset`] like any other prepare failure.
    pub async fn prepare_for_move(&mut self) -> Result<(), ScanError> {
        self.controller.prepare_for_move().await?;
        for detector in &self.detectors {
            detector.arm().await?;
            debug!(detector = detector.name(), "armed for scan");
        }
        Ok(())
    }

    /// Start the move with a fresh event relay feeding the detectors.
    pub async fn start_move(&mut self) -> Result<(), ScanError> {
        if let Some(stale) = self.relay.take() {
            stale.abort();
        }
        self.reset_point_being_prepared();

        let events = self.controller.subscribe();
        let detectors = self.detectors.clone();
        let cursor = Arc::clone(&self.point_being_prepared);
        self.relay = Some(tokio::spawn(relay_events(events, detectors, cursor)));

        self.controller.start_move().await
    }

    /// Non-blocking: true while the move's execution task is running.
    pub fn is_moving(&self) -> bool {
        self.controller.is_moving()
    }

    /// Block until the current move completes. See
    /// [`MoveController::wait_while_moving`].
    pub async fn wait_while_moving(&mut self) -> Result<(), Interrupted> {
        self.controller.wait_while_moving().await
    }

    /// Abort any move, stop the relay, and return to `Idle`.
    pub async fn stop_and_reset(&mut self) -> Result<(), Interrupted> {
        let stopped = self.controller.stop_and_reset().await;
        if let Some(relay) = self.relay.take() {
            relay.abort();
        }
        stopped
    }

    /// Total scheduled move time. See [`MoveController::total_time`].
    pub fn total_time(&self) -> Result<f64, crate::error::ConfigError> {
        self.controller.total_time()
    }

    /// Progress snapshot of the wrapped controller.
    pub fn status(&self) -> MoveStatus {
        self.controller.status()
    }

    /// State of the wrapped controller.
    pub fn state(&self) -> ControllerState {
        self.controller.state()
    }
}

impl Drop for ScanController {
    fn drop(&mut self) {
        if let Some(relay) = self.relay.take() {
            relay.abort();
        }
    }
}

/// Feed trigger events to the detectors until the event channel closes.
async fn relay_events(
    mut events: broadcast::Receiver<TriggerEvent>,
    detectors: Vec<Arc<dyn Detector>>,
    cursor: Arc<AtomicUsize>,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                cursor.store(event.index + 1, Ordering::SeqCst);
                for detector in &detectors {
                    if let Err(err) = detector.trigger().await {
                        warn!(
                            detector = detector.name(),
                            point = event.index,
                            error = %err,
                            "detector trigger failed"
                        );
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "event relay lagged, detectors missed triggers");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
