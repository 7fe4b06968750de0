//! Background execution of a configured move.
//!
//! An [`ExecutionTask`] walks the trajectory in point order. For each point
//! it commands the driven axes toward the point's coordinates, waits out the
//! schedule interval for that index, then publishes a trigger event. The
//! publish is non-blocking: lagging observers drop events, the task never
//! stalls on them.
//!
//! Cancellation is cooperative. The flag is checked at every point boundary
//! and raced against the interval sleep, so the worst-case latency from
//! request to exit is one point interval, and the in-flight point is not
//! published after a cancel.

use crate::clock::Clock;
use crate::controller::TriggerEvent;
use crate::error::{ConfigError, ScanError};
use crate::hardware::axis::AxisController;
use crate::schedule::TriggerSchedule;
use crate::trajectory::Trajectory;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

/// How a task run ended. The state machine treats `Completed` and
/// `Cancelled` alike; observers can tell them apart by the events they did
/// or did not receive.
#[derive(Debug)]
pub(crate) enum TaskOutcome {
    /// Every point was visited and published.
    Completed,
    /// The cancellation flag was observed before the last point.
    Cancelled,
    /// A configuration or hardware fault stopped the run.
    Failed(ScanError),
}

pub(crate) struct ExecutionTask {
    trajectory: Trajectory,
    schedule: TriggerSchedule,
    axes: Vec<Arc<dyn AxisController>>,
    events: broadcast::Sender<TriggerEvent>,
    clock: Arc<dyn Clock>,
    cancel: watch::Receiver<bool>,
    progress: Arc<AtomicUsize>,
}

impl ExecutionTask {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        trajectory: Trajectory,
        schedule: TriggerSchedule,
        axes: Vec<Arc<dyn AxisController>>,
        events: broadcast::Sender<TriggerEvent>,
        clock: Arc<dyn Clock>,
        cancel: watch::Receiver<bool>,
        progress: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            trajectory,
            schedule,
            axes,
            events,
            clock,
            cancel,
            progress,
        }
    }

    /// Walk the trajectory to completion, cancellation, or failure.
    pub(crate) async fn run(mut self) -> TaskOutcome {
        let total = self.trajectory.len();
        // An axis is only recommanded when its target changes, so a stepped
        // outer axis sits still for the whole of an inner sweep.
        let mut commanded: Vec<Option<f64>> = vec![None; self.axes.len()];
        for index in 0..total {
            if *self.cancel.borrow() {
                debug!(point = index, "cancellation observed at point boundary");
                return TaskOutcome::Cancelled;
            }

            // Fail fast on a schedule that does not cover this point; a
            // silently defaulted interval would desynchronize the detectors.
            let interval = match self.schedule.interval_at(index) {
                Ok(seconds) => seconds,
                Err(err) => {
                    warn!(point = index, error = %err, "schedule does not cover trajectory");
                    return TaskOutcome::Failed(err.into());
                }
            };

            let point: Vec<Option<f64>> = match self.trajectory.point(index) {
                Some(point) => point.to_vec(),
                None => return TaskOutcome::Failed(ConfigError::EmptyTrajectory.into()),
            };

            for (axis_index, target) in point.iter().enumerate() {
                let Some(target) = *target else { continue };
                let Some(axis) = self.axes.get(axis_index) else {
                    return TaskOutcome::Failed(
                        ConfigError::AxisCountMismatch {
                            trajectory_axes: point.len(),
                            bound_axes: self.axes.len(),
                        }
                        .into(),
                    );
                };
                if commanded[axis_index] == Some(target) {
                    continue;
                }
                if let Err(err) = axis.move_to(target).await {
                    warn!(axis = axis.name(), point = index, error = %err, "axis command failed");
                    return TaskOutcome::Failed(err.into());
                }
                commanded[axis_index] = Some(target);
            }

            if self.wait_interval(interval).await.is_err() {
                debug!(point = index, "cancellation observed during interval");
                return TaskOutcome::Cancelled;
            }

            let event = TriggerEvent {
                index,
                positions: point,
                timestamp: Utc::now(),
            };
            // No receivers is fine; observers are optional.
            let _ = self.events.send(event);
            self.progress.store(index + 1, Ordering::SeqCst);
            debug!(point = index, of = total, "trigger fired");
        }
        TaskOutcome::Completed
    }

    /// Sleep out one interval, returning `Err(())` if cancelled first.
    async fn wait_interval(&mut self, seconds: f64) -> Result<(), ()> {
        let sleep = self.clock.sleep(Duration::from_secs_f64(seconds));
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return Ok(()),
                changed = self.cancel.changed() => {
                    // A dropped sender means the controller is gone; stop.
                    if changed.is_err() || *self.cancel.borrow() {
                        return Err(());
                    }
                }
            }
        }
    }
}
