//! Move controllers: the state machine coordinating trajectory execution
//! against one or more axis controllers.
//!
//! A [`MoveController`] owns a [`Trajectory`] and a [`TriggerSchedule`] for
//! the duration of one scan and walks them with a background execution
//! task, publishing a [`TriggerEvent`] at every point.
//!
//! # State Machine
//!
//! ```text
//! Idle ──configure──> Configured ──prepare_for_move──> Prepared
//!                                                         │
//!                                                     start_move
//!                                                         │
//!                                                         ▼
//! Idle <──(natural completion)────────────────────────  Moving
//!
//! any failed step ──> Error ──stop_and_reset──> Idle
//! ```
//!
//! `stop_and_reset` is valid from every state, including `Error`, and is the
//! only edge out of `Error`. It is idempotent and never raises a state
//! violation.
//!
//! # Concurrency
//!
//! One foreground caller and at most one background execution task per
//! instance; controllers are not designed for concurrent overlapping moves.
//! Trigger events are delivered in point order, at most once per point, and
//! never before the point's interval has elapsed. Cancellation is
//! cooperative: it takes effect at the next point boundary, with worst-case
//! latency of one point interval.

pub mod profile;
pub mod scan;
pub(crate) mod task;

use crate::clock::{Clock, TokioClock};
use crate::config::Settings;
use crate::error::{ConfigError, DeviceError, Interrupted, ScanError};
use crate::hardware::axis::AxisController;
use crate::schedule::TriggerSchedule;
use crate::trajectory::Trajectory;
use chrono::{DateTime, Utc};
use futures::future;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use self::task::{ExecutionTask, TaskOutcome};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Lifecycle state of a [`MoveController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerState {
    /// No scan configured; initial and terminal state.
    Idle,
    /// Trajectory and schedule set, axes not yet at the start position.
    Configured,
    /// Axes confirmed at the trajectory start; ready to move.
    Prepared,
    /// Background execution task running.
    Moving,
    /// A hardware or consistency fault occurred; only `stop_and_reset`
    /// is permitted.
    Error,
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerState::Idle => write!(f, "Idle"),
            ControllerState::Configured => write!(f, "Configured"),
            ControllerState::Prepared => write!(f, "Prepared"),
            ControllerState::Moving => write!(f, "Moving"),
            ControllerState::Error => write!(f, "Error"),
        }
    }
}

impl ControllerState {
    /// Check if the state allows configuring a new scan.
    pub fn can_configure(&self) -> bool {
        matches!(self, ControllerState::Idle | ControllerState::Configured)
    }

    /// Check if the state allows moving axes to the start position.
    pub fn can_prepare(&self) -> bool {
        matches!(self, ControllerState::Configured)
    }

    /// Check if the state allows starting the move.
    pub fn can_start(&self) -> bool {
        matches!(self, ControllerState::Prepared)
    }
}

/// Published when a trigger fires: the point index, the point's coordinates
/// (one slot per axis, `None` for undriven axes), and the fire time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    /// Zero-based trajectory point index.
    pub index: usize,
    /// Target coordinates of the point, one slot per axis.
    pub positions: Vec<Option<f64>>,
    /// Wall-clock time the trigger was published.
    pub timestamp: DateTime<Utc>,
}

/// Snapshot of a controller's progress for UIs and orchestration.
#[derive(Debug, Clone)]
pub struct MoveStatus {
    /// Controller state at snapshot time.
    pub state: ControllerState,
    /// Trigger points published so far in the current or last move.
    pub points_completed: usize,
    /// Point count of the configured trajectory, if one is held.
    pub total_points: Option<usize>,
    /// Message of the fault that put the controller in `Error`, if any.
    pub last_error: Option<String>,
}

struct ExecutionHandle {
    join: JoinHandle<TaskOutcome>,
    cancel_tx: watch::Sender<bool>,
    done_rx: watch::Receiver<bool>,
}

/// State machine driving one or more axes through a trajectory while
/// publishing synchronized trigger events.
pub struct MoveController {
    axes: Vec<Arc<dyn AxisController>>,
    state: ControllerState,
    trajectory: Option<Trajectory>,
    schedule: Option<TriggerSchedule>,
    handle: Option<ExecutionHandle>,
    event_tx: broadcast::Sender<TriggerEvent>,
    clock: Arc<dyn Clock>,
    prepare_timeout: Duration,
    settle_poll_interval: Duration,
    progress: Arc<AtomicUsize>,
    last_error: Option<String>,
}

impl MoveController {
    /// A controller over the given axes with default [`Settings`].
    pub fn new(axes: Vec<Arc<dyn AxisController>>) -> Self {
        Self::with_settings(axes, &Settings::default())
    }

    /// A controller over the given axes with explicit settings.
    pub fn with_settings(axes: Vec<Arc<dyn AxisController>>, settings: &Settings) -> Self {
        let (event_tx, _) = broadcast::channel(settings.event_channel_capacity.max(1));
        Self {
            axes,
            state: ControllerState::Idle,
            trajectory: None,
            schedule: None,
            handle: None,
            event_tx,
            clock: Arc::new(TokioClock),
            prepare_timeout: settings.prepare_timeout,
            settle_poll_interval: settings.settle_poll_interval,
            progress: Arc::new(AtomicUsize::new(0)),
            last_error: None,
        }
    }

    /// Replace the clock; timed waits then follow the injected timeline.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Number of bound axis controllers.
    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    /// Current state. May read `Moving` briefly after natural completion;
    /// [`Self::is_moving`] is the non-blocking truth for motion.
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Progress snapshot for UIs and orchestration.
    pub fn status(&self) -> MoveStatus {
        MoveStatus {
            state: self.state,
            points_completed: self.progress.load(Ordering::SeqCst),
            total_points: self.trajectory.as_ref().map(Trajectory::len),
            last_error: self.last_error.clone(),
        }
    }

    /// Subscribe to trigger events. Subscribe before `start_move`; the
    /// channel is bounded and lagging observers drop events rather than
    /// blocking execution.
    pub fn subscribe(&self) -> broadcast::Receiver<TriggerEvent> {
        self.event_tx.subscribe()
    }

    /// Bind a trajectory and schedule for the next move.
    ///
    /// Valid in `Idle` and `Configured` only; anywhere else, including while
    /// `Moving`, this is a [`DeviceError::InvalidState`] and nothing
    /// changes. Configuration faults (empty trajectory, axis mismatch,
    /// inconsistent axes, unusable schedule) are rejected before any
    /// hardware is touched.
    pub async fn configure(
        &mut self,
        trajectory: Trajectory,
        schedule: TriggerSchedule,
    ) -> Result<(), ScanError> {
        self.reconcile().await;
        if !self.state.can_configure() {
            return Err(DeviceError::invalid_state("configure", self.state).into());
        }
        trajectory.validate()?;
        if trajectory.axis_count() != self.axes.len() {
            return Err(ConfigError::AxisCountMismatch {
                trajectory_axes: trajectory.axis_count(),
                bound_axes: self.axes.len(),
            }
            .into());
        }
        schedule.validate_for(trajectory.len())?;

        info!(
            points = trajectory.len(),
            axes = trajectory.axis_count(),
            "scan configured"
        );
        self.trajectory = Some(trajectory);
        self.schedule = Some(schedule);
        self.state = ControllerState::Configured;
        Ok(())
    }

    /// Build a move variant's trajectory and schedule, then configure.
    pub async fn configure_profile(
        &mut self,
        move_profile: profile::MoveProfile,
    ) -> Result<(), ScanError> {
        let (trajectory, schedule) = move_profile.build()?;
        self.configure(trajectory, schedule).await
    }

    /// Move every driven axis to the trajectory's first point and wait for
    /// all of them to settle.
    ///
    /// Valid in `Configured`. Blocks the caller, bounded by the configured
    /// prepare timeout. On a hardware fault or timeout the controller
    /// transitions to `Error`; abandoning the wait mid-preparation likewise
    /// requires `stop_and_reset` before reuse.
    pub async fn prepare_for_move(&mut self) -> Result<(), ScanError> {
        self.reconcile().await;
        if !self.state.can_prepare() {
            return Err(DeviceError::invalid_state("prepare_for_move", self.state).into());
        }
        let first: Vec<Option<f64>> = match &self.trajectory {
            Some(trajectory) => trajectory.first_point()?.to_vec(),
            None => return Err(DeviceError::invalid_state("prepare_for_move", self.state).into()),
        };

        let mut commands = Vec::new();
        for (axis_index, target) in first.iter().enumerate() {
            let Some(target) = *target else { continue };
            let axis = Arc::clone(&self.axes[axis_index]);
            debug!(axis = axis.name(), target, "moving to start position");
            commands.push(async move { axis.move_to(target).await });
        }
        if let Err(err) = future::try_join_all(commands).await {
            self.fail(&err);
            return Err(err.into());
        }

        let deadline = self.clock.now() + self.prepare_timeout;
        loop {
            let mut settled = true;
            for (axis_index, target) in first.iter().enumerate() {
                if target.is_some() && !self.axes[axis_index].is_in_position().await {
                    settled = false;
                    break;
                }
            }
            if settled {
                break;
            }
            if self.clock.now() >= deadline {
                let err = DeviceError::PrepareTimeout {
                    timeout: self.prepare_timeout,
                };
                self.fail(&err);
                return Err(err.into());
            }
            self.clock.sleep(self.settle_poll_interval).await;
        }

        info!("axes at start position");
        self.state = ControllerState::Prepared;
        Ok(())
    }

    /// Launch the background execution task and return immediately.
    ///
    /// Valid only in `Prepared`; any other state is a
    /// [`DeviceError::InvalidState`] and no task is spawned.
    pub async fn start_move(&mut self) -> Result<(), ScanError> {
        self.reconcile().await;
        if !self.state.can_start() {
            return Err(DeviceError::invalid_state("start_move", self.state).into());
        }
        let (Some(trajectory), Some(schedule)) = (self.trajectory.clone(), self.schedule.clone())
        else {
            return Err(DeviceError::invalid_state("start_move", self.state).into());
        };

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(false);
        self.progress.store(0, Ordering::SeqCst);

        let execution = ExecutionTask::new(
            trajectory,
            schedule,
            self.axes.clone(),
            self.event_tx.clone(),
            Arc::clone(&self.clock),
            cancel_rx,
            Arc::clone(&self.progress),
        );
        let join = tokio::spawn(async move {
            let outcome = execution.run().await;
            let _ = done_tx.send(true);
            outcome
        });

        self.handle = Some(ExecutionHandle {
            join,
            cancel_tx,
            done_rx,
        });
        self.state = ControllerState::Moving;
        info!("move started");
        Ok(())
    }

    /// Non-blocking: true while the execution task is still running.
    pub fn is_moving(&self) -> bool {
        self.state == ControllerState::Moving
            && self
                .handle
                .as_ref()
                .is_some_and(|handle| !handle.join.is_finished())
    }

    /// Block until the current move completes naturally.
    ///
    /// This is a pure barrier, not a cancel: abandoning the wait detaches
    /// the caller and the move continues. A completion channel that closes
    /// without signalling maps to [`Interrupted`].
    pub async fn wait_while_moving(&mut self) -> Result<(), Interrupted> {
        self.reconcile().await;
        if self.state != ControllerState::Moving {
            return Ok(());
        }
        let mut done_rx = match &self.handle {
            Some(handle) => handle.done_rx.clone(),
            None => return Ok(()),
        };
        let waited: Result<(), Interrupted> = async {
            while !*done_rx.borrow() {
                done_rx.changed().await.map_err(|_| {
                    Interrupted::new("execution task ended without signalling completion")
                })?;
            }
            Ok(())
        }
        .await;
        self.reconcile().await;
        waited
    }

    /// Abort any running move and return to `Idle`, from any state.
    ///
    /// Signals cancellation, joins the execution task, and discards the
    /// trajectory and schedule. Idempotent; this is the sole recovery path
    /// out of `Error` and never raises a state violation. Only a task that
    /// fails to join cleanly yields [`Interrupted`], and even then the
    /// controller still lands in `Idle`.
    pub async fn stop_and_reset(&mut self) -> Result<(), Interrupted> {
        let mut interrupted = None;
        if let Some(handle) = self.handle.take() {
            let _ = handle.cancel_tx.send(true);
            if let Err(err) = handle.join.await {
                interrupted = Some(Interrupted::new(format!(
                    "execution task did not join cleanly: {err}"
                )));
            }
        }
        self.trajectory = None;
        self.schedule = None;
        self.last_error = None;
        self.progress.store(0, Ordering::SeqCst);
        self.state = ControllerState::Idle;
        debug!("controller reset");
        match interrupted {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }

    /// Total scheduled time of the configured move, in seconds.
    ///
    /// Valid from `Configured` onward; in `Idle` there is no schedule and
    /// this is [`ConfigError::ScheduleUnset`].
    pub fn total_time(&self) -> Result<f64, ConfigError> {
        match (&self.schedule, &self.trajectory) {
            (Some(schedule), Some(trajectory)) => schedule.total_time(trajectory.len()),
            _ => Err(ConfigError::ScheduleUnset),
        }
    }

    /// Record a fault and enter the `Error` state.
    fn fail(&mut self, err: &DeviceError) {
        error!(error = %err, "controller fault");
        self.last_error = Some(err.to_string());
        self.state = ControllerState::Error;
    }

    /// Fold a finished execution task back into the state machine: natural
    /// completion and cancellation land in `Idle`, a failure lands in
    /// `Error` with the fault recorded.
    async fn reconcile(&mut self) {
        if self.state != ControllerState::Moving {
            return;
        }
        let finished = self
            .handle
            .as_ref()
            .map_or(true, |handle| handle.join.is_finished());
        if !finished {
            return;
        }
        let outcome = match self.handle.take() {
            None => TaskOutcome::Completed,
            Some(handle) => handle.join.await.unwrap_or_else(|err| {
                TaskOutcome::Failed(
                    DeviceError::Other(anyhow::anyhow!("execution task panicked: {err}")).into(),
                )
            }),
        };
        match outcome {
            TaskOutcome::Completed => {
                info!(
                    points = self.progress.load(Ordering::SeqCst),
                    "move completed"
                );
                self.trajectory = None;
                self.schedule = None;
                self.state = ControllerState::Idle;
            }
            TaskOutcome::Cancelled => {
                debug!("move cancelled");
                self.trajectory = None;
                self.schedule = None;
                self.state = ControllerState::Idle;
            }
            TaskOutcome::Failed(err) => {
                error!(error = %err, "move failed");
                self.last_error = Some(err.to_string());
                self.state = ControllerState::Error;
            }
        }
    }
}
