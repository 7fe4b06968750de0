//! Move variants: construction of trajectory + schedule pairs.
//!
//! Each variant only knows how to *build* the trajectory and trigger
//! schedule for its kind of move; the state machine in the parent module is
//! shared by all of them. [`MoveProfile`] is the closed set of variants a
//! controller accepts.

use crate::error::ConfigError;
use crate::schedule::TriggerSchedule;
use crate::trajectory::{Point, Trajectory};
use serde::{Deserialize, Serialize};

/// Trigger count for an evenly stepped sweep: `floor((end-start)/step) + 1`.
///
/// Valid for either step sign; a decreasing sweep pairs `end < start` with a
/// negative step. An end lying opposite the step direction is unreachable.
fn count_steps(start: f64, end: f64, step: f64) -> Result<usize, ConfigError> {
    if step == 0.0 || !step.is_finite() {
        return Err(ConfigError::ZeroStep);
    }
    let span = end - start;
    if span == 0.0 {
        return Ok(1);
    }
    let ratio = span / step;
    if ratio < 0.0 {
        return Err(ConfigError::UnreachableEnd { start, end, step });
    }
    // Guard against 4.999999... from an exactly divisible span.
    Ok((ratio + 1e-9).floor() as usize + 1)
}

/// Single-axis sweep at fixed speed: evenly spaced points from `start`
/// toward `end` in increments of `step`, triggered at a uniform period.
///
/// Fields are independently mutable; they are re-validated every time the
/// profile is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantVelocityMove {
    /// Sweep start position, hardware units.
    pub start: f64,
    /// Sweep end position, hardware units.
    pub end: f64,
    /// Position increment per trigger; sign selects the sweep direction.
    pub step: f64,
    /// Seconds between triggers.
    pub trigger_period: f64,
}

impl ConstantVelocityMove {
    /// A sweep from `start` toward `end` in increments of `step`.
    pub fn new(start: f64, end: f64, step: f64, trigger_period: f64) -> Self {
        Self {
            start,
            end,
            step,
            trigger_period,
        }
    }

    /// Number of triggers the sweep will fire.
    pub fn number_of_triggers(&self) -> Result<usize, ConfigError> {
        count_steps(self.start, self.end, self.step)
    }

    /// Total scheduled sweep time, in seconds.
    pub fn total_time(&self) -> Result<f64, ConfigError> {
        let schedule = TriggerSchedule::uniform(self.trigger_period)?;
        schedule.total_time(self.number_of_triggers()?)
    }

    /// Build the synthetic one-axis trajectory and uniform schedule.
    pub fn build(&self) -> Result<(Trajectory, TriggerSchedule), ConfigError> {
        let triggers = self.number_of_triggers()?;
        let schedule = TriggerSchedule::uniform(self.trigger_period)?;
        let mut trajectory = Trajectory::new(1);
        for index in 0..triggers {
            trajectory.add_point(vec![Some(self.start + index as f64 * self.step)])?;
        }
        Ok((trajectory, schedule))
    }
}

/// 2D raster: an inner constant-velocity sweep repeated across an outer
/// stepped axis.
///
/// Axis 0 is the inner (triggered) axis, axis 1 the outer. The outer axis
/// only changes value between inner sweeps, so within a segment its target
/// is constant and every outer row repeats the inner point pattern exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterMove {
    /// The repeated inner sweep.
    pub inner: ConstantVelocityMove,
    /// Outer axis start position.
    pub outer_start: f64,
    /// Outer axis end position.
    pub outer_end: f64,
    /// Outer axis increment between inner sweeps.
    pub outer_step: f64,
}

impl RasterMove {
    /// A raster of `inner` sweeps across the outer axis range.
    pub fn new(inner: ConstantVelocityMove, outer_start: f64, outer_end: f64, outer_step: f64) -> Self {
        Self {
            inner,
            outer_start,
            outer_end,
            outer_step,
        }
    }

    /// Number of outer-axis rows.
    pub fn outer_steps(&self) -> Result<usize, ConfigError> {
        count_steps(self.outer_start, self.outer_end, self.outer_step)
    }

    /// Total trigger count across all rows.
    pub fn number_of_triggers(&self) -> Result<usize, ConfigError> {
        Ok(self.inner.number_of_triggers()? * self.outer_steps()?)
    }

    /// Total scheduled raster time, in seconds.
    pub fn total_time(&self) -> Result<f64, ConfigError> {
        let schedule = TriggerSchedule::uniform(self.inner.trigger_period)?;
        schedule.total_time(self.number_of_triggers()?)
    }

    /// Build the two-axis trajectory and uniform schedule.
    pub fn build(&self) -> Result<(Trajectory, TriggerSchedule), ConfigError> {
        let inner_triggers = self.inner.number_of_triggers()?;
        let outer_rows = self.outer_steps()?;
        let schedule = TriggerSchedule::uniform(self.inner.trigger_period)?;

        let mut trajectory = Trajectory::new(2);
        for row in 0..outer_rows {
            let outer_position = self.outer_start + row as f64 * self.outer_step;
            for index in 0..inner_triggers {
                trajectory.add_point(vec![
                    Some(self.inner.start + index as f64 * self.inner.step),
                    Some(outer_position),
                ])?;
            }
        }
        trajectory.validate()?;
        Ok((trajectory, schedule))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum ConfigStyle {
    PerPoint,
    PerAxis,
}

/// Arbitrary explicit trajectory: points added one at a time or whole axis
/// sequences at once, with a uniform period or explicit per-point deltas.
///
/// The two trajectory styles are exclusive on one instance; mixing them is
/// a configuration error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryMove {
    trajectory: Trajectory,
    schedule: TriggerSchedule,
    style: Option<ConfigStyle>,
}

impl TrajectoryMove {
    /// An empty move over `axis_count` axes.
    pub fn new(axis_count: usize) -> Self {
        Self {
            trajectory: Trajectory::new(axis_count),
            schedule: TriggerSchedule::new(),
            style: None,
        }
    }

    /// The axis count fixed at creation.
    pub fn axis_count(&self) -> usize {
        self.trajectory.axis_count()
    }

    /// Points added so far.
    pub fn point_count(&self) -> usize {
        self.trajectory.len()
    }

    /// Append one point. Exclusive with [`Self::set_axis_trajectory`].
    pub fn add_point(&mut self, point: Point) -> Result<(), ConfigError> {
        if self.style == Some(ConfigStyle::PerAxis) {
            return Err(ConfigError::MixedConfiguration);
        }
        self.trajectory.add_point(point)?;
        self.style = Some(ConfigStyle::PerPoint);
        Ok(())
    }

    /// Set a whole axis's position sequence. Exclusive with
    /// [`Self::add_point`].
    pub fn set_axis_trajectory(&mut self, axis: usize, values: Vec<f64>) -> Result<(), ConfigError> {
        if self.style == Some(ConfigStyle::PerPoint) {
            return Err(ConfigError::MixedConfiguration);
        }
        self.trajectory.set_axis_trajectory(axis, values)?;
        self.style = Some(ConfigStyle::PerAxis);
        Ok(())
    }

    /// Trigger at a uniform period, discarding any deltas.
    pub fn set_trigger_period(&mut self, period: f64) -> Result<(), ConfigError> {
        self.schedule.set_uniform_period(period)
    }

    /// Trigger at explicit per-point deltas, discarding any period.
    pub fn set_trigger_deltas(&mut self, deltas: Vec<f64>) -> Result<(), ConfigError> {
        self.schedule.set_deltas(deltas)
    }

    /// Validate and hand over the trajectory and schedule.
    pub fn build(self) -> Result<(Trajectory, TriggerSchedule), ConfigError> {
        self.trajectory.validate()?;
        self.schedule.validate_for(self.trajectory.len())?;
        Ok((self.trajectory, self.schedule))
    }
}

/// The closed set of move variants a controller accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MoveProfile {
    /// Single-axis constant-velocity sweep.
    ConstantVelocity(ConstantVelocityMove),
    /// 2D raster of constant-velocity sweeps.
    Raster(RasterMove),
    /// Fully explicit trajectory.
    Trajectory(TrajectoryMove),
}

impl MoveProfile {
    /// Build the variant's trajectory and schedule.
    pub fn build(self) -> Result<(Trajectory, TriggerSchedule), ConfigError> {
        match self {
            MoveProfile::ConstantVelocity(profile) => profile.build(),
            MoveProfile::Raster(profile) => profile.build(),
            MoveProfile::Trajectory(profile) => profile.build(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_velocity_counts_triggers() {
        let sweep = ConstantVelocityMove::new(0.0, 10.0, 2.0, 0.5);
        assert_eq!(sweep.number_of_triggers().unwrap(), 6);

        let (trajectory, schedule) = sweep.build().unwrap();
        assert_eq!(trajectory.len(), 6);
        let positions: Vec<f64> = trajectory
            .iter()
            .map(|point| point[0].unwrap())
            .collect();
        assert_eq!(positions, vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert!(schedule.is_uniform());
    }

    #[test]
    fn constant_velocity_total_time_follows_schedule_convention() {
        // Regression for the period*N convention across variants.
        let sweep = ConstantVelocityMove::new(0.0, 10.0, 2.0, 0.5);
        assert!((sweep.total_time().unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn decreasing_sweep_is_valid() {
        let sweep = ConstantVelocityMove::new(10.0, 0.0, -2.5, 0.1);
        assert_eq!(sweep.number_of_triggers().unwrap(), 5);
        let (trajectory, _) = sweep.build().unwrap();
        assert_eq!(trajectory.last_point_added().unwrap(), &[Some(0.0)]);
    }

    #[test]
    fn zero_step_is_rejected() {
        let sweep = ConstantVelocityMove::new(0.0, 10.0, 0.0, 0.1);
        assert!(matches!(
            sweep.number_of_triggers(),
            Err(ConfigError::ZeroStep)
        ));
    }

    #[test]
    fn end_opposite_the_step_is_unreachable() {
        let sweep = ConstantVelocityMove::new(0.0, 10.0, -1.0, 0.1);
        assert!(matches!(
            sweep.number_of_triggers(),
            Err(ConfigError::UnreachableEnd { .. })
        ));
    }

    #[test]
    fn equal_start_and_end_is_one_trigger() {
        let sweep = ConstantVelocityMove::new(5.0, 5.0, 1.0, 0.1);
        assert_eq!(sweep.number_of_triggers().unwrap(), 1);
    }

    #[test]
    fn inexact_span_floors_the_count() {
        let sweep = ConstantVelocityMove::new(0.0, 9.0, 2.0, 0.1);
        assert_eq!(sweep.number_of_triggers().unwrap(), 5);
        let (trajectory, _) = sweep.build().unwrap();
        assert_eq!(trajectory.last_point_added().unwrap(), &[Some(8.0)]);
    }

    #[test]
    fn raster_repeats_inner_sweep_per_outer_row() {
        let raster = RasterMove::new(
            ConstantVelocityMove::new(0.0, 2.0, 1.0, 0.1),
            10.0,
            11.0,
            1.0,
        );
        assert_eq!(raster.number_of_triggers().unwrap(), 6);

        let (trajectory, _) = raster.build().unwrap();
        assert_eq!(trajectory.axis_count(), 2);
        assert_eq!(trajectory.len(), 6);
        // Second row restarts the inner sweep with the outer axis advanced.
        assert_eq!(trajectory.point(3).unwrap(), &[Some(0.0), Some(11.0)]);
        assert_eq!(trajectory.point(5).unwrap(), &[Some(2.0), Some(11.0)]);
    }

    #[test]
    fn raster_outer_only_changes_between_rows() {
        let raster = RasterMove::new(
            ConstantVelocityMove::new(0.0, 1.0, 1.0, 0.1),
            0.0,
            2.0,
            1.0,
        );
        let (trajectory, _) = raster.build().unwrap();
        let outer: Vec<f64> = trajectory.iter().map(|point| point[1].unwrap()).collect();
        assert_eq!(outer, vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn trajectory_move_rejects_mixed_styles() {
        let mut per_point = TrajectoryMove::new(1);
        per_point.add_point(vec![Some(0.0)]).unwrap();
        assert!(matches!(
            per_point.set_axis_trajectory(0, vec![1.0]),
            Err(ConfigError::MixedConfiguration)
        ));

        let mut per_axis = TrajectoryMove::new(1);
        per_axis.set_axis_trajectory(0, vec![0.0, 1.0]).unwrap();
        assert!(matches!(
            per_axis.add_point(vec![Some(2.0)]),
            Err(ConfigError::MixedConfiguration)
        ));
    }

    #[test]
    fn trajectory_move_builds_with_deltas() {
        let mut profile = TrajectoryMove::new(2);
        profile.set_axis_trajectory(0, vec![0.0, 1.0, 2.0]).unwrap();
        profile.set_axis_trajectory(1, vec![5.0, 5.0, 5.0]).unwrap();
        profile.set_trigger_deltas(vec![0.1, 0.2, 0.3]).unwrap();

        let (trajectory, schedule) = profile.build().unwrap();
        assert_eq!(trajectory.len(), 3);
        assert!((schedule.total_time(3).unwrap() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn trajectory_move_requires_timing() {
        let mut profile = TrajectoryMove::new(1);
        profile.add_point(vec![Some(0.0)]).unwrap();
        assert!(matches!(
            profile.build(),
            Err(ConfigError::ScheduleUnset)
        ));
    }

    #[test]
    fn profile_enum_dispatches_build() {
        let profile =
            MoveProfile::ConstantVelocity(ConstantVelocityMove::new(0.0, 1.0, 1.0, 0.1));
        let (trajectory, _) = profile.build().unwrap();
        assert_eq!(trajectory.len(), 2);
    }
}
