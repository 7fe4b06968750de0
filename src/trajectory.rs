//! Per-axis position sequences for continuous moves.
//!
//! A [`Trajectory`] is the ordered set of target positions, one slot per
//! axis, for each trigger point of a move. An axis is either driven for the
//! whole trajectory or entirely absent: for a given axis index, every point
//! holds `Some(position)` or every point holds `None`. That invariant is
//! enforced on every mutation so a half-driven axis is caught where it is
//! introduced, not when the move starts.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// One target position per axis; `None` marks an axis this trajectory does
/// not drive.
pub type Point = Vec<Option<f64>>;

/// Ordered, per-axis sequence of target positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    axis_count: usize,
    points: Vec<Point>,
}

impl Trajectory {
    /// An empty trajectory over `axis_count` axes.
    pub fn new(axis_count: usize) -> Self {
        Self {
            axis_count,
            points: Vec::new(),
        }
    }

    /// The axis count fixed at creation.
    pub fn axis_count(&self) -> usize {
        self.axis_count
    }

    /// Number of points (equals the move's trigger count).
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if no points have been added.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Append one point.
    ///
    /// Rejects a point whose length disagrees with the axis count, or whose
    /// driven-axis pattern disagrees with the points already present.
    pub fn add_point(&mut self, point: Point) -> Result<(), ConfigError> {
        if point.len() != self.axis_count {
            return Err(ConfigError::PointLengthMismatch {
                expected: self.axis_count,
                got: point.len(),
            });
        }
        if let Some(first) = self.points.first() {
            for axis in 0..self.axis_count {
                if first[axis].is_some() != point[axis].is_some() {
                    return Err(ConfigError::InconsistentAxis { axis });
                }
            }
        }
        self.points.push(point);
        Ok(())
    }

    /// Set the full position sequence for one axis.
    ///
    /// On an empty trajectory this creates one point per value, driving only
    /// `axis`. On a populated trajectory the sequence length must equal the
    /// existing point count; the axis slot of every point is overwritten.
    pub fn set_axis_trajectory(&mut self, axis: usize, values: Vec<f64>) -> Result<(), ConfigError> {
        if axis >= self.axis_count {
            return Err(ConfigError::AxisIndexOutOfRange {
                axis,
                axis_count: self.axis_count,
            });
        }
        if self.points.is_empty() {
            self.points = values
                .into_iter()
                .map(|value| {
                    let mut point = vec![None; self.axis_count];
                    point[axis] = Some(value);
                    point
                })
                .collect();
            return Ok(());
        }
        if values.len() != self.points.len() {
            return Err(ConfigError::AxisTrajectoryLength {
                expected: self.points.len(),
                got: values.len(),
                axis,
            });
        }
        for (point, value) in self.points.iter_mut().zip(values) {
            point[axis] = Some(value);
        }
        Ok(())
    }

    /// The point at `index`, if present.
    pub fn point(&self, index: usize) -> Option<&[Option<f64>]> {
        self.points.get(index).map(Vec::as_slice)
    }

    /// The first point; errors on an empty trajectory.
    pub fn first_point(&self) -> Result<&[Option<f64>], ConfigError> {
        self.points
            .first()
            .map(Vec::as_slice)
            .ok_or(ConfigError::EmptyTrajectory)
    }

    /// The most recently appended point; errors on an empty trajectory.
    pub fn last_point_added(&self) -> Result<&[Option<f64>], ConfigError> {
        self.points
            .last()
            .map(Vec::as_slice)
            .ok_or(ConfigError::EmptyTrajectory)
    }

    /// True if `axis` holds a position in every point.
    pub fn axis_is_driven(&self, axis: usize) -> bool {
        self.points
            .first()
            .map(|point| point.get(axis).is_some_and(|slot| slot.is_some()))
            .unwrap_or(false)
    }

    /// Iterate over the points in trigger order.
    pub fn iter(&self) -> impl Iterator<Item = &[Option<f64>]> + '_ {
        self.points.iter().map(Vec::as_slice)
    }

    /// Check the whole trajectory: non-empty and per-axis all-or-none.
    ///
    /// `add_point` already enforces consistency incrementally; this re-checks
    /// everything so deserialized or hand-assembled trajectories get the same
    /// guarantee.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let first = self.first_point()?;
        for point in &self.points {
            for axis in 0..self.axis_count {
                if first[axis].is_some() != point[axis].is_some() {
                    return Err(ConfigError::InconsistentAxis { axis });
                }
            }
        }
        Ok(())
    }

    /// Discard all points.
    pub fn clear(&mut self) {
        self.points.clear();
    }
}
