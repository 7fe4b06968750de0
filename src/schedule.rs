//! Trigger timing for continuous moves.
//!
//! A [`TriggerSchedule`] holds either a uniform period between triggers or an
//! explicit per-point sequence of time deltas. The two are mutually
//! exclusive: setting one clears the other, so total-time arithmetic never
//! silently mixes both.
//!
//! Time convention: execution waits one interval before every trigger,
//! including the first, so a move of N triggers at uniform period `p` spans
//! `p * N` seconds. The regression tests in this module pin that convention.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
enum Timing {
    #[default]
    Unset,
    Uniform {
        period: f64,
    },
    Deltas {
        deltas: Vec<f64>,
    },
}

/// Uniform period XOR explicit per-point trigger intervals, in seconds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TriggerSchedule {
    timing: Timing,
}

fn check_interval(value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositiveInterval { value })
    }
}

impl TriggerSchedule {
    /// A schedule with no timing configured yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A schedule firing every `period` seconds.
    pub fn uniform(period: f64) -> Result<Self, ConfigError> {
        let mut schedule = Self::new();
        schedule.set_uniform_period(period)?;
        Ok(schedule)
    }

    /// A schedule with one explicit interval per point.
    pub fn from_deltas(deltas: Vec<f64>) -> Result<Self, ConfigError> {
        let mut schedule = Self::new();
        schedule.set_deltas(deltas)?;
        Ok(schedule)
    }

    /// Set a uniform period, discarding any explicit deltas.
    pub fn set_uniform_period(&mut self, period: f64) -> Result<(), ConfigError> {
        check_interval(period)?;
        self.timing = Timing::Uniform { period };
        Ok(())
    }

    /// Set explicit per-point deltas, discarding any uniform period.
    pub fn set_deltas(&mut self, deltas: Vec<f64>) -> Result<(), ConfigError> {
        for &delta in &deltas {
            check_interval(delta)?;
        }
        self.timing = Timing::Deltas { deltas };
        Ok(())
    }

    /// True once a period or deltas have been set.
    pub fn is_configured(&self) -> bool {
        self.timing != Timing::Unset
    }

    /// True if the schedule uses a uniform period.
    pub fn is_uniform(&self) -> bool {
        matches!(self.timing, Timing::Uniform { .. })
    }

    /// The interval preceding trigger `index`.
    ///
    /// Fails fast if explicit deltas do not cover `index`; never defaults.
    pub fn interval_at(&self, index: usize) -> Result<f64, ConfigError> {
        match &self.timing {
            Timing::Unset => Err(ConfigError::ScheduleUnset),
            Timing::Uniform { period } => Ok(*period),
            Timing::Deltas { deltas } => {
                deltas
                    .get(index)
                    .copied()
                    .ok_or(ConfigError::DeltaCountMismatch {
                        required: index + 1,
                        available: deltas.len(),
                    })
            }
        }
    }

    /// Total elapsed time for a move of `trigger_count` triggers.
    ///
    /// Sum of the first `trigger_count` deltas, or `period * trigger_count`.
    pub fn total_time(&self, trigger_count: usize) -> Result<f64, ConfigError> {
        match &self.timing {
            Timing::Unset => Err(ConfigError::ScheduleUnset),
            Timing::Uniform { period } => Ok(period * trigger_count as f64),
            Timing::Deltas { deltas } => {
                if deltas.len() < trigger_count {
                    return Err(ConfigError::DeltaCountMismatch {
                        required: trigger_count,
                        available: deltas.len(),
                    });
                }
                Ok(deltas[..trigger_count].iter().sum())
            }
        }
    }

    /// Check that the schedule can time a move of `trigger_count` triggers.
    pub fn validate_for(&self, trigger_count: usize) -> Result<(), ConfigError> {
        self.total_time(trigger_count).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_schedule_is_a_config_error() {
        let schedule = TriggerSchedule::new();
        assert!(matches!(
            schedule.total_time(3),
            Err(ConfigError::ScheduleUnset)
        ));
        assert!(matches!(
            schedule.interval_at(0),
            Err(ConfigError::ScheduleUnset)
        ));
    }

    #[test]
    fn setting_period_clears_deltas() {
        let mut schedule = TriggerSchedule::from_deltas(vec![0.1, 0.2]).unwrap();
        schedule.set_uniform_period(0.5).unwrap();
        assert!(schedule.is_uniform());
        assert_eq!(schedule.interval_at(5).unwrap(), 0.5);
    }

    #[test]
    fn setting_deltas_clears_period() {
        let mut schedule = TriggerSchedule::uniform(0.5).unwrap();
        schedule.set_deltas(vec![0.1, 0.2, 0.3]).unwrap();
        assert!(!schedule.is_uniform());
        assert!((schedule.total_time(3).unwrap() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn uniform_total_time_spans_one_period_per_trigger() {
        // Regression for the period*N convention: 3 triggers at 0.1s = 0.3s.
        let schedule = TriggerSchedule::uniform(0.1).unwrap();
        assert!((schedule.total_time(3).unwrap() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn short_deltas_are_rejected_not_defaulted() {
        let schedule = TriggerSchedule::from_deltas(vec![0.1, 0.1]).unwrap();
        assert!(matches!(
            schedule.total_time(3),
            Err(ConfigError::DeltaCountMismatch { required: 3, available: 2 })
        ));
        assert!(matches!(
            schedule.interval_at(2),
            Err(ConfigError::DeltaCountMismatch { required: 3, available: 2 })
        ));
    }

    #[test]
    fn non_positive_intervals_are_rejected() {
        assert!(matches!(
            TriggerSchedule::uniform(0.0),
            Err(ConfigError::NonPositiveInterval { .. })
        ));
        assert!(matches!(
            TriggerSchedule::uniform(f64::NAN),
            Err(ConfigError::NonPositiveInterval { .. })
        ));
        assert!(matches!(
            TriggerSchedule::from_deltas(vec![0.1, -0.2]),
            Err(ConfigError::NonPositiveInterval { .. })
        ));
    }

    #[test]
    fn deltas_longer_than_trajectory_are_fine() {
        let schedule = TriggerSchedule::from_deltas(vec![0.1, 0.2, 0.3, 0.4]).unwrap();
        assert!((schedule.total_time(2).unwrap() - 0.3).abs() < 1e-12);
    }
}
