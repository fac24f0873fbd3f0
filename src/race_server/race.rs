//! Race - Race configuration and state management
//!
//! Handles race setup, reset, and finish detection.

use serde::{Deserialize, Serialize};

use crate::race_server::error::{RaceError, RaceResult};
use crate::race_server::runner::RunnerState;

/// Complete race state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Race {
    /// Registry-assigned race ID
    pub id: u32,
    /// Target distance
    pub distance: f64,
    /// All runners in the race, in id order
    pub runners: Vec<RunnerState>,
    /// Ticks simulated so far
    pub elapsed_time: u64,
    /// Set once a runner reaches the target distance
    pub finished: bool,
    /// Winning runner, present only when finished
    #[serde(default)]
    pub winner_id: Option<u32>,
}

impl Race {
    /// Create a new race at the start line
    pub fn new(id: u32, distance: f64, runners: Vec<RunnerState>) -> Self {
        Self {
            id,
            distance,
            runners,
            elapsed_time: 0,
            finished: false,
            winner_id: None,
        }
    }

    /// Replace the field and clear all progress
    pub fn reset(&mut self, distance: f64, runners: Vec<RunnerState>) {
        self.distance = distance;
        self.runners = runners;
        self.elapsed_time = 0;
        self.finished = false;
        self.winner_id = None;
    }

    /// Reject a race that could never terminate or has nobody to run it
    pub fn validate(&self) -> RaceResult<()> {
        if !(self.distance.is_finite() && self.distance > 0.0) {
            return Err(RaceError::InvalidState(format!(
                "race {} has non-positive distance {}",
                self.id, self.distance
            )));
        }
        if self.runners.is_empty() {
            return Err(RaceError::InvalidState(format!(
                "race {} has no runners",
                self.id
            )));
        }
        if let Some(runner) = self
            .runners
            .iter()
            .find(|r| !(r.speed.is_finite() && r.speed > 0.0))
        {
            return Err(RaceError::InvalidState(format!(
                "runner {} in race {} has non-positive speed {}",
                runner.id, self.id, runner.speed
            )));
        }
        Ok(())
    }

    /// Runners at or past the finish line
    pub fn finishers(&self) -> impl Iterator<Item = &RunnerState> {
        self.runners
            .iter()
            .filter(move |r| r.distance_covered >= self.distance)
    }

    /// Finisher with the greatest distance; ties go to the lowest id
    pub fn leading_finisher(&self) -> Option<&RunnerState> {
        self.finishers().fold(None, |best: Option<&RunnerState>, runner| match best {
            Some(b)
                if b.distance_covered > runner.distance_covered
                    || (b.distance_covered == runner.distance_covered && b.id < runner.id) =>
            {
                Some(b)
            }
            _ => Some(runner),
        })
    }

    /// Get runner by ID
    pub fn get_runner(&self, id: u32) -> Option<&RunnerState> {
        self.runners.iter().find(|r| r.id == id)
    }
}

/// Upper bounds on caller-supplied race parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaceLimits {
    pub max_runners: u32,
    /// Bounds the tick count at `max_distance / Runner::MIN_SPEED`
    pub max_distance: f64,
}

impl Default for RaceLimits {
    fn default() -> Self {
        Self {
            max_runners: 100,
            max_distance: 10_000.0,
        }
    }
}

/// Validate the caller-supplied parameters of a race
pub fn check_race_params(runner_count: u32, distance: f64, limits: &RaceLimits) -> RaceResult<()> {
    if runner_count == 0 {
        return Err(RaceError::InvalidArgument(
            "runner count must be a positive integer".to_string(),
        ));
    }
    if runner_count > limits.max_runners {
        return Err(RaceError::InvalidArgument(format!(
            "runner count {runner_count} exceeds the limit of {}",
            limits.max_runners
        )));
    }
    if !(distance.is_finite() && distance > 0.0) {
        return Err(RaceError::InvalidArgument(format!(
            "distance must be a positive number, got {distance}"
        )));
    }
    if distance > limits.max_distance {
        return Err(RaceError::InvalidArgument(format!(
            "distance {distance} exceeds the limit of {}",
            limits.max_distance
        )));
    }
    Ok(())
}
