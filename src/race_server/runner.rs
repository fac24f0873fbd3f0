//! Runner - Individual runner state and behavior
//!
//! Each runner has a fixed speed and accumulates distance once per tick,
//! recording a trajectory sample as it goes.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::race_server::error::{RaceError, RaceResult};

/// Distance covered by a runner at the end of a tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySample {
    pub elapsed_time: u64,
    pub distance_covered: f64,
}

/// Complete state for a single runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerState {
    /// Runner ID, 1-based within its race
    pub id: u32,
    /// Distance per tick, fixed for the runner's lifetime
    pub speed: f64,
    /// Total distance travelled so far
    pub distance_covered: f64,
    /// One sample per simulated tick
    #[serde(default)]
    pub trajectory: Vec<TrajectorySample>,
}

impl RunnerState {
    /// Create a runner at the start line
    pub fn new(id: u32, speed: f64) -> Self {
        Self {
            id,
            speed,
            distance_covered: 0.0,
            trajectory: Vec::new(),
        }
    }
}

/// Runner generation and simulation logic
pub struct Runner;

impl Runner {
    /// Speeds are drawn in hundredths so they are already rounded to 2 decimals
    const MIN_SPEED_HUNDREDTHS: u32 = 500;
    const MAX_SPEED_HUNDREDTHS: u32 = 1500;

    pub const MIN_SPEED: f64 = Self::MIN_SPEED_HUNDREDTHS as f64 / 100.0;
    pub const MAX_SPEED: f64 = Self::MAX_SPEED_HUNDREDTHS as f64 / 100.0;

    /// Generate `count` runners with ids `1..=count` and uniform random speeds
    /// in `[MIN_SPEED, MAX_SPEED)`.
    pub fn generate<R: Rng>(count: u32, rng: &mut R) -> RaceResult<Vec<RunnerState>> {
        if count == 0 {
            return Err(RaceError::InvalidArgument(
                "runner count must be a positive integer".to_string(),
            ));
        }

        let runners = (1..=count)
            .map(|id| RunnerState::new(id, Self::random_speed(rng)))
            .collect();
        Ok(runners)
    }

    fn random_speed<R: Rng>(rng: &mut R) -> f64 {
        let hundredths = rng.gen_range(Self::MIN_SPEED_HUNDREDTHS..Self::MAX_SPEED_HUNDREDTHS);
        f64::from(hundredths) / 100.0
    }

    /// Update a single runner for one tick
    pub fn update(state: &mut RunnerState, elapsed_time: u64) {
        state.distance_covered += state.speed;
        state.trajectory.push(TrajectorySample {
            elapsed_time,
            distance_covered: state.distance_covered,
        });
    }
}
