//! Simulation - Tick-by-tick race engine
//!
//! Advances every runner once per tick until somebody crosses the line.
//! Each completed tick is handed to a commit callback so the caller can
//! persist progress before the next tick starts.

use serde::Serialize;

use crate::race_server::error::RaceResult;
use crate::race_server::race::Race;
use crate::race_server::runner::Runner;

/// How an `advance` call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceStatus {
    /// The race was simulated to its terminal tick by this call
    Completed,
    /// The race had already finished and was left untouched
    AlreadyFinished,
}

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running,
    Finished { winner_id: u32 },
}

/// Race simulation logic
pub struct Simulation;

impl Simulation {
    /// Perform a single simulation tick
    pub fn tick(race: &mut Race) -> TickOutcome {
        race.elapsed_time += 1;
        let elapsed_time = race.elapsed_time;

        for runner in &mut race.runners {
            Runner::update(runner, elapsed_time);
        }

        match race.leading_finisher().map(|r| r.id) {
            Some(winner_id) => {
                race.finished = true;
                race.winner_id = Some(winner_id);
                TickOutcome::Finished { winner_id }
            }
            None => TickOutcome::Running,
        }
    }

    /// Run the race to completion, calling `commit` after every tick.
    ///
    /// A finished race is returned untouched with `AlreadyFinished` and
    /// `commit` is never called. If `commit` fails the race keeps the state
    /// of the failed tick and the error is returned.
    pub fn run<F>(race: &mut Race, mut commit: F) -> RaceResult<AdvanceStatus>
    where
        F: FnMut(&Race) -> RaceResult<()>,
    {
        if race.finished {
            log::debug!("Race {} already finished, nothing to simulate", race.id);
            return Ok(AdvanceStatus::AlreadyFinished);
        }
        race.validate()?;

        loop {
            let outcome = Self::tick(race);
            log::trace!("Race {} tick {}: {:?}", race.id, race.elapsed_time, outcome);
            commit(race)?;

            if let TickOutcome::Finished { winner_id } = outcome {
                log::info!(
                    "Race {} finished after {} ticks, winner is runner {}",
                    race.id,
                    race.elapsed_time,
                    winner_id
                );
                return Ok(AdvanceStatus::Completed);
            }
        }
    }
}
