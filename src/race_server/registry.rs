//! Registry - Race lifecycle over a race store
//!
//! Owns id allocation and the runner RNG. Every operation reads the whole
//! collection from the store and writes it back after mutating.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::race_server::error::{RaceError, RaceResult};
use crate::race_server::race::{check_race_params, Race, RaceLimits};
use crate::race_server::runner::Runner;
use crate::race_server::simulation::{AdvanceStatus, Simulation};
use crate::race_server::store::RaceStore;

/// Race returned from `advance`, with how the call ended
#[derive(Debug, Clone)]
pub struct Advance {
    pub race: Race,
    pub status: AdvanceStatus,
}

/// Creates, simulates, resets and deletes races held in a store
pub struct RaceRegistry<S> {
    store: S,
    /// Id for the next created race
    next_id: u32,
    rng: StdRng,
    limits: RaceLimits,
}

impl<S: RaceStore> RaceRegistry<S> {
    /// Open a registry with an entropy-seeded RNG
    pub fn open(store: S) -> RaceResult<Self> {
        Self::open_with_rng(store, StdRng::from_entropy())
    }

    /// Open a registry whose runner speeds are reproducible
    pub fn open_seeded(store: S, seed: u64) -> RaceResult<Self> {
        Self::open_with_rng(store, StdRng::seed_from_u64(seed))
    }

    fn open_with_rng(store: S, rng: StdRng) -> RaceResult<Self> {
        let races = store.load_all()?;
        let next_id = match races.iter().map(|r| r.id).max() {
            Some(max) => max.checked_add(1).ok_or_else(|| {
                RaceError::InvalidState(format!("stored race id {max} leaves no id to allocate"))
            })?,
            None => 1,
        };
        log::info!(
            "Race registry opened with {} stored races, next id {}",
            races.len(),
            next_id
        );
        Ok(Self {
            store,
            next_id,
            rng,
            limits: RaceLimits::default(),
        })
    }

    /// Replace the bounds applied to `create` and `reset`
    pub fn with_limits(mut self, limits: RaceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Id the next `create` call will assign
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create and store a new race
    pub fn create(&mut self, runner_count: u32, distance: f64) -> RaceResult<Race> {
        check_race_params(runner_count, distance, &self.limits)?;
        let following_id = self.next_id.checked_add(1).ok_or_else(|| {
            RaceError::InvalidState(format!("race id space exhausted at {}", self.next_id))
        })?;

        let mut races = self.store.load_all()?;
        let runners = Runner::generate(runner_count, &mut self.rng)?;
        let race = Race::new(self.next_id, distance, runners);

        races.push(race.clone());
        self.store.save_all(&races)?;
        self.next_id = following_id;

        log::info!(
            "Race {} created with {} runners over {}",
            race.id,
            runner_count,
            distance
        );
        Ok(race)
    }

    /// Fetch a race by id
    pub fn get(&self, id: u32) -> RaceResult<Race> {
        self.store
            .load_all()?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or(RaceError::NotFound(id))
    }

    /// All races, in store order
    pub fn list(&self) -> RaceResult<Vec<Race>> {
        Ok(self.store.load_all()?)
    }

    /// Simulate a race to completion, persisting after every tick
    pub fn advance(&mut self, id: u32) -> RaceResult<Advance> {
        let mut races = self.store.load_all()?;
        let index = Self::position(&races, id)?;
        let mut race = races[index].clone();

        // Each tick copies the race back into the collection and rewrites the
        // whole store, so cost grows with ticks times trajectory length.
        let store = &self.store;
        let status = Simulation::run(&mut race, |snapshot| {
            races[index].clone_from(snapshot);
            store.save_all(&races)?;
            Ok(())
        })?;

        Ok(Advance { race, status })
    }

    /// Regenerate runners and clear all progress
    pub fn reset(&mut self, id: u32, runner_count: u32, distance: f64) -> RaceResult<Race> {
        check_race_params(runner_count, distance, &self.limits)?;

        let mut races = self.store.load_all()?;
        let index = Self::position(&races, id)?;
        let runners = Runner::generate(runner_count, &mut self.rng)?;
        races[index].reset(distance, runners);
        self.store.save_all(&races)?;

        log::info!(
            "Race {} reset with {} runners over {}",
            id,
            runner_count,
            distance
        );
        Ok(races[index].clone())
    }

    /// Remove a race from the store
    pub fn delete(&mut self, id: u32) -> RaceResult<()> {
        let mut races = self.store.load_all()?;
        let index = Self::position(&races, id)?;
        races.remove(index);
        self.store.save_all(&races)?;

        log::info!("Race {} deleted", id);
        Ok(())
    }

    fn position(races: &[Race], id: u32) -> RaceResult<usize> {
        races
            .iter()
            .position(|r| r.id == id)
            .ok_or(RaceError::NotFound(id))
    }
}
