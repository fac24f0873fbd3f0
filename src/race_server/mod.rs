//! Race Server Module
//!
//! Race lifecycle and simulation engine. Races live in a `RaceStore`;
//! the registry reads and rewrites the whole collection on every operation.

pub mod error;
pub mod race;
pub mod registry;
pub mod runner;
pub mod simulation;
pub mod store;

pub use error::{RaceError, RaceResult, StoreError};
pub use race::{Race, RaceLimits};
pub use registry::{Advance, RaceRegistry};
pub use runner::{Runner, RunnerState, TrajectorySample};
pub use simulation::{AdvanceStatus, Simulation};
pub use store::{JsonFileStore, MemoryStore, RaceStore};
