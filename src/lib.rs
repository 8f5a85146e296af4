//! Adaptive evolutionary search for army compositions.
//!
//! Given a fixed opposing force and a battle simulator
//! ([`BattleOracle`]), the engine searches for the cheapest army (unit types
//! plus 2-D placements) that wins, or, run across many opposing forces at
//! once ([`balance::BalanceSweep`]), characterizes which units the game's
//! balance favors.
//!
//! The core loop is a self-adaptive (μ+λ) strategy
//! ([`strategy::EvolutionStrategy`]): offspring come from a library of
//! hand-rolled mutation operators chosen by weighted random draw, survivors
//! are selected fitness-descending under a per-composition diversity cap, and
//! operator weights adapt each generation from observed child-beats-parent
//! rates. [`island::IslandSearch`] runs several such strategies concurrently
//! and migrates best individuals between them at epoch boundaries.
//!
//! The battle simulator is an external collaborator: the engine calls it,
//! concurrently from independent workers, and never implements or retries it.
//! Fitness evaluation is embarrassingly parallel and runs on a bounded worker
//! pool (`parallel` feature, on by default).
//!
//! Every stateful component owns a seeded [`rand_pcg::Pcg64`], so a run
//! replays deterministically whenever the oracle itself is deterministic.

use std::time::Duration;

use thiserror::Error;

pub mod army;
pub mod balance;
pub mod fitness;
pub mod individual;
pub mod island;
pub mod operators;
pub mod population;
pub mod strategy;

pub use army::{Army, Composition, Placement, Position, Region, UnitCatalog, UnitType};
pub use fitness::{BattleOutcome, Fitness};
pub use individual::{Evaluation, Individual};
pub use population::Population;

/// Error the oracle may surface; opaque to the engine.
pub type OracleError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// What the simulator reports about one finished battle.
#[derive(Debug, Clone, Copy)]
pub struct BattleReport {
    pub outcome: BattleOutcome,
    /// Total remaining health on the ally side.
    pub ally_health: f32,
    /// Total remaining health on the enemy side.
    pub enemy_health: f32,
}

/// The external battle simulator.
///
/// The engine assumes the oracle is deterministic (or close to it) for the
/// same inputs and safe to invoke concurrently: any mutable simulation state
/// must be created per call, never shared between workers. A failed
/// simulation fails the evaluating batch; the engine never substitutes a
/// default fitness.
pub trait BattleOracle: Sync {
    fn simulate(
        &self,
        allies: &Army,
        enemies: &Army,
        timeout: Duration,
    ) -> Result<BattleReport, OracleError>;
}

/// Failures the engine propagates to the caller.
///
/// Invalid-state conditions (reading fitness before evaluation, re-evaluating
/// against a different enemy, an operator emitting an empty army) are
/// programmer errors and panic with a diagnostic instead of appearing here.
#[derive(Debug, Error)]
pub enum EvolveError {
    #[error("battle oracle failed while evaluating army [{composition}]")]
    Oracle {
        composition: String,
        #[source]
        source: OracleError,
    },
}
