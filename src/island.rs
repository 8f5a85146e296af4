//! Island-model coordination: independent strategies with periodic
//! migration of best individuals.

use std::time::{Duration, Instant};

use log::{debug, info};
use rand::prelude::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::army::{Army, UnitCatalog};
use crate::individual::Individual;
use crate::population::Population;
use crate::strategy::EvolutionStrategy;
use crate::{BattleOracle, EvolveError};

/// One independently evolving population/strategy pair.
///
/// Islands share no mutable state; migration copies armies by value, never
/// references, and mutation-rate state stays island-local.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Island {
    strategy: EvolutionStrategy,
    population: Population,
}

impl Island {
    pub fn new(strategy: EvolutionStrategy, population: Population) -> Self {
        Self {
            strategy,
            population,
        }
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn best(&self) -> Option<&Individual> {
        self.population.best()
    }
}

/// Knobs for one island-coordinated search run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IslandConfig {
    /// Migration events; each epoch runs `generations_per_epoch` on every
    /// island, then migrates.
    pub epochs: usize,
    pub generations_per_epoch: usize,
    /// Per-battle simulation timeout forwarded to the oracle.
    pub battle_timeout: Duration,
    /// Total evaluation workers, divided across islands.
    pub worker_count: usize,
    /// Wall-clock budget for the whole run. Exceeding it aborts remaining
    /// generations and yields the best individual found so far; it is not an
    /// error.
    pub wall_timeout: Option<Duration>,
}

/// Runs N islands concurrently and cross-pollinates them between epochs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IslandSearch {
    islands: Vec<Island>,
    rng: Pcg64,
}

impl IslandSearch {
    /// Islands should be constructed with pairwise-distinct strategy seeds;
    /// correlated islands search the same trajectory and migration buys
    /// nothing. `seed` drives only the migration source choices.
    pub fn new(islands: Vec<Island>, seed: u64) -> Self {
        assert!(!islands.is_empty(), "need at least one island");
        Self {
            islands,
            rng: Pcg64::seed_from_u64(seed),
        }
    }

    pub fn islands(&self) -> &[Island] {
        &self.islands
    }

    /// Runs the full epoch/migration schedule against one fixed enemy army.
    ///
    /// Returns the globally best individual across all islands, or `None`
    /// when the wall clock expired before anything was evaluated.
    pub fn run<O: BattleOracle>(
        &mut self,
        enemy: &Army,
        catalog: &UnitCatalog,
        oracle: &O,
        config: &IslandConfig,
    ) -> Result<Option<Individual>, EvolveError> {
        let deadline = config.wall_timeout.map(|t| Instant::now() + t);
        let workers_per_island = (config.worker_count / self.islands.len()).max(1);

        for epoch in 0..config.epochs {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                info!("wall timeout reached before epoch {epoch}; stopping early");
                break;
            }
            self.run_epoch(
                enemy,
                catalog,
                oracle,
                config,
                workers_per_island,
                deadline,
            )?;

            // Migration happens at the epoch boundary, after every island's
            // epoch has completed. Skip it after the final epoch.
            if epoch + 1 < config.epochs {
                self.migrate(epoch);
            }
        }

        Ok(self.global_best().cloned())
    }

    /// All islands advance one epoch concurrently, splitting the evaluation
    /// worker ceiling between them.
    fn run_epoch<O: BattleOracle>(
        &mut self,
        enemy: &Army,
        catalog: &UnitCatalog,
        oracle: &O,
        config: &IslandConfig,
        workers_per_island: usize,
        deadline: Option<Instant>,
    ) -> Result<(), EvolveError> {
        let generations = config.generations_per_epoch;
        let battle_timeout = config.battle_timeout;

        let mut results: Vec<Option<Result<(), EvolveError>>> = Vec::new();
        results.resize_with(self.islands.len(), || None);
        std::thread::scope(|scope| {
            for (island, slot) in self.islands.iter_mut().zip(&mut results) {
                scope.spawn(move || {
                    let population = std::mem::replace(&mut island.population, Population::new(vec![]));
                    match island.strategy.run(
                        population,
                        enemy,
                        catalog,
                        oracle,
                        battle_timeout,
                        workers_per_island,
                        generations,
                        deadline,
                    ) {
                        Ok(population) => {
                            island.population = population;
                            *slot = Some(Ok(()));
                        }
                        Err(err) => *slot = Some(Err(err)),
                    }
                });
            }
        });
        for slot in results {
            slot.expect("island worker panicked")?;
        }
        Ok(())
    }

    /// For every island, copy the current best individual of one random
    /// *other* island (re-randomized each epoch) into its population, next to
    /// its own best. `epoch` is only used for logging.
    pub fn migrate(&mut self, epoch: usize) {
        if self.islands.len() < 2 {
            return;
        }
        // Snapshot bests first so migration sees pre-migration state only.
        let bests: Vec<Option<Individual>> =
            self.islands.iter().map(|i| i.best().cloned()).collect();

        for recipient in 0..self.islands.len() {
            let donors: Vec<usize> = (0..self.islands.len())
                .filter(|&i| i != recipient && bests[i].is_some())
                .collect();
            let Some(&donor) = donors.choose(&mut self.rng) else {
                continue;
            };
            let migrant = bests[donor].clone().unwrap();
            debug!(
                "epoch {epoch}: island {donor} -> island {recipient}: [{}]",
                migrant.army().composition()
            );
            self.islands[recipient].population.push(migrant);
        }
    }

    fn global_best(&self) -> Option<&Individual> {
        self.islands
            .iter()
            .filter_map(|island| island.best())
            .max_by_key(|i| i.fitness())
    }
}

/// Convenience constructor: `count` islands with identical parameters and
/// seeds derived from `base_seed`.
pub fn islands_from_seeds<F>(count: usize, base_seed: u64, mut build: F) -> Vec<Island>
where
    F: FnMut(u64) -> Island,
{
    let mut seeder = Pcg64::seed_from_u64(base_seed);
    (0..count).map(|_| build(seeder.random())).collect()
}
