//! Balance characterization: the same adaptive search run against many enemy
//! forces at once, to surface which unit types the game currently favors.

use std::collections::BTreeMap;
use std::time::Duration;

use log::info;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::army::{Army, UnitCatalog, UnitType};
use crate::individual::Individual;
use crate::operators::Mutation;
use crate::population::Population;
use crate::strategy::EvolutionStrategy;
use crate::{BattleOracle, EvolveError};

/// One opposing force to optimize against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub enemy: Army,
    /// Seed cost for the initial random populations.
    pub target_cost: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Track {
    scenario: Scenario,
    strategy: EvolutionStrategy,
    population: Population,
}

/// Evolves one population per scenario in lockstep, aggregating unit usage
/// across the per-scenario best solutions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSweep {
    tracks: Vec<Track>,
    generation: usize,
}

impl BalanceSweep {
    /// Builds one strategy+population pair per scenario. Strategy seeds are
    /// derived from `base_seed` so scenarios explore independently.
    pub fn new(
        catalog: &UnitCatalog,
        scenarios: Vec<Scenario>,
        mutations: Vec<Mutation>,
        parents_per_generation: usize,
        children_per_generation: usize,
        category_cap: usize,
        base_seed: u64,
    ) -> Self {
        assert!(!scenarios.is_empty(), "need at least one scenario");
        let mut seeder = Pcg64::seed_from_u64(base_seed);
        let tracks = scenarios
            .into_iter()
            .map(|scenario| {
                let seed: u64 = seeder.random();
                let mut strategy = EvolutionStrategy::new(
                    mutations.clone(),
                    parents_per_generation,
                    children_per_generation,
                    seed,
                );
                strategy.set_category_cap(category_cap);
                let mut rng = Pcg64::seed_from_u64(seed ^ 0x5eed);
                let population = Population::random(
                    catalog,
                    parents_per_generation,
                    scenario.target_cost,
                    &mut rng,
                );
                Track {
                    scenario,
                    strategy,
                    population,
                }
            })
            .collect();
        Self {
            tracks,
            generation: 0,
        }
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn scenario_names(&self) -> impl Iterator<Item = &str> {
        self.tracks.iter().map(|t| t.scenario.name.as_str())
    }

    /// Advances every scenario's population by one generation.
    pub fn step_all<O: BattleOracle>(
        &mut self,
        catalog: &UnitCatalog,
        oracle: &O,
        battle_timeout: Duration,
        worker_count: usize,
    ) -> Result<(), EvolveError> {
        for track in &mut self.tracks {
            let population =
                std::mem::replace(&mut track.population, Population::new(vec![]));
            track.population = track.strategy.step(
                population,
                &track.scenario.enemy,
                catalog,
                oracle,
                battle_timeout,
                worker_count,
            )?;
        }
        self.generation += 1;
        info!("balance sweep advanced to generation {}", self.generation);
        Ok(())
    }

    /// The current best individual for a named scenario.
    pub fn best_for(&self, name: &str) -> Option<&Individual> {
        self.tracks
            .iter()
            .find(|t| t.scenario.name == name)
            .and_then(|t| t.population.best())
    }

    /// Counts unit types across the best solution of every scenario,
    /// descending. Units the balance favors dominate this tally; units that
    /// never appear in any best solution are likely underpowered or
    /// overpriced.
    pub fn unit_usage(&self) -> Vec<(UnitType, u32)> {
        let mut counts: BTreeMap<UnitType, u32> = BTreeMap::new();
        for track in &self.tracks {
            if let Some(best) = track.population.best() {
                for placement in best.army().placements() {
                    *counts.entry(placement.unit).or_insert(0) += 1;
                }
            }
        }
        let mut usage: Vec<(UnitType, u32)> = counts.into_iter().collect();
        usage.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        usage
    }
}
