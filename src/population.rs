//! Generation-scoped collections of individuals with batch evaluation.

use std::collections::HashSet;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::army::{Army, Composition, UnitCatalog, generate_random_army};
use crate::individual::Individual;
use crate::{BattleOracle, EvolveError};

/// Default random-army cost slack when seeding populations, matching the
/// original solver's generator.
const SEED_TOLERANCE: u32 = 100;

/// An unordered collection of individuals, rebuilt each generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Population {
    individuals: Vec<Individual>,
}

impl Population {
    pub fn new(individuals: Vec<Individual>) -> Self {
        Self { individuals }
    }

    /// Seeds a population of `size` random armies costing roughly
    /// `target_cost` points each.
    pub fn random<R: Rng + ?Sized>(
        catalog: &UnitCatalog,
        size: usize,
        target_cost: u32,
        rng: &mut R,
    ) -> Self {
        let individuals = (0..size)
            .map(|_| {
                let army = generate_random_army(catalog, target_cost, SEED_TOLERANCE, rng);
                Individual::new(army, catalog)
            })
            .collect();
        Self { individuals }
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn into_individuals(self) -> Vec<Individual> {
        self.individuals
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn push(&mut self, individual: Individual) {
        self.individuals.push(individual);
    }

    /// Evaluates every unevaluated individual against `enemy`, distributing
    /// the oracle calls across `worker_count` workers.
    ///
    /// Idempotent: individuals that already carry a fitness are skipped, so
    /// elitist parents are never re-simulated. Fails the whole batch on the
    /// first oracle error.
    #[cfg(feature = "parallel")]
    pub fn evaluate<O: BattleOracle>(
        &mut self,
        enemy: &Army,
        oracle: &O,
        battle_timeout: Duration,
        worker_count: usize,
    ) -> Result<(), EvolveError> {
        use rayon::prelude::*;

        let pending = self.individuals.iter().filter(|i| i.needs_evaluation()).count();
        if pending == 0 {
            return Ok(());
        }
        if pending == 1 || worker_count <= 1 {
            // Not worth spinning a pool up for.
            for ind in &mut self.individuals {
                if ind.needs_evaluation() {
                    ind.evaluate(enemy, oracle, battle_timeout)?;
                }
            }
            return Ok(());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_count)
            .build()
            .expect("failed to build evaluation worker pool");
        pool.install(|| {
            self.individuals
                .par_iter_mut()
                .filter(|i| i.needs_evaluation())
                .try_for_each(|ind| ind.evaluate(enemy, oracle, battle_timeout).map(|_| ()))
        })
    }

    #[cfg(not(feature = "parallel"))]
    pub fn evaluate<O: BattleOracle>(
        &mut self,
        enemy: &Army,
        oracle: &O,
        battle_timeout: Duration,
        _worker_count: usize,
    ) -> Result<(), EvolveError> {
        for ind in &mut self.individuals {
            if ind.needs_evaluation() {
                ind.evaluate(enemy, oracle, battle_timeout)?;
            }
        }
        Ok(())
    }

    /// The single best evaluated individual, if any.
    pub fn best(&self) -> Option<&Individual> {
        self.individuals
            .iter()
            .filter(|i| !i.needs_evaluation())
            .max_by_key(|i| i.fitness())
    }

    /// The winning individuals at the minimum winning point cost, one per
    /// distinct composition, ordered by descending remaining team health.
    ///
    /// When nothing wins, falls back to the single overall-best individual so
    /// callers always get a best-effort answer.
    ///
    /// # Panics
    ///
    /// Panics if any individual is unevaluated.
    pub fn best_individuals(&self) -> Vec<&Individual> {
        let best_points = self
            .individuals
            .iter()
            .filter(|i| i.fitness().outcome.is_win())
            .map(|i| i.points())
            .min();

        let Some(best_points) = best_points else {
            return self.best().into_iter().collect();
        };

        let mut seen: HashSet<Composition> = HashSet::new();
        let mut winners: Vec<&Individual> = self
            .individuals
            .iter()
            .filter(|i| i.fitness().outcome.is_win() && i.points() == best_points)
            .filter(|i| seen.insert(i.army().composition()))
            .collect();
        winners.sort_by(|a, b| {
            b.fitness()
                .team_health
                .total_cmp(&a.fitness().team_health)
        });
        winners
    }
}
