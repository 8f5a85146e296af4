//! The self-adaptive (μ+λ) evolution step.
//!
//! [`EvolutionStrategy`] is a step function `Population -> Population` that
//! carries its own mutation-rate state forward between generations. Each
//! generation it:
//!
//! 1. grows a set-deduplicated working set of parents plus mutated children,
//!    choosing operators by weighted random draw;
//! 2. evaluates the combined set as one population;
//! 3. selects the next generation fitness-descending under a per-composition
//!    diversity cap;
//! 4. nudges each operator's weight by its observed child-beats-parent rate.
//!
//! Termination is the caller's job: run a fixed generation count, or pass a
//! deadline to [`EvolutionStrategy::run`].

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use log::{debug, warn};
use rand::prelude::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::army::{Army, Composition, UnitCatalog};
use crate::fitness::Fitness;
use crate::individual::Individual;
use crate::operators::Mutation;
use crate::population::Population;
use crate::{BattleOracle, EvolveError};

/// How a parent is drawn for each offspring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParentSelector {
    /// Uniform draw over the current population.
    Uniform,
    /// Best-of-`size` tournament by fitness. Requires the current population
    /// to be evaluated.
    Tournament { size: usize },
}

impl ParentSelector {
    fn select<'a, R: Rng + ?Sized>(
        &self,
        individuals: &'a [Individual],
        rng: &mut R,
    ) -> &'a Individual {
        match self {
            ParentSelector::Uniform => individuals.choose(rng).unwrap(),
            ParentSelector::Tournament { size } => {
                assert!(*size > 0, "tournament size must be positive");
                individuals
                    .choose_multiple(rng, (*size).min(individuals.len()))
                    .max_by_key(|i| i.fitness())
                    .unwrap()
            }
        }
    }
}

/// Per-operator weights plus the adaptation bookkeeping for one generation.
///
/// Owned exclusively by one strategy instance; islands never share rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationRates {
    operators: Vec<Mutation>,
    weights: Vec<f64>,
}

impl MutationRates {
    fn new(operators: Vec<Mutation>) -> Self {
        assert!(!operators.is_empty(), "at least one mutation is required");
        let uniform = 1.0 / operators.len() as f64;
        let weights = vec![uniform; operators.len()];
        Self { operators, weights }
    }

    pub fn operators(&self) -> &[Mutation] {
        &self.operators
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        use rand::distr::Distribution;
        let dist = rand::distr::weighted::WeightedIndex::new(&self.weights)
            .expect("mutation weights must stay positive");
        dist.sample(rng)
    }

    /// Multiplicative update from one generation's success tallies. The `+1`
    /// in the denominator damps operators tried only a handful of times.
    fn adapt(&mut self, adaptation_rate: f64, successes: &[u32], trials: &[u32]) {
        for (idx, weight) in self.weights.iter_mut().enumerate() {
            let s = f64::from(successes[idx]);
            let f = f64::from(trials[idx] - successes[idx]);
            *weight *= 1.0 + adaptation_rate * (s - f) / (s + f + 1.0);
        }
    }
}

/// One recorded operator application, resolved against fitness after the
/// combined evaluation.
struct Trial {
    operator: usize,
    parent: Army,
    child: Army,
}

/// Self-adaptive (μ+λ) evolution with diversity-capped selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStrategy {
    rates: MutationRates,
    selector: ParentSelector,
    parents_per_generation: usize,
    children_per_generation: usize,
    adaptation_rate: f64,
    category_cap: usize,
    mutations_per_child: usize,
    rng: Pcg64,
}

impl EvolutionStrategy {
    pub fn new(
        mutations: Vec<Mutation>,
        parents_per_generation: usize,
        children_per_generation: usize,
        seed: u64,
    ) -> Self {
        assert!(parents_per_generation > 0, "need at least one parent");
        assert!(children_per_generation > 0, "need at least one child");
        Self {
            rates: MutationRates::new(mutations),
            selector: ParentSelector::Uniform,
            parents_per_generation,
            children_per_generation,
            adaptation_rate: 0.1,
            category_cap: parents_per_generation,
            mutations_per_child: 1,
            rng: Pcg64::seed_from_u64(seed),
        }
    }

    pub fn set_selector(&mut self, selector: ParentSelector) {
        self.selector = selector;
    }

    pub fn set_adaptation_rate(&mut self, rate: f64) {
        self.adaptation_rate = rate;
    }

    /// Maximum individuals sharing one composition admitted per generation.
    pub fn set_category_cap(&mut self, cap: usize) {
        assert!(cap > 0, "category cap must be positive");
        self.category_cap = cap;
    }

    /// Number of chained mutations applied per offspring (default 1). Every
    /// operator in the chain is credited with the final child's outcome.
    pub fn set_mutations_per_child(&mut self, n: usize) {
        assert!(n > 0, "at least one mutation per child");
        self.mutations_per_child = n;
    }

    pub fn rates(&self) -> &MutationRates {
        &self.rates
    }

    pub fn parents_per_generation(&self) -> usize {
        self.parents_per_generation
    }

    /// Advances the population by one generation.
    ///
    /// The returned population is fully evaluated against `enemy`, which must
    /// stay fixed across every step of one run.
    pub fn step<O: BattleOracle>(
        &mut self,
        population: Population,
        enemy: &Army,
        catalog: &UnitCatalog,
        oracle: &O,
        battle_timeout: Duration,
        worker_count: usize,
    ) -> Result<Population, EvolveError> {
        assert!(!population.is_empty(), "cannot evolve an empty population");
        let target = self.parents_per_generation + self.children_per_generation;
        let mut working: Vec<Individual> = population.into_individuals();
        let mut seen: HashSet<Army> = working.iter().map(|i| i.army().clone()).collect();
        let parent_count = working.len();

        // 1. Offspring generation. Parents are pre-seeded members of the
        // working set, so the exact current generation competes for survival.
        let mut trials: Vec<Trial> = Vec::new();
        let mut attempts = 0usize;
        let attempt_cap = 50 * target.max(1);
        while seen.len() < target {
            attempts += 1;
            if attempts > attempt_cap {
                warn!(
                    "operator pool produced only {} of {} distinct offspring; \
                     continuing with a short generation",
                    seen.len(),
                    target
                );
                break;
            }
            let parent = self.selector.select(&working[..parent_count], &mut self.rng);
            let parent_army = parent.army().clone();

            let mut child_army = parent_army.clone();
            let mut applied = Vec::with_capacity(self.mutations_per_child);
            for _ in 0..self.mutations_per_child {
                let op = self.rates.choose(&mut self.rng);
                child_army = self.rates.operators()[op].apply(&child_army, catalog, &mut self.rng);
                applied.push(op);
            }
            if !seen.insert(child_army.clone()) {
                continue;
            }
            for op in applied {
                trials.push(Trial {
                    operator: op,
                    parent: parent_army.clone(),
                    child: child_army.clone(),
                });
            }
            working.push(Individual::new(child_army, catalog));
        }

        // 2. Evaluate parents and children as one population. Parents that
        // already carry a fitness are skipped.
        let mut combined = Population::new(working);
        combined.evaluate(enemy, oracle, battle_timeout, worker_count)?;

        // 3. Diversity-capped survivor selection.
        let mut ranked: Vec<&Individual> = combined.individuals().iter().collect();
        ranked.sort_by(|a, b| b.fitness().cmp(&a.fitness()));
        let mut category_counts: HashMap<Composition, usize> = HashMap::new();
        let mut survivors: Vec<Individual> = Vec::with_capacity(self.parents_per_generation);
        for individual in ranked {
            let count = category_counts
                .entry(individual.army().composition())
                .or_insert(0);
            if *count < self.category_cap {
                survivors.push(individual.clone());
                *count += 1;
            }
            if survivors.len() >= self.parents_per_generation {
                break;
            }
        }

        // 4. Operator-weight adaptation from this generation's trials.
        let by_army: HashMap<&Army, Fitness> = combined
            .individuals()
            .iter()
            .map(|i| (i.army(), i.fitness()))
            .collect();
        let n_ops = self.rates.operators().len();
        let mut successes = vec![0u32; n_ops];
        let mut counts = vec![0u32; n_ops];
        for trial in &trials {
            counts[trial.operator] += 1;
            if by_army[&trial.child] > by_army[&trial.parent] {
                successes[trial.operator] += 1;
            }
        }
        self.rates.adapt(self.adaptation_rate, &successes, &counts);
        if log::log_enabled!(log::Level::Debug) {
            for (op, weight) in self.rates.operators().iter().zip(self.rates.weights()) {
                debug!("operator {} weight {:.4}", op.name(), weight);
            }
        }

        Ok(Population::new(survivors))
    }

    /// Runs up to `generations` steps, stopping early (without error) once
    /// `deadline` passes. The population returned is the last completed
    /// generation.
    pub fn run<O: BattleOracle>(
        &mut self,
        mut population: Population,
        enemy: &Army,
        catalog: &UnitCatalog,
        oracle: &O,
        battle_timeout: Duration,
        worker_count: usize,
        generations: usize,
        deadline: Option<Instant>,
    ) -> Result<Population, EvolveError> {
        for generation in 0..generations {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                debug!("deadline reached after {generation} generations");
                break;
            }
            population = self.step(
                population,
                enemy,
                catalog,
                oracle,
                battle_timeout,
                worker_count,
            )?;
        }
        Ok(population)
    }
}
