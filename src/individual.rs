//! An army paired with its (possibly not-yet-computed) fitness.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::army::{Army, UnitCatalog};
use crate::fitness::Fitness;
use crate::{BattleOracle, EvolveError};

/// Evaluation state of an [`Individual`].
///
/// Unevaluated individuals are visible in the type system rather than hiding
/// behind a nullable field. A fitness, once present, is bound to the enemy it
/// was computed against and is never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Evaluation {
    Unevaluated,
    Evaluated {
        fitness: Fitness,
        /// Hash of the enemy army the fitness was computed against.
        enemy_fingerprint: u64,
    },
}

fn fingerprint(army: &Army) -> u64 {
    let mut hasher = DefaultHasher::new();
    army.hash(&mut hasher);
    hasher.finish()
}

/// One candidate solution inside a population.
///
/// Identity (equality, hashing, dedup) is by canonical army only; fitness is
/// derived state. The point cost is cached at construction so selection never
/// re-walks the placement list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Individual {
    army: Army,
    points: u32,
    evaluation: Evaluation,
}

impl PartialEq for Individual {
    fn eq(&self, other: &Self) -> bool {
        self.army == other.army
    }
}

impl Eq for Individual {}

impl Hash for Individual {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.army.hash(state);
    }
}

impl Individual {
    /// # Panics
    ///
    /// Panics if `army` is empty. An empty army can only come from a buggy
    /// operator, and degrading it silently would corrupt selection.
    pub fn new(army: Army, catalog: &UnitCatalog) -> Self {
        assert!(
            !army.is_empty(),
            "refusing to construct an individual from an empty army"
        );
        let points = army.points(catalog);
        Self {
            army,
            points,
            evaluation: Evaluation::Unevaluated,
        }
    }

    pub fn army(&self) -> &Army {
        &self.army
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn evaluation(&self) -> &Evaluation {
        &self.evaluation
    }

    pub fn needs_evaluation(&self) -> bool {
        matches!(self.evaluation, Evaluation::Unevaluated)
    }

    /// The memoized fitness.
    ///
    /// # Panics
    ///
    /// Panics if the individual has not been evaluated. Reading fitness
    /// before evaluation is a programming error, not a runtime condition.
    pub fn fitness(&self) -> Fitness {
        match &self.evaluation {
            Evaluation::Evaluated { fitness, .. } => *fitness,
            Evaluation::Unevaluated => panic!(
                "fitness read before evaluation for army [{}]",
                self.army.composition()
            ),
        }
    }

    /// Simulates this army against `enemy` and memoizes the result.
    ///
    /// Calls the oracle exactly once per individual lifetime; repeat calls
    /// against the same enemy are no-op reads.
    ///
    /// # Panics
    ///
    /// Panics if the individual was previously evaluated against a different
    /// enemy army. A fitness is only meaningful for the enemy it was computed
    /// against, which must stay fixed within one run.
    pub fn evaluate<O: BattleOracle + ?Sized>(
        &mut self,
        enemy: &Army,
        oracle: &O,
        battle_timeout: Duration,
    ) -> Result<Fitness, EvolveError> {
        let enemy_fingerprint = fingerprint(enemy);
        if let Evaluation::Evaluated {
            fitness,
            enemy_fingerprint: bound,
        } = &self.evaluation
        {
            assert!(
                *bound == enemy_fingerprint,
                "army [{}] was already evaluated against a different enemy",
                self.army.composition()
            );
            return Ok(*fitness);
        }

        let report = oracle
            .simulate(&self.army, enemy, battle_timeout)
            .map_err(|source| EvolveError::Oracle {
                composition: self.army.composition().to_string(),
                source,
            })?;
        let fitness = Fitness::new(
            report.outcome,
            self.points,
            report.ally_health,
            report.enemy_health,
        );
        self.evaluation = Evaluation::Evaluated {
            fitness,
            enemy_fingerprint,
        };
        Ok(fitness)
    }
}
