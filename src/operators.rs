//! Stateless mutation and crossover operators over armies.
//!
//! Every operator has identical arity, so each family is a closed enum
//! dispatched through a single `apply` entry point instead of a trait
//! hierarchy. Operators are pure: randomness is the only source of
//! non-determinism, so a seeded RNG replays a run exactly.
//!
//! Invariant: no operator ever returns an empty army. Operators that cannot
//! act without emptying their input (or have no legal alternative) return the
//! input unchanged.

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::army::{Army, Placement, Position, UnitCatalog, UnitType, generate_random_army};

/// How many times a crossover re-rolls before giving up and handing back
/// copies of the parents.
const CROSSOVER_ATTEMPTS: usize = 16;

/// A pure `Army -> Army` transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Mutation {
    /// Insert one random legal unit at a random position.
    AddUnit,
    /// Delete one random placement. No-op on single-unit armies.
    RemoveUnit,
    /// Replace one placement's position with a fresh legal one.
    RandomizePosition,
    /// Replace one placement's unit type with another costing between
    /// `original - max_decrease` and `original`. No-op when nothing
    /// qualifies.
    RandomizeType { max_decrease: u32 },
    /// Gaussian jitter with the given standard deviation, independently per
    /// axis.
    PerturbPosition { sigma: f32 },
    /// Relocate one unit near a randomly chosen other ally (which may be
    /// itself), at Gaussian distance `sigma`.
    MoveNextToAlly { sigma: f32 },
    /// Shuffle, keep a random prefix, and regenerate the discarded cost with
    /// fresh random units. `tolerance = 0` restores the point total exactly.
    ReplaceSubarmy { tolerance: u32 },
}

impl Mutation {
    /// Stable name for diagnostics and rate reporting.
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::AddUnit => "add_unit",
            Mutation::RemoveUnit => "remove_unit",
            Mutation::RandomizePosition => "randomize_position",
            Mutation::RandomizeType { .. } => "randomize_type",
            Mutation::PerturbPosition { .. } => "perturb_position",
            Mutation::MoveNextToAlly { .. } => "move_next_to_ally",
            Mutation::ReplaceSubarmy { .. } => "replace_subarmy",
        }
    }

    pub fn apply<R: Rng + ?Sized>(
        &self,
        army: &Army,
        catalog: &UnitCatalog,
        rng: &mut R,
    ) -> Army {
        let result = match self {
            Mutation::AddUnit => add_unit(army, catalog, rng),
            Mutation::RemoveUnit => remove_unit(army, rng),
            Mutation::RandomizePosition => randomize_position(army, catalog, rng),
            Mutation::RandomizeType { max_decrease } => {
                randomize_type(army, catalog, *max_decrease, rng)
            }
            Mutation::PerturbPosition { sigma } => perturb_position(army, *sigma, rng),
            Mutation::MoveNextToAlly { sigma } => move_next_to_ally(army, *sigma, rng),
            Mutation::ReplaceSubarmy { tolerance } => {
                replace_subarmy(army, catalog, *tolerance, rng)
            }
        };
        debug_assert!(
            !result.is_empty(),
            "mutation {} produced an empty army",
            self.name()
        );
        result
    }
}

fn add_unit<R: Rng + ?Sized>(army: &Army, catalog: &UnitCatalog, rng: &mut R) -> Army {
    let mut placements = army.placements().to_vec();
    placements.push(Placement::new(
        catalog.random_unit(rng),
        catalog.random_position(rng),
    ));
    Army::new(placements)
}

fn remove_unit<R: Rng + ?Sized>(army: &Army, rng: &mut R) -> Army {
    if army.len() <= 1 {
        return army.clone();
    }
    let mut placements = army.placements().to_vec();
    let idx = rng.random_range(0..placements.len());
    placements.remove(idx);
    Army::new(placements)
}

fn randomize_position<R: Rng + ?Sized>(army: &Army, catalog: &UnitCatalog, rng: &mut R) -> Army {
    let mut placements = army.placements().to_vec();
    let idx = rng.random_range(0..placements.len());
    placements[idx].position = catalog.random_position(rng);
    Army::new(placements)
}

fn randomize_type<R: Rng + ?Sized>(
    army: &Army,
    catalog: &UnitCatalog,
    max_decrease: u32,
    rng: &mut R,
) -> Army {
    let mut placements = army.placements().to_vec();
    let idx = rng.random_range(0..placements.len());
    let current = catalog.cost(placements[idx].unit);
    let floor = current.saturating_sub(max_decrease);
    let options: Vec<UnitType> = catalog
        .unit_types()
        .filter(|&u| u != placements[idx].unit && (floor..=current).contains(&catalog.cost(u)))
        .collect();
    match options.choose(rng) {
        Some(&unit) => {
            placements[idx].unit = unit;
            Army::new(placements)
        }
        None => army.clone(),
    }
}

fn perturb_position<R: Rng + ?Sized>(army: &Army, sigma: f32, rng: &mut R) -> Army {
    let noise = Normal::new(0.0, sigma).expect("sigma must be finite and non-negative");
    let mut placements = army.placements().to_vec();
    let idx = rng.random_range(0..placements.len());
    let position = placements[idx].position;
    placements[idx].position =
        Position::new(position.x + noise.sample(rng), position.y + noise.sample(rng));
    Army::new(placements)
}

fn move_next_to_ally<R: Rng + ?Sized>(army: &Army, sigma: f32, rng: &mut R) -> Army {
    let mut placements = army.placements().to_vec();
    let idx = rng.random_range(0..placements.len());
    let anchor = placements[rng.random_range(0..placements.len())].position;
    let x = Normal::new(anchor.x, sigma).expect("sigma must be finite and non-negative");
    let y = Normal::new(anchor.y, sigma).expect("sigma must be finite and non-negative");
    placements[idx].position = Position::new(x.sample(rng), y.sample(rng));
    Army::new(placements)
}

fn replace_subarmy<R: Rng + ?Sized>(
    army: &Army,
    catalog: &UnitCatalog,
    tolerance: u32,
    rng: &mut R,
) -> Army {
    let original_points = army.points(catalog);
    let mut kept = army.placements().to_vec();
    kept.shuffle(rng);
    kept.truncate(rng.random_range(0..kept.len()));
    let kept_points: u32 = kept.iter().map(|p| catalog.cost(p.unit)).sum();

    let fresh = generate_random_army(catalog, original_points - kept_points, tolerance, rng);
    kept.extend_from_slice(fresh.placements());
    Army::new(kept)
}

/// A pure `(Army, Army) -> (Army, Army)` recombination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crossover {
    /// Partition both parents' units by a dividing line through the two
    /// parent centroids.
    SpatialSplit,
    /// Swap whole unit-type groups between parents, one coin flip per type.
    TypeExchange,
    /// Splice each parent at an independent random index.
    SinglePoint,
}

impl Crossover {
    pub fn name(&self) -> &'static str {
        match self {
            Crossover::SpatialSplit => "spatial_split",
            Crossover::TypeExchange => "type_exchange",
            Crossover::SinglePoint => "single_point",
        }
    }

    /// Recombines two parents into two children, retrying up to a fixed
    /// bound until both children are non-empty.
    ///
    /// Edge cases: with one empty parent, both children copy the non-empty
    /// one; with both empty, both children are empty. If every attempt
    /// produces an empty child (degenerate splits on tiny parents), the
    /// children are copies of the parents.
    pub fn apply<R: Rng + ?Sized>(&self, a: &Army, b: &Army, rng: &mut R) -> (Army, Army) {
        match (a.is_empty(), b.is_empty()) {
            (true, true) => return (a.clone(), b.clone()),
            (true, false) => return (b.clone(), b.clone()),
            (false, true) => return (a.clone(), a.clone()),
            (false, false) => {}
        }
        for _ in 0..CROSSOVER_ATTEMPTS {
            let (left, right) = match self {
                Crossover::SpatialSplit => spatial_split(a, b, rng),
                Crossover::TypeExchange => type_exchange(a, b, rng),
                Crossover::SinglePoint => single_point(a, b, rng),
            };
            if !left.is_empty() && !right.is_empty() {
                return (left, right);
            }
        }
        (a.clone(), b.clone())
    }
}

fn centroid(placements: &[Placement]) -> (f32, f32) {
    let n = placements.len() as f32;
    let (sx, sy) = placements.iter().fold((0.0, 0.0), |(sx, sy), p| {
        (sx + p.position.x, sy + p.position.y)
    });
    (sx / n, sy / n)
}

fn spatial_split<R: Rng + ?Sized>(a: &Army, b: &Army, _rng: &mut R) -> (Army, Army) {
    let c1 = centroid(a.placements());
    let c2 = centroid(b.placements());

    let mut left = Vec::new();
    let mut right = Vec::new();
    // Units below the line through both centroids follow their parent's
    // side; a vertical split handles coincident x.
    let mut split = |placements: &[Placement], below_to_left: bool| {
        for &p in placements {
            let below = if c1.0 == c2.0 {
                p.position.x < c1.0
            } else {
                let slope = (c2.1 - c1.1) / (c2.0 - c1.0);
                let intercept = c1.1 - slope * c1.0;
                p.position.y < slope * p.position.x + intercept
            };
            if below == below_to_left {
                left.push(p);
            } else {
                right.push(p);
            }
        }
    };
    split(a.placements(), true);
    split(b.placements(), false);
    (Army::new(left), Army::new(right))
}

fn type_exchange<R: Rng + ?Sized>(a: &Army, b: &Army, rng: &mut R) -> (Army, Army) {
    let mut types: Vec<UnitType> = a
        .placements()
        .iter()
        .chain(b.placements())
        .map(|p| p.unit)
        .collect();
    types.sort();
    types.dedup();

    let mut left = Vec::new();
    let mut right = Vec::new();
    for unit in types {
        let keep = rng.random_bool(0.5);
        for &p in a.placements().iter().filter(|p| p.unit == unit) {
            if keep {
                left.push(p);
            } else {
                right.push(p);
            }
        }
        for &p in b.placements().iter().filter(|p| p.unit == unit) {
            if keep {
                right.push(p);
            } else {
                left.push(p);
            }
        }
    }
    (Army::new(left), Army::new(right))
}

fn single_point<R: Rng + ?Sized>(a: &Army, b: &Army, rng: &mut R) -> (Army, Army) {
    let cut_a = rng.random_range(0..=a.len());
    let cut_b = rng.random_range(0..=b.len());
    let mut left = a.placements()[..cut_a].to_vec();
    left.extend_from_slice(&b.placements()[cut_b..]);
    let mut right = b.placements()[..cut_b].to_vec();
    right.extend_from_slice(&a.placements()[cut_a..]);
    (Army::new(left), Army::new(right))
}
