//! Candidate solution representation: unit placements and the catalog of
//! purchasable units.
//!
//! An [`Army`] is a canonicalized sequence of [`Placement`]s. Canonicalization
//! (sorting at construction) makes structurally identical armies compare and
//! hash equal regardless of the order operators emitted their placements,
//! which is what lets populations deduplicate offspring by value.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

/// Opaque identifier for a unit kind. Point costs live in the
/// [`UnitCatalog`], not on the type itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitType(pub u16);

/// A 2-D battlefield coordinate.
///
/// `Eq`/`Hash` go through the raw bit patterns and `Ord` through
/// [`f32::total_cmp`], so positions participate in army canonicalization
/// without any float-comparison surprises.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.x.to_bits() == other.x.to_bits() && self.y.to_bits() == other.y.to_bits()
    }
}

impl Eq for Position {}

impl Hash for Position {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.x.to_bits().hash(state);
        self.y.to_bits().hash(state);
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.x
            .total_cmp(&other.x)
            .then_with(|| self.y.total_cmp(&other.y))
    }
}

/// One unit standing at one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub unit: UnitType,
    pub position: Position,
}

impl Placement {
    pub fn new(unit: UnitType, position: Position) -> Self {
        Self { unit, position }
    }
}

/// Axis-aligned rectangle of legal placement coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Region {
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        assert!(
            min_x <= max_x && min_y <= max_y,
            "degenerate placement region"
        );
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Position {
        Position::new(
            rng.random_range(self.min_x..=self.max_x),
            rng.random_range(self.min_y..=self.max_y),
        )
    }
}

/// The external lookup table the engine searches over: which unit types are
/// legal, what each costs, and where units may be placed.
///
/// The catalog is supplied alongside the battle oracle and never mutated by
/// the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitCatalog {
    costs: BTreeMap<UnitType, u32>,
    region: Region,
}

impl UnitCatalog {
    /// # Panics
    ///
    /// Panics if `costs` is empty or contains a zero-cost unit (a free unit
    /// would let the random-army walk below spin forever).
    pub fn new(costs: BTreeMap<UnitType, u32>, region: Region) -> Self {
        assert!(!costs.is_empty(), "unit catalog must not be empty");
        assert!(
            costs.values().all(|&c| c > 0),
            "unit costs must be positive"
        );
        Self { costs, region }
    }

    pub fn cost(&self, unit: UnitType) -> u32 {
        *self
            .costs
            .get(&unit)
            .unwrap_or_else(|| panic!("unit type {unit:?} is not in the catalog"))
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn unit_types(&self) -> impl Iterator<Item = UnitType> + '_ {
        self.costs.keys().copied()
    }

    pub fn random_unit<R: Rng + ?Sized>(&self, rng: &mut R) -> UnitType {
        let types: Vec<UnitType> = self.costs.keys().copied().collect();
        *types.choose(rng).unwrap()
    }

    pub fn random_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Position {
        self.region.sample(rng)
    }
}

/// Canonicalized multiset of unit types: the "composition shape" of an army.
///
/// Two armies with the same unit counts share a composition even when their
/// placements differ. This is the category key for diversity-capped selection
/// and for deduplicating `best_individuals`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Composition(Vec<(UnitType, u32)>);

impl Composition {
    pub fn counts(&self) -> &[(UnitType, u32)] {
        &self.0
    }
}

impl std::fmt::Display for Composition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (unit, count) in &self.0 {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{count}x unit {}", unit.0)?;
            first = false;
        }
        Ok(())
    }
}

/// A candidate solution: a multiset of unit placements, stored sorted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Army {
    placements: Vec<Placement>,
}

impl Army {
    /// Builds an army from placements in any order. The stored sequence is
    /// sorted, so any permutation of the same placements yields an equal,
    /// equal-hash army.
    pub fn new(mut placements: Vec<Placement>) -> Self {
        placements.sort();
        Self { placements }
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Total point cost under the given catalog.
    pub fn points(&self, catalog: &UnitCatalog) -> u32 {
        self.placements.iter().map(|p| catalog.cost(p.unit)).sum()
    }

    /// The unit-type multiset signature of this army.
    pub fn composition(&self) -> Composition {
        let mut counts: BTreeMap<UnitType, u32> = BTreeMap::new();
        for p in &self.placements {
            *counts.entry(p.unit).or_insert(0) += 1;
        }
        Composition(counts.into_iter().collect())
    }
}

/// Generates a random army whose total cost lands in
/// `[target_cost - tolerance, target_cost]`.
///
/// Random add/remove walk: add random units while under budget, drop a random
/// unit when over. Every reachable total is a sum of catalog costs, so with
/// `tolerance = 0` the walk still terminates at exactly `target_cost`
/// whenever `target_cost` is itself such a sum (which it always is when the
/// target came from an existing army, as in `ReplaceSubarmy`).
///
/// # Panics
///
/// Panics if `target_cost` is 0 (every army must keep at least one unit).
pub fn generate_random_army<R: Rng + ?Sized>(
    catalog: &UnitCatalog,
    target_cost: u32,
    tolerance: u32,
    rng: &mut R,
) -> Army {
    assert!(target_cost > 0, "cannot generate an army worth 0 points");
    let low = target_cost.saturating_sub(tolerance);

    let mut placements: Vec<Placement> = Vec::new();
    let mut current = 0u32;
    while !(low <= current && current <= target_cost) || placements.is_empty() {
        if current > target_cost {
            let idx = rng.random_range(0..placements.len());
            current -= catalog.cost(placements[idx].unit);
            placements.swap_remove(idx);
        } else {
            let unit = catalog.random_unit(rng);
            placements.push(Placement::new(unit, catalog.random_position(rng)));
            current += catalog.cost(unit);
        }
    }
    Army::new(placements)
}

