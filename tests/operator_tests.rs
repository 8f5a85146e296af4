use std::collections::BTreeMap;

use rand::prelude::SeedableRng;
use rand::Rng;
use rand_pcg::Pcg64;
use warband_genetics::army::generate_random_army;
use warband_genetics::operators::{Crossover, Mutation};
use warband_genetics::{Army, Placement, Position, Region, UnitCatalog, UnitType};

const SPEAR: UnitType = UnitType(1);
const KNIGHT: UnitType = UnitType(2);
const MAGE: UnitType = UnitType(3);

fn catalog() -> UnitCatalog {
    UnitCatalog::new(
        BTreeMap::from([(SPEAR, 100), (KNIGHT, 200), (MAGE, 300)]),
        Region::new(0.0, 0.0, 200.0, 200.0),
    )
}

fn random_army<R: Rng>(catalog: &UnitCatalog, size: usize, rng: &mut R) -> Army {
    let units = [SPEAR, KNIGHT, MAGE];
    Army::new(
        (0..size)
            .map(|_| {
                Placement::new(
                    units[rng.random_range(0..units.len())],
                    catalog.random_position(rng),
                )
            })
            .collect(),
    )
}

fn all_mutations() -> Vec<Mutation> {
    vec![
        Mutation::AddUnit,
        Mutation::RemoveUnit,
        Mutation::RandomizePosition,
        Mutation::RandomizeType { max_decrease: 200 },
        Mutation::PerturbPosition { sigma: 10.0 },
        Mutation::MoveNextToAlly { sigma: 20.0 },
        Mutation::ReplaceSubarmy { tolerance: 0 },
    ]
}

fn all_crossovers() -> [Crossover; 3] {
    [
        Crossover::SpatialSplit,
        Crossover::TypeExchange,
        Crossover::SinglePoint,
    ]
}

#[test]
fn every_operator_preserves_non_emptiness() {
    let catalog = catalog();
    let mutations = all_mutations();
    let crossovers = all_crossovers();
    let mut rng = Pcg64::seed_from_u64(99);

    for i in 0..1000 {
        let size = rng.random_range(1..=20);
        let army = random_army(&catalog, size, &mut rng);
        for mutation in &mutations {
            let result = mutation.apply(&army, &catalog, &mut rng);
            assert!(
                !result.is_empty(),
                "iteration {i}: {} emptied an army of size {size}",
                mutation.name()
            );
        }
        let other = random_army(&catalog, rng.random_range(1..=20), &mut rng);
        for crossover in &crossovers {
            let (left, right) = crossover.apply(&army, &other, &mut rng);
            assert!(!left.is_empty(), "{} emptied left child", crossover.name());
            assert!(!right.is_empty(), "{} emptied right child", crossover.name());
        }
    }
}

#[test]
fn replace_subarmy_preserves_the_point_budget_exactly() {
    let catalog = catalog();
    let op = Mutation::ReplaceSubarmy { tolerance: 0 };
    let mut rng = Pcg64::seed_from_u64(5);
    for _ in 0..200 {
        let army = random_army(&catalog, rng.random_range(1..=15), &mut rng);
        let before = army.points(&catalog);
        let after = op.apply(&army, &catalog, &mut rng).points(&catalog);
        assert_eq!(before, after);
    }
}

#[test]
fn remove_unit_is_a_no_op_on_single_unit_armies() {
    let catalog = catalog();
    let army = Army::new(vec![Placement::new(MAGE, Position::new(5.0, 5.0))]);
    let mut rng = Pcg64::seed_from_u64(1);
    for _ in 0..20 {
        assert_eq!(Mutation::RemoveUnit.apply(&army, &catalog, &mut rng), army);
    }
}

#[test]
fn randomize_type_never_raises_the_unit_cost() {
    let catalog = catalog();
    let op = Mutation::RandomizeType { max_decrease: 300 };
    let mut rng = Pcg64::seed_from_u64(11);
    for _ in 0..500 {
        let army = random_army(&catalog, rng.random_range(1..=10), &mut rng);
        let before = army.points(&catalog);
        let after = op.apply(&army, &catalog, &mut rng).points(&catalog);
        assert!(after <= before, "substitution raised cost {before} -> {after}");
    }
}

#[test]
fn randomize_type_without_cheaper_options_is_a_no_op() {
    let catalog = catalog();
    // The cheapest unit with max_decrease 0 has no legal substitute.
    let army = Army::new(vec![Placement::new(SPEAR, Position::new(1.0, 1.0))]);
    let op = Mutation::RandomizeType { max_decrease: 0 };
    let mut rng = Pcg64::seed_from_u64(3);
    assert_eq!(op.apply(&army, &catalog, &mut rng), army);
}

#[test]
fn crossover_with_an_empty_parent_copies_the_other() {
    let army = Army::new(vec![
        Placement::new(SPEAR, Position::new(1.0, 1.0)),
        Placement::new(KNIGHT, Position::new(2.0, 2.0)),
    ]);
    let empty = Army::new(vec![]);
    let mut rng = Pcg64::seed_from_u64(8);
    for crossover in all_crossovers() {
        let (left, right) = crossover.apply(&army, &empty, &mut rng);
        assert_eq!(left, army);
        assert_eq!(right, army);
        let (left, right) = crossover.apply(&empty, &empty, &mut rng);
        assert!(left.is_empty() && right.is_empty());
    }
}

#[test]
fn type_exchange_conserves_the_combined_placement_multiset() {
    let catalog = catalog();
    let mut rng = Pcg64::seed_from_u64(21);
    for _ in 0..100 {
        let a = random_army(&catalog, rng.random_range(1..=12), &mut rng);
        let b = random_army(&catalog, rng.random_range(1..=12), &mut rng);
        let (left, right) = Crossover::TypeExchange.apply(&a, &b, &mut rng);

        let mut parents: Vec<Placement> = a.placements().to_vec();
        parents.extend_from_slice(b.placements());
        parents.sort();
        let mut children: Vec<Placement> = left.placements().to_vec();
        children.extend_from_slice(right.placements());
        children.sort();
        assert_eq!(parents, children);
    }
}

#[test]
fn seeded_operators_replay_deterministically() {
    let catalog = catalog();
    let army = random_army(&catalog, 10, &mut Pcg64::seed_from_u64(42));
    for mutation in all_mutations() {
        let a = mutation.apply(&army, &catalog, &mut Pcg64::seed_from_u64(7));
        let b = mutation.apply(&army, &catalog, &mut Pcg64::seed_from_u64(7));
        assert_eq!(a, b, "{} is not replayable", mutation.name());
    }
}

#[test]
fn random_army_generation_respects_the_tolerance_window() {
    let catalog = catalog();
    let mut rng = Pcg64::seed_from_u64(13);
    for _ in 0..100 {
        let army = generate_random_army(&catalog, 900, 100, &mut rng);
        let points = army.points(&catalog);
        assert!((800..=900).contains(&points), "got {points}");
    }
}
