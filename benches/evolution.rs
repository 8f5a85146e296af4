use std::collections::BTreeMap;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::prelude::SeedableRng;
use rand_pcg::Pcg64;
use warband_genetics::army::generate_random_army;
use warband_genetics::operators::{Crossover, Mutation};
use warband_genetics::strategy::EvolutionStrategy;
use warband_genetics::{
    Army, BattleOracle, BattleOutcome, BattleReport, OracleError, Population, Region, UnitCatalog,
    UnitType,
};

// =============================================================================
// Common fixtures
// =============================================================================

fn catalog() -> UnitCatalog {
    UnitCatalog::new(
        BTreeMap::from([
            (UnitType(1), 100),
            (UnitType(2), 150),
            (UnitType(3), 200),
            (UnitType(4), 300),
        ]),
        Region::new(0.0, 0.0, 500.0, 500.0),
    )
}

/// Zero-cost stand-in for a real simulator: wins below a fixed budget, with
/// phantom health derived from points. Keeps the benchmarks measuring engine
/// overhead rather than simulation time.
struct BudgetOracle {
    catalog: UnitCatalog,
    limit: u32,
}

impl BattleOracle for BudgetOracle {
    fn simulate(
        &self,
        allies: &Army,
        _enemies: &Army,
        _timeout: Duration,
    ) -> Result<BattleReport, OracleError> {
        let points = allies.points(&self.catalog);
        if points <= self.limit {
            Ok(BattleReport {
                outcome: BattleOutcome::Win,
                ally_health: 1000.0 - points as f32,
                enemy_health: 0.0,
            })
        } else {
            Ok(BattleReport {
                outcome: BattleOutcome::Loss,
                ally_health: 0.0,
                enemy_health: points as f32,
            })
        }
    }
}

fn mutations() -> Vec<Mutation> {
    vec![
        Mutation::AddUnit,
        Mutation::RemoveUnit,
        Mutation::RandomizeType { max_decrease: 200 },
        Mutation::RandomizePosition,
        Mutation::PerturbPosition { sigma: 25.0 },
        Mutation::MoveNextToAlly { sigma: 25.0 },
        Mutation::ReplaceSubarmy { tolerance: 100 },
    ]
}

fn enemy() -> Army {
    let mut rng = Pcg64::seed_from_u64(7);
    generate_random_army(&catalog(), 1000, 0, &mut rng)
}

// =============================================================================
// Strategy step benchmarks
// =============================================================================

fn bench_strategy_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("EvolutionStrategy/step");
    let catalog = catalog();
    let enemy = enemy();
    let oracle = BudgetOracle {
        catalog: catalog.clone(),
        limit: 800,
    };

    for pop_size in [10, 25, 50, 100].iter() {
        group.throughput(Throughput::Elements(*pop_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(pop_size),
            pop_size,
            |b, &size| {
                let mut rng = Pcg64::seed_from_u64(42);
                let population = Population::random(&catalog, size, 1000, &mut rng);
                b.iter_batched(
                    || {
                        (
                            EvolutionStrategy::new(mutations(), size, 2 * size, 42),
                            population.clone(),
                        )
                    },
                    |(mut strategy, population)| {
                        black_box(
                            strategy
                                .step(
                                    population,
                                    &enemy,
                                    &catalog,
                                    &oracle,
                                    Duration::from_secs(1),
                                    1,
                                )
                                .unwrap(),
                        )
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }
    group.finish();
}

fn bench_strategy_worker_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("EvolutionStrategy/workers");
    let catalog = catalog();
    let enemy = enemy();
    let oracle = BudgetOracle {
        catalog: catalog.clone(),
        limit: 800,
    };

    for workers in [1, 2, 4, 8].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(workers),
            workers,
            |b, &workers| {
                let mut rng = Pcg64::seed_from_u64(42);
                let population = Population::random(&catalog, 50, 1000, &mut rng);
                b.iter_batched(
                    || {
                        (
                            EvolutionStrategy::new(mutations(), 50, 100, 42),
                            population.clone(),
                        )
                    },
                    |(mut strategy, population)| {
                        black_box(
                            strategy
                                .step(
                                    population,
                                    &enemy,
                                    &catalog,
                                    &oracle,
                                    Duration::from_secs(1),
                                    workers,
                                )
                                .unwrap(),
                        )
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }
    group.finish();
}

// =============================================================================
// Operator benchmarks
// =============================================================================

fn bench_mutations(c: &mut Criterion) {
    let mut group = c.benchmark_group("Mutation/apply");
    let catalog = catalog();
    let mut rng = Pcg64::seed_from_u64(42);
    let army = generate_random_army(&catalog, 2000, 0, &mut rng);

    for mutation in mutations() {
        group.bench_with_input(
            BenchmarkId::from_parameter(mutation.name()),
            &mutation,
            |b, mutation| {
                let mut rng = Pcg64::seed_from_u64(42);
                b.iter(|| black_box(mutation.apply(&army, &catalog, &mut rng)));
            },
        );
    }
    group.finish();
}

fn bench_crossovers(c: &mut Criterion) {
    let mut group = c.benchmark_group("Crossover/apply");
    let catalog = catalog();
    let mut rng = Pcg64::seed_from_u64(42);
    let left = generate_random_army(&catalog, 2000, 0, &mut rng);
    let right = generate_random_army(&catalog, 2000, 0, &mut rng);

    for crossover in [
        Crossover::SpatialSplit,
        Crossover::TypeExchange,
        Crossover::SinglePoint,
    ] {
        group.bench_with_input(
            BenchmarkId::from_parameter(crossover.name()),
            &crossover,
            |b, crossover| {
                let mut rng = Pcg64::seed_from_u64(42);
                b.iter(|| black_box(crossover.apply(&left, &right, &mut rng)));
            },
        );
    }
    group.finish();
}

// =============================================================================
// Representation benchmarks
// =============================================================================

fn bench_random_army(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_random_army");
    let catalog = catalog();

    for target in [500u32, 1000, 2000, 5000].iter() {
        group.throughput(Throughput::Elements(u64::from(*target / 100)));
        group.bench_with_input(BenchmarkId::from_parameter(target), target, |b, &target| {
            let mut rng = Pcg64::seed_from_u64(42);
            b.iter(|| black_box(generate_random_army(&catalog, target, 100, &mut rng)));
        });
    }
    group.finish();
}

fn bench_composition(c: &mut Criterion) {
    let mut group = c.benchmark_group("Army/composition");
    let catalog = catalog();

    for target in [500u32, 2000, 5000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(target), target, |b, &target| {
            let mut rng = Pcg64::seed_from_u64(42);
            let army = generate_random_army(&catalog, target, 100, &mut rng);
            b.iter(|| black_box(army.composition()));
        });
    }
    group.finish();
}

// =============================================================================
// Criterion setup
// =============================================================================

criterion_group!(
    strategy_benches,
    bench_strategy_step,
    bench_strategy_worker_scaling,
);

criterion_group!(operator_benches, bench_mutations, bench_crossovers);

criterion_group!(
    representation_benches,
    bench_random_army,
    bench_composition,
);

criterion_main!(strategy_benches, operator_benches, representation_benches);
