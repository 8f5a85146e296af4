use std::collections::BTreeMap;
use std::time::Duration;

use warband_genetics::island::{Island, IslandConfig, IslandSearch, islands_from_seeds};
use warband_genetics::operators::Mutation;
use warband_genetics::strategy::EvolutionStrategy;
use warband_genetics::{
    Army, BattleOracle, BattleOutcome, BattleReport, OracleError, Placement, Population, Position,
    Region, UnitCatalog, UnitType,
};

use rand::prelude::SeedableRng;
use rand_pcg::Pcg64;

const MILITIA: UnitType = UnitType(1);
const ARCHER: UnitType = UnitType(2);
const KNIGHT: UnitType = UnitType(3);

fn stats(unit: UnitType) -> (f32, f32, f32) {
    // (health, damage per round, attack range)
    match unit {
        MILITIA => (60.0, 8.0, 5.0),
        ARCHER => (40.0, 12.0, 60.0),
        KNIGHT => (140.0, 15.0, 5.0),
        other => panic!("unknown unit {other:?}"),
    }
}

/// A crude round-based battle: every living unit walks toward and strikes
/// its nearest living enemy once per round. Deterministic, so identical
/// armies always produce identical reports.
struct SkirmishOracle;

#[derive(Clone, Copy)]
struct Combatant {
    position: Position,
    health: f32,
    damage: f32,
    range: f32,
    team: usize,
}

const ROUND_LIMIT: usize = 200;
const MOVE_PER_ROUND: f32 = 10.0;

impl BattleOracle for SkirmishOracle {
    fn simulate(
        &self,
        allies: &Army,
        enemies: &Army,
        _timeout: Duration,
    ) -> Result<BattleReport, OracleError> {
        let mut units: Vec<Combatant> = Vec::new();
        for (team, army) in [allies, enemies].into_iter().enumerate() {
            for p in army.placements() {
                let (health, damage, range) = stats(p.unit);
                units.push(Combatant {
                    position: p.position,
                    health,
                    damage,
                    range,
                    team,
                });
            }
        }

        let team_health = |units: &[Combatant], team: usize| -> f32 {
            units
                .iter()
                .filter(|u| u.team == team && u.health > 0.0)
                .map(|u| u.health)
                .sum()
        };

        for _ in 0..ROUND_LIMIT {
            if team_health(&units, 0) <= 0.0 || team_health(&units, 1) <= 0.0 {
                break;
            }
            let snapshot = units.clone();
            for unit in units.iter_mut().filter(|u| u.health > 0.0) {
                let target = snapshot
                    .iter()
                    .filter(|t| t.team != unit.team && t.health > 0.0)
                    .min_by(|a, b| {
                        let da = distance(unit.position, a.position);
                        let db = distance(unit.position, b.position);
                        da.total_cmp(&db)
                    });
                let Some(target) = target else { break };
                let gap = distance(unit.position, target.position);
                if gap > unit.range {
                    let step = (MOVE_PER_ROUND / gap).min(1.0);
                    unit.position = Position::new(
                        unit.position.x + (target.position.x - unit.position.x) * step,
                        unit.position.y + (target.position.y - unit.position.y) * step,
                    );
                }
            }
            // Strikes resolve after everyone has moved.
            let positions = units.clone();
            for attacker in positions.iter().filter(|u| u.health > 0.0) {
                let victim = units
                    .iter_mut()
                    .filter(|t| t.team != attacker.team && t.health > 0.0)
                    .min_by(|a, b| {
                        distance(attacker.position, a.position)
                            .total_cmp(&distance(attacker.position, b.position))
                    });
                if let Some(victim) = victim {
                    if distance(attacker.position, victim.position) <= attacker.range {
                        victim.health -= attacker.damage;
                    }
                }
            }
        }

        let ally_health = team_health(&units, 0);
        let enemy_health = team_health(&units, 1);
        let outcome = if enemy_health <= 0.0 && ally_health > 0.0 {
            BattleOutcome::Win
        } else if ally_health <= 0.0 {
            BattleOutcome::Loss
        } else {
            BattleOutcome::Timeout
        };
        Ok(BattleReport {
            outcome,
            ally_health,
            enemy_health,
        })
    }
}

fn distance(a: Position, b: Position) -> f32 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

fn main() {
    env_logger::init();

    let catalog = UnitCatalog::new(
        BTreeMap::from([(MILITIA, 60), (ARCHER, 90), (KNIGHT, 180)]),
        Region::new(0.0, 0.0, 200.0, 80.0),
    );

    // The fixed defending force: a knight wall with archer support.
    let enemy = Army::new(vec![
        Placement::new(KNIGHT, Position::new(60.0, 120.0)),
        Placement::new(KNIGHT, Position::new(100.0, 120.0)),
        Placement::new(KNIGHT, Position::new(140.0, 120.0)),
        Placement::new(ARCHER, Position::new(80.0, 160.0)),
        Placement::new(ARCHER, Position::new(120.0, 160.0)),
    ]);

    let mutations = vec![
        Mutation::AddUnit,
        Mutation::RemoveUnit,
        Mutation::RandomizeType { max_decrease: 120 },
        Mutation::RandomizePosition,
        Mutation::PerturbPosition { sigma: 15.0 },
        Mutation::MoveNextToAlly { sigma: 10.0 },
        Mutation::ReplaceSubarmy { tolerance: 90 },
    ];

    let islands = islands_from_seeds(4, 0xC0FFEE, |seed| {
        let mut rng = Pcg64::seed_from_u64(seed);
        let population = Population::random(&catalog, 20, 900, &mut rng);
        Island::new(EvolutionStrategy::new(mutations.clone(), 20, 40, seed), population)
    });

    let mut search = IslandSearch::new(islands, 0xBEEF);
    println!("Searching for the cheapest army that breaks the knight wall...");

    let best = search
        .run(
            &enemy,
            &catalog,
            &SkirmishOracle,
            &IslandConfig {
                epochs: 10,
                generations_per_epoch: 10,
                battle_timeout: Duration::from_secs(5),
                worker_count: 8,
                wall_timeout: Some(Duration::from_secs(60)),
            },
        )
        .expect("skirmish oracle never fails")
        .expect("at least one epoch completed");

    let fitness = best.fitness();
    println!(
        "Best army ({} points, {:?}): [{}]",
        best.points(),
        fitness.outcome,
        best.army().composition()
    );
    for p in best.army().placements() {
        println!(
            "  unit {:>2} at ({:6.1}, {:6.1})",
            p.unit.0, p.position.x, p.position.y
        );
    }
    println!(
        "Remaining health: allies {:.1}, enemies {:.1}",
        fitness.team_health, fitness.enemy_health
    );
}
