//! Battle outcome summaries and their total order.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Terminal state of a simulated battle, from the ally side's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleOutcome {
    Win,
    Loss,
    Timeout,
}

impl BattleOutcome {
    pub fn is_win(self) -> bool {
        matches!(self, BattleOutcome::Win)
    }
}

/// Immutable quality summary of one evaluated army.
///
/// The order is a short decision tree, not a weighted sum:
///
/// 1. A win outranks any non-win.
/// 2. Among wins: fewer points, then more remaining team health.
/// 3. Among non-wins: less remaining enemy health (closer to victory), then
///    fewer points.
///
/// A timeout ranks identically to a loss. That mirrors the game's original
/// solver; changing it would silently reorder populations mid-search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Fitness {
    pub outcome: BattleOutcome,
    pub points: u32,
    pub team_health: f32,
    pub enemy_health: f32,
}

impl Fitness {
    pub fn new(outcome: BattleOutcome, points: u32, team_health: f32, enemy_health: f32) -> Self {
        Self {
            outcome,
            points,
            team_health,
            enemy_health,
        }
    }
}

impl PartialEq for Fitness {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Fitness {}

impl PartialOrd for Fitness {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fitness {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.outcome.is_win(), other.outcome.is_win()) {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (true, true) => other
                .points
                .cmp(&self.points)
                .then_with(|| self.team_health.total_cmp(&other.team_health)),
            (false, false) => other
                .enemy_health
                .total_cmp(&self.enemy_health)
                .then_with(|| other.points.cmp(&self.points)),
        }
    }
}
