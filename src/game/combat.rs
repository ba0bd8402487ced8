//! Territorial combat between overlapping shelters
//!
//! Combat is a gradual back-and-forth size drain, not one-shot elimination:
//! each resolution moves at most one unit of size from loser to winner.

use std::collections::HashMap;

use crate::game::tuning::{
    CPU_ID_PREFIX, COMBAT_PET_WEIGHT, COMBAT_PROB_MAX, COMBAT_PROB_MIN, COMBAT_STRENGTH_WEIGHT,
    COMBAT_VARIANCE_BASE, COMBAT_VARIANCE_CAP, COMBAT_VARIANCE_PER_STRAY,
    ADOPT_BASE_INTERVAL_TICKS,
};
use crate::protocol::messages::FightAllyChoice;

/// Canonicalized unordered pair of shelter ids.
///
/// Construction orders the two ids so `(a, b)` and `(b, a)` collapse to the
/// same key, no matter which side initiated the overlap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey {
    first: String,
    second: String,
}

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self {
                first: a.to_string(),
                second: b.to_string(),
            }
        } else {
            Self {
                first: b.to_string(),
                second: a.to_string(),
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.first == id || self.second == id
    }
}

/// Directional fight/ally choices submitted by players.
///
/// An alliance only holds when both directions are explicit `Ally`; a
/// missing or mismatched choice means combat proceeds. CPU shelters never
/// participate in the mechanism.
#[derive(Debug, Default)]
pub struct AllyBook {
    choices: HashMap<(String, String), FightAllyChoice>,
}

impl AllyBook {
    pub fn set(&mut self, chooser: &str, target: &str, choice: FightAllyChoice) {
        self.choices
            .insert((chooser.to_string(), target.to_string()), choice);
    }

    /// True only when both directions chose Ally and neither side is a CPU
    pub fn mutually_allied(&self, a: &str, b: &str) -> bool {
        if a.starts_with(CPU_ID_PREFIX) || b.starts_with(CPU_ID_PREFIX) {
            return false;
        }
        self.choices.get(&(a.to_string(), b.to_string())) == Some(&FightAllyChoice::Ally)
            && self.choices.get(&(b.to_string(), a.to_string())) == Some(&FightAllyChoice::Ally)
    }

    /// Drop every choice involving a departed player
    pub fn forget(&mut self, id: &str) {
        self.choices
            .retain(|(chooser, target), _| chooser != id && target != id);
    }
}

/// Pure combat resolution math
pub struct CombatSystem;

impl CombatSystem {
    /// Combat strength: size plus carried pets, scaled up for fast adopters
    pub fn strength(size: f32, pets_carried: usize, adoption_interval_ticks: f32) -> f32 {
        let base = size + pets_carried as f32 * COMBAT_PET_WEIGHT;
        base * (ADOPT_BASE_INTERVAL_TICKS / adoption_interval_ticks.max(1.0))
    }

    /// Jitter bound grows with loose strays on the map, capped
    pub fn variance(free_strays: usize) -> f32 {
        (COMBAT_VARIANCE_BASE + free_strays as f32 * COMBAT_VARIANCE_PER_STRAY)
            .min(COMBAT_VARIANCE_CAP)
    }

    /// Win probability for side A, clamped to the configured band
    pub fn win_probability(strength_a: f32, strength_b: f32, jitter: f32) -> f32 {
        let p = 0.5 + (strength_a - strength_b) * COMBAT_STRENGTH_WEIGHT + jitter;
        p.clamp(COMBAT_PROB_MIN, COMBAT_PROB_MAX)
    }

    /// Size transferred from loser to winner on one resolution
    pub fn drain_amount(loser_size: f32) -> f32 {
        loser_size.floor().min(1.0).max(0.0)
    }
}
