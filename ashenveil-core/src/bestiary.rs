//! Static registry of combat-ready adversary templates.
//!
//! Enemies are fixed-shape records drawn from a closed table, keyed by
//! identifier. Encounter instances are deep copies of a template and live
//! only for the duration of one fight; they are never persisted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Enemy key substituted when the AI triggers combat without a valid one.
pub const DEFAULT_ENEMY: &str = "goblin";

/// Raised when an enemy key is not in the registry.
#[derive(Debug, Error)]
#[error("Unknown enemy type: {0:?}. Available: {keys}", keys = known_keys().join(", "))]
pub struct UnknownEnemy(pub String);

/// An immutable adversary template.
#[derive(Debug, Clone)]
pub struct EnemyTemplate {
    pub name: &'static str,
    pub hp: u32,
    /// Added to the enemy's d20 roll.
    pub attack: u32,
    /// Minimum roll needed to hit this enemy.
    pub defense: u32,
    pub xp_reward: u32,
    pub gold_reward: u32,
    pub loot: &'static [&'static str],
}

impl EnemyTemplate {
    const fn new(
        name: &'static str,
        hp: u32,
        attack: u32,
        defense: u32,
        xp_reward: u32,
        gold_reward: u32,
        loot: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            hp,
            attack,
            defense,
            xp_reward,
            gold_reward,
            loot,
        }
    }
}

lazy_static::lazy_static! {
    /// Pre-defined enemy templates, keyed by the identifiers the AI may use.
    pub static ref ENEMY_TEMPLATES: BTreeMap<&'static str, EnemyTemplate> = BTreeMap::from([
        ("goblin", EnemyTemplate::new("Goblin Scout", 8, 2, 8, 30, 5, &["Rusty Dagger"])),
        ("skeleton", EnemyTemplate::new("Skeleton Warrior", 12, 3, 10, 50, 8, &["Bone Shard"])),
        ("dark_wolf", EnemyTemplate::new("Shadow Wolf", 15, 4, 9, 60, 0, &["Wolf Pelt"])),
        ("cultist", EnemyTemplate::new("Ashveil Cultist", 14, 5, 11, 75, 12, &["Ritual Scroll"])),
        ("cave_troll", EnemyTemplate::new("Cave Troll", 30, 6, 12, 150, 20, &["Troll Hide", "Crude Club"])),
    ]);
}

fn known_keys() -> Vec<&'static str> {
    ENEMY_TEMPLATES.keys().copied().collect()
}

/// Whether an enemy key is registered.
pub fn is_known(key: &str) -> bool {
    ENEMY_TEMPLATES.contains_key(key)
}

/// A live enemy instance for a single encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enemy {
    pub name: String,
    pub hp: i64,
    pub max_hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub xp_reward: u32,
    pub gold_reward: u32,
    pub loot: Vec<String>,
}

impl Enemy {
    /// HP clamped to zero for display; internal hp may go negative.
    pub fn display_hp(&self) -> u32 {
        self.hp.max(0) as u32
    }

    pub fn is_dead(&self) -> bool {
        self.hp <= 0
    }
}

/// Instantiate a fresh enemy from a registry template by key.
pub fn spawn(key: &str) -> Result<Enemy, UnknownEnemy> {
    let template = ENEMY_TEMPLATES
        .get(key)
        .ok_or_else(|| UnknownEnemy(key.to_string()))?;

    Ok(Enemy {
        name: template.name.to_string(),
        hp: template.hp as i64,
        max_hp: template.hp,
        attack: template.attack,
        defense: template.defense,
        xp_reward: template.xp_reward,
        gold_reward: template.gold_reward,
        loot: template.loot.iter().map(|s| s.to_string()).collect(),
    })
}

/// Instantiate `key`, substituting [`DEFAULT_ENEMY`] when it is unknown.
/// Combat that has already been triggered must always produce an enemy.
pub fn spawn_or_default(key: &str) -> Enemy {
    match spawn(key) {
        Ok(enemy) => enemy,
        Err(err) => {
            tracing::warn!(%err, fallback = DEFAULT_ENEMY, "substituting default enemy");
            let template = &ENEMY_TEMPLATES[DEFAULT_ENEMY];
            Enemy {
                name: template.name.to_string(),
                hp: template.hp as i64,
                max_hp: template.hp,
                attack: template.attack,
                defense: template.defense,
                xp_reward: template.xp_reward,
                gold_reward: template.gold_reward,
                loot: template.loot.iter().map(|s| s.to_string()).collect(),
            }
        }
    }
}
