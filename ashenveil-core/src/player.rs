//! Player entity and stat management.
//!
//! The `Player` struct is the authoritative source of truth for all player
//! data. Nothing else (especially not the AI) modifies player stats
//! directly; every mutation goes through a named method so the engine can
//! log and validate changes.

use serde::{Deserialize, Serialize};

/// Max HP gained per level.
const LEVEL_UP_HP_BONUS: u32 = 5;
/// Strength and intelligence gained per level.
const LEVEL_UP_STAT_BONUS: u32 = 1;

/// The player character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub hp: u32,
    pub max_hp: u32,
    pub strength: u32,
    pub intelligence: u32,
    pub gold: u32,
    /// Ordered item names; duplicates allowed.
    pub inventory: Vec<String>,
    pub level: u32,
    pub xp: u32,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            name: "Adventurer".to_string(),
            hp: 20,
            max_hp: 20,
            strength: 5,
            intelligence: 5,
            gold: 10,
            inventory: vec!["Torch".to_string(), "Rations x3".to_string()],
            level: 1,
            xp: 0,
        }
    }
}

impl Player {
    /// Apply damage, clamping HP to 0. Returns actual damage dealt.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.hp);
        self.hp -= actual;
        actual
    }

    /// Restore HP up to max_hp. Returns the amount actually healed.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.max_hp - self.hp);
        self.hp += actual;
        actual
    }

    /// Add XP and check for level-up. Returns true if the player levelled up.
    ///
    /// The threshold is `level * 100`; excess XP carries into the new level.
    pub fn gain_xp(&mut self, amount: u32) -> bool {
        self.xp += amount;
        let threshold = self.level * 100;
        if self.xp >= threshold {
            self.xp -= threshold;
            self.level_up();
            return true;
        }
        false
    }

    fn level_up(&mut self) {
        self.level += 1;
        self.max_hp += LEVEL_UP_HP_BONUS;
        self.hp = self.max_hp;
        self.strength += LEVEL_UP_STAT_BONUS;
        self.intelligence += LEVEL_UP_STAT_BONUS;
    }

    /// Add an item to the inventory.
    pub fn add_item(&mut self, item: impl Into<String>) {
        self.inventory.push(item.into());
    }

    /// Remove one copy of an item by name. Returns false if not found.
    pub fn remove_item(&mut self, item: &str) -> bool {
        if let Some(pos) = self.inventory.iter().position(|i| i == item) {
            self.inventory.remove(pos);
            true
        } else {
            false
        }
    }

    /// Add or subtract gold (negative delta = spending).
    /// Returns false if the player can't afford it.
    pub fn modify_gold(&mut self, delta: i64) -> bool {
        let new_total = self.gold as i64 + delta;
        if new_total < 0 {
            return false;
        }
        self.gold = new_total as u32;
        true
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Short status line for terminal display.
    pub fn status_line(&self) -> String {
        let bar_len = 10usize;
        let filled = ((self.hp as f64 / self.max_hp as f64) * bar_len as f64) as usize;
        let bar: String = "#".repeat(filled) + &".".repeat(bar_len - filled);
        format!(
            "[{} | Lv.{} | HP: {} {}/{} | STR:{} INT:{} | Gold:{}g]",
            self.name,
            self.level,
            bar,
            self.hp,
            self.max_hp,
            self.strength,
            self.intelligence,
            self.gold
        )
    }
}
