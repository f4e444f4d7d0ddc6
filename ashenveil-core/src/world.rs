//! Persistent world state.
//!
//! `WorldState` holds everything about the game world that isn't the
//! player: location, known NPCs, the active quest, and a global tension
//! score that tunes the darkness of AI-generated narrative. Only the
//! engine mutates it; the AI reads a serialized snapshot and never writes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

const DEFAULT_LOCATION: &str = "The Broken Flagon Inn, Ashenveil";
const DEFAULT_REGION_DESC: &str = "A dying frontier town where the candles burn low and \
     strangers are watched with hollow eyes. The forest beyond the walls hums with \
     something old and hungry.";

/// An NPC's attitude toward the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    Friendly,
    #[default]
    Neutral,
    Hostile,
}

impl Disposition {
    /// Parse a raw disposition string, coercing anything unknown to Neutral.
    pub fn parse_or_neutral(raw: &str) -> Self {
        match raw {
            "friendly" => Disposition::Friendly,
            "hostile" => Disposition::Hostile,
            _ => Disposition::Neutral,
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Disposition::Friendly => "friendly",
            Disposition::Neutral => "neutral",
            Disposition::Hostile => "hostile",
        };
        write!(f, "{s}")
    }
}

/// A known NPC. Fixed-shape record; unknown keys from the AI cannot appear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Npc {
    pub name: String,
    pub role: String,
    pub disposition: Disposition,
}

/// Mutable world data: where the player is, who they've met, what quest is
/// active, and a tension score (0 = peaceful, 10 = apocalyptic).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub location: String,
    pub region_description: String,
    pub active_quest: Option<String>,
    /// Unique by name; insertion order preserved.
    pub known_npcs: Vec<Npc>,
    pub tension: f64,
    pub turn_count: u32,
    pub visited_locations: Vec<String>,
    pub world_flags: BTreeMap<String, bool>,
}

impl Default for WorldState {
    fn default() -> Self {
        Self {
            location: DEFAULT_LOCATION.to_string(),
            region_description: DEFAULT_REGION_DESC.to_string(),
            active_quest: None,
            known_npcs: Vec::new(),
            tension: 3.0,
            turn_count: 0,
            visited_locations: vec![DEFAULT_LOCATION.to_string()],
            world_flags: BTreeMap::new(),
        }
    }
}

impl WorldState {
    /// Change current location and record it in the visited list.
    pub fn move_to(&mut self, new_location: impl Into<String>, description: &str) {
        let new_location = new_location.into();
        self.location = new_location.clone();
        if !description.is_empty() {
            self.region_description = description.to_string();
        }
        if !self.visited_locations.contains(&new_location) {
            self.visited_locations.push(new_location);
        }
    }

    /// Set or clear the active quest.
    pub fn set_quest(&mut self, quest: Option<String>) {
        self.active_quest = quest;
    }

    /// Register a new NPC. Skips duplicates by name.
    pub fn add_npc(&mut self, npc: Npc) -> bool {
        if self.known_npcs.iter().any(|n| n.name == npc.name) {
            return false;
        }
        self.known_npcs.push(npc);
        true
    }

    /// Update how an NPC feels about the player. Returns false if unknown.
    pub fn update_npc_disposition(&mut self, name: &str, disposition: Disposition) -> bool {
        for npc in &mut self.known_npcs {
            if npc.name == name {
                npc.disposition = disposition;
                return true;
            }
        }
        false
    }

    /// Nudge the tension score, clamped to [0, 10].
    pub fn adjust_tension(&mut self, delta: f64) {
        self.tension = (self.tension + delta).clamp(0.0, 10.0);
    }

    /// Set a world flag (e.g. "boss_defeated", "bridge_destroyed").
    pub fn set_flag(&mut self, key: impl Into<String>, value: bool) {
        self.world_flags.insert(key.into(), value);
    }

    pub fn flag(&self, key: &str) -> bool {
        self.world_flags.get(key).copied().unwrap_or(false)
    }

    pub fn increment_turn(&mut self) {
        self.turn_count += 1;
    }

    /// Clean snapshot for injection into the DM prompt. Excludes internal
    /// bookkeeping fields the AI doesn't need.
    pub fn prompt_snapshot(&self) -> String {
        let npcs: Vec<String> = self
            .known_npcs
            .iter()
            .map(|n| format!("{} ({}, {})", n.name, n.role, n.disposition))
            .collect();
        let flags: Vec<&str> = self
            .world_flags
            .iter()
            .filter(|(_, v)| **v)
            .map(|(k, _)| k.as_str())
            .collect();

        format!(
            "  current_location: {}\n  location_atmosphere: {}\n  active_quest: {}\n  \
             known_npcs: [{}]\n  world_tension: {:.1}\n  notable_flags: [{}]",
            self.location,
            self.region_description,
            self.active_quest.as_deref().unwrap_or("None"),
            npcs.join(", "),
            self.tension,
            flags.join(", ")
        )
    }
}
