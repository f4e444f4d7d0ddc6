//! Prompt templates for the Dungeon Master.
//!
//! Centralizing prompts here means easy tuning without touching game logic
//! and clear documentation of what the AI may and may not do. Every prompt
//! reinforces the role boundary: the AI describes, the engine decides.

use crate::player::Player;
use crate::world::WorldState;

/// System prompt sent with every turn. Locks the AI into pure narration
/// and the fixed JSON output contract.
pub const SYSTEM_PROMPT: &str = "\
You are the Dungeon Master of a dark fantasy RPG. Your only job is NARRATIVE: \
describe the world, voice NPCs, and set the atmosphere.

IRON RULES -- NEVER VIOLATE THESE:
  x Do NOT modify HP, gold, inventory, or any player stat.
  x Do NOT roll dice or determine combat damage.
  x Do NOT decide combat outcomes.
  x Do NOT grant or remove items.
  x Do NOT contradict world flags marked true in the game state.

YOU ARE ONLY AUTHORIZED TO:
  + Write immersive scene descriptions (2-4 sentences).
  + Voice NPC dialogue in character.
  + Signal story events through structured JSON fields.
  + Suggest (not decide) whether combat is triggered.

TONE: Dark, visceral, urgent. Every scene should create forward momentum. \
Always end your narrative with an immediate threat, a choice, or a pressure \
point. Never describe a neutral scene; even peaceful moments hide something \
wrong. NPCs always WANT something or FEAR something.

OUTPUT FORMAT -- you must ALWAYS respond with valid JSON (keys must be kept):
{
  \"narrative\": \"<your scene description, 2-4 sentences>\",
  \"combat_trigger\": <true if the player's action leads to combat, else false>,
  \"enemy_type\": \"<goblin|skeleton|dark_wolf|cultist|cave_troll|null>\",
  \"new_npc\": {\"name\": \"<string>\", \"role\": \"<string>\", \"disposition\": \"<friendly|neutral|hostile>\"} or null,
  \"quest_update\": \"<short string describing quest progress>\" or null,
  \"new_location\": \"<location name if the player has moved>\" or null,
  \"location_description\": \"<atmosphere of the new location>\" or null,
  \"tension_delta\": <number in [-1, 1]; trend toward +0.1 unless something truly resolved tension>,
  \"memory_event\": \"<one-sentence summary of what happened, for the chronicle>\" or null
}

Never add prose outside the JSON block. Never return partial JSON.";

/// Assemble the full user message for one turn. The game state is
/// serialized and prepended so the AI has complete context without relying
/// on conversational history.
pub fn build_user_message(
    player: &Player,
    world: &WorldState,
    memory_block: &str,
    action: &str,
) -> String {
    format!(
        "=== CURRENT GAME STATE ===\n\n\
         PLAYER:\n{}\n\n\
         WORLD:\n{}\n\n\
         MEMORY:\n{}\n\n\
         === PLAYER ACTION ===\n\
         \"{}\"\n\n\
         Respond with valid JSON only.",
        player_block(player),
        world.prompt_snapshot(),
        memory_block,
        action
    )
}

/// Prompt for compressing chronicle events into one summary paragraph.
pub fn build_summary_prompt(events: &[String]) -> String {
    let events_text: Vec<String> = events.iter().map(|e| format!("- {e}")).collect();
    format!(
        "You are a dark fantasy chronicle keeper. Compress these game events \
         into a single vivid paragraph (2-4 sentences), past tense, omniscient \
         narrator. Preserve all important facts (names, items, outcomes). Be \
         atmospheric but concise.\n\nEvents:\n{}",
        events_text.join("\n")
    )
}

/// Serialize the player as indented `key: value` lines for the prompt.
fn player_block(player: &Player) -> String {
    format!(
        "  name: {}\n  hp: {}/{}\n  strength: {}\n  intelligence: {}\n  \
         gold: {}\n  inventory: [{}]\n  level: {}\n  xp: {}",
        player.name,
        player.hp,
        player.max_hp,
        player.strength,
        player.intelligence,
        player.gold,
        player.inventory.join(", "),
        player.level,
        player.xp
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_carries_state_and_action() {
        let player = Player::default();
        let world = WorldState::default();
        let message = build_user_message(&player, &world, "No events.", "I open the door");

        assert!(message.contains("name: Adventurer"));
        assert!(message.contains("hp: 20/20"));
        assert!(message.contains("The Broken Flagon Inn"));
        assert!(message.contains("\"I open the door\""));
        assert!(message.ends_with("Respond with valid JSON only."));
    }

    #[test]
    fn test_summary_prompt_lists_events() {
        let events = vec!["Slew a goblin.".to_string(), "Found a key.".to_string()];
        let prompt = build_summary_prompt(&events);
        assert!(prompt.contains("- Slew a goblin."));
        assert!(prompt.contains("- Found a key."));
    }

    #[test]
    fn test_system_prompt_names_all_contract_keys() {
        for key in [
            "narrative",
            "combat_trigger",
            "enemy_type",
            "new_npc",
            "quest_update",
            "new_location",
            "location_description",
            "tension_delta",
            "memory_event",
        ] {
            assert!(SYSTEM_PROMPT.contains(key), "missing key: {key}");
        }
    }
}
