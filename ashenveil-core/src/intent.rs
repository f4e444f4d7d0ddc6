//! The trust boundary between the AI and game state.
//!
//! `Intent::validate` converts arbitrary, possibly malformed DM output into
//! a validated, strictly typed intent. It is a total function: any
//! malformation degrades to a safe default field, never to an error. No
//! field from the AI reaches Player or WorldState mutation without passing
//! through these checks.

use crate::bestiary;
use crate::world::{Disposition, Npc};
use serde_json::Value;

/// Narrative used when the response carries no usable narrative field.
pub const DEFAULT_NARRATIVE: &str = "The shadows stir. Something is watching.";
/// Narrative substituted when a decoded narrative field is empty or null.
const EMPTY_NARRATIVE: &str = "The world holds its breath.";
/// Last-resort narrative when nothing readable survives extraction.
const UNREADABLE_NARRATIVE: &str = "The dungeon keeps its secrets.";

/// Maximum characters of raw text kept when falling back to it wholesale.
const RAW_TEXT_LIMIT: usize = 200;

/// Validated, strictly typed result of one narrative-generation response.
///
/// Every field carries a safe default so partial responses never fail the
/// engine. Invariant: `enemy_type` is `Some` only when `combat_trigger` is
/// true and the key is in the bestiary.
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub narrative: String,
    pub combat_trigger: bool,
    pub enemy_type: Option<String>,
    pub new_npc: Option<Npc>,
    pub quest_update: Option<String>,
    pub new_location: Option<String>,
    pub location_description: Option<String>,
    pub tension_delta: f64,
    pub memory_event: Option<String>,
}

impl Default for Intent {
    fn default() -> Self {
        Self {
            narrative: DEFAULT_NARRATIVE.to_string(),
            combat_trigger: false,
            enemy_type: None,
            new_npc: None,
            quest_update: None,
            new_location: None,
            location_description: None,
            tension_delta: 0.0,
            memory_event: None,
        }
    }
}

impl Intent {
    /// Parse and sanitize a raw DM response. Never fails; on any
    /// malformation it degrades to a safe default intent carrying only a
    /// fallback narrative.
    pub fn validate(raw_text: &str) -> Intent {
        let clean = strip_fences(raw_text);

        let data: Value = match serde_json::from_str(&clean) {
            Ok(Value::Object(map)) => Value::Object(map),
            Ok(_) | Err(_) => {
                tracing::debug!(raw = %truncate_chars(raw_text, 120), "undecodable DM response");
                return Intent {
                    narrative: extract_narrative_fallback(raw_text),
                    ..Intent::default()
                };
            }
        };

        // Each field is sanitized independently; one bad field never
        // poisons the rest.
        let narrative =
            safe_str(data.get("narrative")).unwrap_or_else(|| EMPTY_NARRATIVE.to_string());

        let combat_trigger = truthy(data.get("combat_trigger"));

        let enemy_type = data
            .get("enemy_type")
            .and_then(Value::as_str)
            .filter(|key| bestiary::is_known(key))
            .filter(|_| combat_trigger)
            .map(str::to_string);

        let new_npc = validate_npc(data.get("new_npc"));

        let tension_delta = data
            .get("tension_delta")
            .and_then(numeric)
            .unwrap_or(0.0)
            .clamp(-1.0, 1.0);

        Intent {
            narrative,
            combat_trigger,
            enemy_type,
            new_npc,
            quest_update: safe_str(data.get("quest_update")),
            new_location: safe_str(data.get("new_location")),
            location_description: safe_str(data.get("location_description")),
            tension_delta,
            memory_event: safe_str(data.get("memory_event")),
        }
    }

    /// Fixed fallback intent for a failed narrative-generation call. The
    /// only state it touches is the chronicle, which records the failure.
    pub fn transport_fallback(action: &str) -> Intent {
        Intent {
            narrative: "The dungeon holds its breath. The world waits.".to_string(),
            memory_event: Some(format!(
                "[Generation failed this turn -- action: {}]",
                truncate_chars(action, 60)
            )),
            ..Intent::default()
        }
    }
}

/// Strip surrounding markdown code-fence markup the model sometimes adds
/// despite JSON mode.
fn strip_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// A string field is valid only if non-empty after trimming and not the
/// literal "null".
fn safe_str(value: Option<&Value>) -> Option<String> {
    let s = value?.as_str()?.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("null") {
        return None;
    }
    Some(s.to_string())
}

/// Booleans and numbers count as signal for flag fields; a nonzero number
/// means true. Strings do not coerce, since "false" would read as set.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

/// A numeric field, accepting quoted numbers the model sometimes emits.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// An NPC descriptor is kept only if it has a non-empty name; role defaults
/// to "stranger" and disposition coerces to neutral.
fn validate_npc(value: Option<&Value>) -> Option<Npc> {
    let map = value?.as_object()?;
    let name = map.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }

    let role = map
        .get("role")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or("stranger");

    let disposition = map
        .get("disposition")
        .and_then(Value::as_str)
        .map(Disposition::parse_or_neutral)
        .unwrap_or_default();

    Some(Npc {
        name: name.to_string(),
        role: role.to_string(),
        disposition,
    })
}

/// Last resort: salvage something readable from a broken response. Tries to
/// find a "narrative" value even in malformed JSON, else keeps a bounded
/// prefix of the raw text.
fn extract_narrative_fallback(text: &str) -> String {
    if let Some(found) = scan_narrative_value(text) {
        return found;
    }
    let prefix = truncate_chars(text.trim(), RAW_TEXT_LIMIT);
    if prefix.is_empty() {
        UNREADABLE_NARRATIVE.to_string()
    } else {
        prefix
    }
}

/// Find `"narrative": "<value>"` in possibly truncated JSON. Accepts only
/// values of at least 10 characters so fragments don't become narration.
fn scan_narrative_value(text: &str) -> Option<String> {
    let key_pos = text.find("\"narrative\"")?;
    let rest = &text[key_pos + "\"narrative\"".len()..];
    let colon = rest.find(':')?;
    let rest = rest[colon + 1..].trim_start();
    let rest = rest.strip_prefix('"')?;

    let mut value = String::new();
    let mut chars = rest.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                // Keep the escaped character as-is
                if let Some(next) = chars.next() {
                    value.push(next);
                }
            }
            '"' => break,
            _ => value.push(c),
        }
    }

    if value.chars().count() >= 10 {
        Some(value)
    } else {
        None
    }
}

/// Unicode-safe character truncation.
pub(crate) fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_full_response() {
        let raw = r#"{
            "narrative": "A wolf steps out of the treeline.",
            "combat_trigger": true,
            "enemy_type": "dark_wolf",
            "new_npc": {"name": "Mira", "role": "herbalist", "disposition": "friendly"},
            "quest_update": "Find the shrine",
            "new_location": "Black Pines",
            "location_description": "Needles and silence.",
            "tension_delta": 0.4,
            "memory_event": "Entered the Black Pines."
        }"#;

        let intent = Intent::validate(raw);
        assert_eq!(intent.narrative, "A wolf steps out of the treeline.");
        assert!(intent.combat_trigger);
        assert_eq!(intent.enemy_type.as_deref(), Some("dark_wolf"));
        let npc = intent.new_npc.unwrap();
        assert_eq!(npc.name, "Mira");
        assert_eq!(npc.disposition, Disposition::Friendly);
        assert_eq!(intent.tension_delta, 0.4);
        assert_eq!(intent.new_location.as_deref(), Some("Black Pines"));
    }

    #[test]
    fn test_never_panics_on_garbage() {
        for raw in [
            "",
            "   ",
            "not json at all",
            "{",
            "[]",
            "42",
            "null",
            r#"{"narrative": 12}"#,
            "\u{0}\u{1}\u{2}",
        ] {
            let intent = Intent::validate(raw);
            assert!(!intent.narrative.is_empty(), "raw input: {raw:?}");
            assert!(!intent.combat_trigger || intent.enemy_type.is_none());
        }
    }

    #[test]
    fn test_fences_stripped() {
        let raw = "```json\n{\"narrative\": \"The gate groans open.\"}\n```";
        let intent = Intent::validate(raw);
        assert_eq!(intent.narrative, "The gate groans open.");
    }

    #[test]
    fn test_narrative_salvaged_from_truncated_json() {
        let raw = r#"{"narrative": "The cultist raises a blade and the candles die, "combat"#;
        let intent = Intent::validate(raw);
        assert!(intent.narrative.starts_with("The cultist raises a blade"));
        assert!(!intent.combat_trigger);
    }

    #[test]
    fn test_raw_prefix_fallback_is_bounded() {
        let raw = "x".repeat(5000);
        let intent = Intent::validate(&raw);
        assert_eq!(intent.narrative.chars().count(), RAW_TEXT_LIMIT);
    }

    #[test]
    fn test_enemy_requires_combat_trigger() {
        let raw = r#"{"narrative": "All quiet.", "combat_trigger": false, "enemy_type": "goblin"}"#;
        let intent = Intent::validate(raw);
        assert!(intent.enemy_type.is_none());
    }

    #[test]
    fn test_unregistered_enemy_discarded() {
        let raw = r#"{"narrative": "A dragon!", "combat_trigger": true, "enemy_type": "dragon"}"#;
        let intent = Intent::validate(raw);
        assert!(intent.combat_trigger);
        assert!(intent.enemy_type.is_none());
    }

    #[test]
    fn test_combat_trigger_coercion() {
        // Strings never trigger combat; "false" would read as set
        let raw = r#"{"narrative": "Steel rings.", "combat_trigger": "yes", "enemy_type": "goblin"}"#;
        let intent = Intent::validate(raw);
        assert!(!intent.combat_trigger);
        assert!(intent.enemy_type.is_none());
    }

    #[test]
    fn test_numeric_combat_trigger_is_truthy() {
        let raw = r#"{"narrative": "A blade flashes.", "combat_trigger": 1, "enemy_type": "goblin"}"#;
        let intent = Intent::validate(raw);
        assert!(intent.combat_trigger);
        assert_eq!(intent.enemy_type.as_deref(), Some("goblin"));

        let raw = r#"{"narrative": "All quiet.", "combat_trigger": 0, "enemy_type": "goblin"}"#;
        let intent = Intent::validate(raw);
        assert!(!intent.combat_trigger);
        assert!(intent.enemy_type.is_none());
    }

    #[test]
    fn test_tension_delta_clamped() {
        for (raw_value, expected) in [
            ("5.0", 1.0),
            ("-3.5", -1.0),
            ("0.25", 0.25),
            ("2", 1.0),
            // Quoted numbers still carry signal
            ("\"0.75\"", 0.75),
            ("\"-0.5\"", -0.5),
            ("\"high\"", 0.0),
            ("null", 0.0),
            ("[1.0]", 0.0),
        ] {
            let raw = format!(r#"{{"narrative": "ok then.", "tension_delta": {raw_value}}}"#);
            let intent = Intent::validate(&raw);
            assert_eq!(intent.tension_delta, expected, "raw value: {raw_value}");
        }
    }

    #[test]
    fn test_npc_without_name_discarded() {
        let raw = r#"{"narrative": "A figure.", "new_npc": {"role": "guard"}}"#;
        assert!(Intent::validate(raw).new_npc.is_none());

        let raw = r#"{"narrative": "A figure.", "new_npc": {"name": "   "}}"#;
        assert!(Intent::validate(raw).new_npc.is_none());
    }

    #[test]
    fn test_npc_defaults() {
        let raw = r#"{"narrative": "A figure.", "new_npc": {"name": "Vesk", "disposition": "seething"}}"#;
        let npc = Intent::validate(raw).new_npc.unwrap();
        assert_eq!(npc.role, "stranger");
        assert_eq!(npc.disposition, Disposition::Neutral);
    }

    #[test]
    fn test_null_and_whitespace_strings_absent() {
        let raw = r#"{
            "narrative": "Something moves.",
            "quest_update": "null",
            "new_location": "   ",
            "location_description": "NULL",
            "memory_event": ""
        }"#;
        let intent = Intent::validate(raw);
        assert!(intent.quest_update.is_none());
        assert!(intent.new_location.is_none());
        assert!(intent.location_description.is_none());
        assert!(intent.memory_event.is_none());
    }

    #[test]
    fn test_empty_narrative_substituted() {
        let raw = r#"{"narrative": "  "}"#;
        let intent = Intent::validate(raw);
        assert_eq!(intent.narrative, EMPTY_NARRATIVE);
    }

    #[test]
    fn test_transport_fallback_truncates_action() {
        let action = "a".repeat(100);
        let intent = Intent::transport_fallback(&action);
        let event = intent.memory_event.unwrap();
        assert!(event.contains(&"a".repeat(60)));
        assert!(!event.contains(&"a".repeat(61)));
        assert!(!intent.combat_trigger);
    }
}
