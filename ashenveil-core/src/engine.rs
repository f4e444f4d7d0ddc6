//! The game engine: orchestrator of every subsystem.
//!
//! The engine is the only type holding references to all subsystems, and it
//! coordinates the flow of a single game turn:
//!
//!   1. Get player input
//!   2. Ask the AI for narrative plus event signals
//!   3. Apply deterministic logic (combat, world updates, memory)
//!   4. Save state
//!   5. Show the results
//!
//! The engine is deliberately light on business logic. The heavy logic
//! lives in the domain types (`Player`, `WorldState`, `Encounter`); the
//! engine just wires them together in the right order. The AI narrates,
//! but only the engine mutates state.

use crate::bestiary;
use crate::combat::{CombatAction, CombatState, DiceRoller, Encounter, RngDice};
use crate::dm::{ExchangeHistory, Narrator, TurnPrompt};
use crate::intent::Intent;
use crate::memory::Chronicle;
use crate::persist::{PersistError, SavedGame};
use crate::player::Player;
use crate::world::WorldState;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Engine-level errors. Persistence is the only fatal class; transport and
/// parse failures degrade inside the turn and never surface here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("persistence failure: {0}")]
    Persist(#[from] PersistError),
}

/// How a completed turn left the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Continue,
    PlayerDied,
}

/// Terminal seam for player interaction.
///
/// `print` writes one line (a trailing newline is implied). `read_line`
/// shows the prompt and returns the entered line, or `None` on EOF.
/// The stdin implementation lives in the binary; tests use the scripted
/// console in [`crate::testing`].
pub trait Console {
    fn read_line(&mut self, prompt: &str) -> Option<String>;
    fn print(&mut self, text: &str);
}

const DIVIDER_WIDTH: usize = 60;

fn header(text: &str) -> String {
    let divider = "═".repeat(DIVIDER_WIDTH);
    format!("\n{divider}\n  {text}\n{divider}")
}

fn section(title: &str) -> String {
    let dashes = "─".repeat(54usize.saturating_sub(title.chars().count()));
    format!("\n── {title} {dashes}")
}

/// Central coordinator of the Ashenveil game.
///
/// Owns one instance of each subsystem and mediates all communication
/// between them. External code interacts only with this type.
pub struct GameEngine<N: Narrator> {
    player: Player,
    world: WorldState,
    chronicle: Chronicle,
    narrator: N,
    history: ExchangeHistory,
    dice: Box<dyn DiceRoller>,
    save_path: PathBuf,
}

impl<N: Narrator> GameEngine<N> {
    /// Create an engine with a fresh game state.
    pub fn new(narrator: N, save_path: impl Into<PathBuf>) -> Self {
        Self {
            player: Player::default(),
            world: WorldState::default(),
            chronicle: Chronicle::default(),
            narrator,
            history: ExchangeHistory::new(),
            dice: Box::new(RngDice::from_entropy()),
            save_path: save_path.into(),
        }
    }

    /// Resume from a loaded save.
    pub fn from_saved(narrator: N, saved: SavedGame, save_path: impl Into<PathBuf>) -> Self {
        let mut engine = Self::new(narrator, save_path);
        engine.player = saved.player;
        engine.world = saved.world;
        engine.chronicle = saved.chronicle;
        engine
    }

    /// Load the save at `save_path` if one exists, otherwise start fresh.
    /// A corrupt or version-skewed save is an error, not a silent reset.
    pub async fn load_or_new(
        narrator: N,
        save_path: impl Into<PathBuf>,
    ) -> Result<Self, PersistError> {
        let save_path = save_path.into();
        match SavedGame::load_json(&save_path).await {
            Ok(saved) => {
                tracing::info!(
                    player = %saved.metadata.player_name,
                    turn = saved.metadata.turn_count,
                    "resuming saved game"
                );
                Ok(Self::from_saved(narrator, saved, save_path))
            }
            Err(PersistError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::new(narrator, save_path))
            }
            Err(err) => Err(err),
        }
    }

    /// Replace the dice source. Tests inject scripted dice here.
    pub fn with_dice(mut self, dice: Box<dyn DiceRoller>) -> Self {
        self.set_dice(dice);
        self
    }

    /// In-place variant of [`with_dice`](Self::with_dice), for callers that
    /// cannot move the engine.
    pub fn set_dice(&mut self, dice: Box<dyn DiceRoller>) {
        self.dice = dice;
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn chronicle(&self) -> &Chronicle {
        &self.chronicle
    }

    pub fn history(&self) -> &ExchangeHistory {
        &self.history
    }

    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    /// True when no turn has been played and the player is unnamed, so the
    /// binary knows to prompt for a name.
    pub fn is_fresh(&self) -> bool {
        self.world.turn_count == 0 && self.player.name == Player::default().name
    }

    pub fn set_player_name(&mut self, name: impl Into<String>) {
        self.player.name = name.into();
    }

    /// Wipe all state back to defaults. Used for a new game and after death.
    pub fn reset(&mut self) {
        self.player = Player::default();
        self.world = WorldState::default();
        self.chronicle = Chronicle::default();
        self.history.reset();
    }

    /// Main loop: opening scene, then one turn per player action until
    /// quit, EOF, or death. Every exit path saves first.
    pub async fn run(&mut self, console: &mut dyn Console) -> Result<(), EngineError> {
        let opening = self.narrate_validated("I arrive and take in my surroundings.").await;
        console.print("");
        console.print(&opening.narrative);

        loop {
            let next_turn = self.world.turn_count + 1;
            console.print(&section(&format!("Turn {next_turn} - {}", self.world.location)));
            console.print(&self.player.status_line());

            let action = match self.read_action(console) {
                Some(action) => action,
                None => {
                    self.persist().await?;
                    break;
                }
            };

            if self.take_turn(&action, console).await? == TurnOutcome::PlayerDied {
                break;
            }
        }

        console.print(&header("The story continues..."));
        console.print("Your progress has been saved.");
        console.print(&format!("Turns played: {}", self.world.turn_count));
        Ok(())
    }

    /// Run one full game turn for a free-text action.
    ///
    /// Order is fixed: advance turn, compress memory, narrate, apply world
    /// changes, show narrative, combat, record memory, quest update, death
    /// check, save.
    pub async fn take_turn(
        &mut self,
        action: &str,
        console: &mut dyn Console,
    ) -> Result<TurnOutcome, EngineError> {
        self.world.increment_turn();

        self.maybe_summarize(console).await;

        console.print("\n[The dungeon master ponders...]");
        let intent = self.narrate_validated(action).await;

        self.apply_world_changes(&intent, console);

        console.print(&section("The Story"));
        console.print(&intent.narrative);

        if intent.combat_trigger {
            self.run_combat(intent.enemy_type.as_deref(), console);
        }

        match &intent.memory_event {
            Some(event) => self.chronicle.record(event),
            None => self.chronicle.record(format!(
                "Turn {}: {}",
                self.world.turn_count,
                crate::intent::truncate_chars(action, 80)
            )),
        }

        if let Some(quest) = &intent.quest_update {
            console.print(&section("Quest Update"));
            console.print(quest);
            self.world.set_quest(Some(quest.clone()));
        }

        if !self.player.is_alive() {
            self.handle_death(console).await?;
            return Ok(TurnOutcome::PlayerDied);
        }

        self.persist().await?;
        Ok(TurnOutcome::Continue)
    }

    /// Read player input, intercepting meta-commands locally so they never
    /// reach the AI or advance the turn. Returns `None` on quit or EOF.
    fn read_action(&self, console: &mut dyn Console) -> Option<String> {
        loop {
            let raw = match console.read_line("\n> What do you do? ") {
                Some(line) => line.trim().to_string(),
                None => {
                    console.print("\nFarewell, adventurer.");
                    return None;
                }
            };

            if raw.is_empty() {
                continue;
            }

            match raw.to_lowercase().as_str() {
                "quit" | "exit" | "q" => {
                    console.print("Saving and quitting...");
                    return None;
                }
                "inventory" | "inv" | "i" => self.show_inventory(console),
                "status" | "stats" | "s" => console.print(&self.player.status_line()),
                "help" | "h" | "?" => show_help(console),
                "memory" | "journal" => {
                    console.print(&format!("\n{}", self.chronicle.context_block()));
                }
                "world" | "location" => self.show_world(console),
                _ => return Some(raw),
            }
        }
    }

    /// Compress the chronicle once enough events accumulate. A failed
    /// summary call degrades to the concatenated raw events; the chronicle
    /// never loses information to a transport error.
    async fn maybe_summarize(&mut self, console: &mut dyn Console) {
        if !self.chronicle.should_summarize() {
            return;
        }

        console.print("\n[Updating the chronicle...]");
        let events = self.chronicle.drain_events();
        let summary = match self.narrator.summarize(&events).await {
            Ok(summary) => summary,
            Err(err) => {
                tracing::warn!(%err, "summary generation failed, storing raw events");
                events.join(" ")
            }
        };
        self.chronicle.push_summary(summary);
    }

    /// Ask the narrator for this turn's response and validate it. Transport
    /// failure degrades to the fixed fallback intent; the turn always
    /// completes.
    async fn narrate_validated(&mut self, action: &str) -> Intent {
        let memory_block = self.chronicle.context_block();
        let turn = TurnPrompt {
            player: &self.player,
            world: &self.world,
            memory_block: &memory_block,
            action,
        };

        match self.narrator.narrate(&mut self.history, &turn).await {
            Ok(raw) => Intent::validate(&raw),
            Err(err) => {
                tracing::warn!(%err, "narrative generation failed, using fallback intent");
                Intent::transport_fallback(action)
            }
        }
    }

    /// Apply non-combat changes signalled by the AI, in fixed order:
    /// NPC, then location, then tension. All mutation goes through the
    /// world's setters.
    fn apply_world_changes(&mut self, intent: &Intent, console: &mut dyn Console) {
        if let Some(npc) = &intent.new_npc {
            if self.world.add_npc(npc.clone()) {
                console.print(&format!("\n[New NPC encountered: {}, {}]", npc.name, npc.role));
            }
        }

        if let Some(location) = &intent.new_location {
            self.world.move_to(
                location.clone(),
                intent.location_description.as_deref().unwrap_or(""),
            );
            console.print(&format!("\nLocation: {location}"));
        }

        if intent.tension_delta != 0.0 {
            self.world.adjust_tension(intent.tension_delta);
        }
    }

    /// Manage an interactive combat encounter.
    ///
    /// The AI triggered this fight, but from here on every outcome is
    /// determined by dice and engine math, with zero AI involvement.
    fn run_combat(&mut self, enemy_key: Option<&str>, console: &mut dyn Console) {
        let key = match enemy_key {
            Some(key) => key,
            None => {
                tracing::warn!(
                    turn = self.world.turn_count,
                    "combat triggered without a valid enemy type, using default"
                );
                console.print("\n[Engine: combat triggered without an enemy type, a goblin appears]");
                bestiary::DEFAULT_ENEMY
            }
        };
        let enemy = bestiary::spawn_or_default(key);

        console.print(&header(&format!("COMBAT: {} appears!", enemy.name)));
        console.print(&format!(
            "Enemy - HP: {} | ATK: {} | DEF: {}",
            enemy.max_hp, enemy.attack, enemy.defense
        ));
        // Combat always raises the tension.
        self.world.adjust_tension(0.5);

        let mut encounter = Encounter::new(enemy);

        loop {
            console.print(&format!("\n{}", self.player.status_line()));
            console.print(&format!(
                "Enemy: {} HP {}/{}",
                encounter.enemy.name,
                encounter.enemy.display_hp(),
                encounter.enemy.max_hp
            ));
            console.print("\n[A]ttack | [F]lee");

            let choice = console.read_line("> ").map(|line| line.trim().to_lowercase());
            let action = match choice.as_deref() {
                Some("a") | Some("attack") | Some("") => CombatAction::Attack,
                // EOF mid-combat counts as trying to run.
                Some("f") | Some("flee") | None => CombatAction::Flee,
                Some(_) => {
                    console.print("Attack or flee. Choose wisely.");
                    continue;
                }
            };

            let state = encounter.resolve_round(&mut self.player, action, self.dice.as_mut());
            if let Some(line) = encounter.log.latest() {
                console.print(line);
            }
            if state.is_terminal() {
                break;
            }
        }

        console.print(&section("Combat over"));
        match encounter.state() {
            CombatState::Victory => {
                console.print(&format!(
                    "Victory! XP: +{} | Gold: +{}g",
                    encounter.log.xp_gained, encounter.log.gold_gained
                ));
                if !encounter.log.loot_gained.is_empty() {
                    console.print(&format!("  Loot gained: {}", encounter.log.loot_gained.join(", ")));
                }
                self.world.adjust_tension(-0.3);
                self.chronicle.record(format!(
                    "Defeated a {} in combat. Gained {} XP and {} gold.",
                    encounter.enemy.name, encounter.log.xp_gained, encounter.log.gold_gained
                ));
            }
            CombatState::Defeat => {
                console.print("You have fallen...");
                self.chronicle
                    .record(format!("Slain by a {}.", encounter.enemy.name));
            }
            CombatState::Fled => {
                console.print("You fled, but the danger remains.");
                self.world.adjust_tension(0.2);
                self.chronicle
                    .record(format!("Fled from a {}.", encounter.enemy.name));
            }
            CombatState::Ongoing => {}
        }
    }

    /// Death screen, then a full reset persisted so the next session starts
    /// a new life.
    async fn handle_death(&mut self, console: &mut dyn Console) -> Result<(), EngineError> {
        console.print(&header("YOU HAVE DIED"));
        console.print("The darkness claims you. Your chronicle ends here.");
        console.print("\nFinal statistics:");
        console.print(&self.player.status_line());
        console.print(&format!("Turns survived: {}", self.world.turn_count));
        console.print("\nA new life begins...");

        self.reset();
        self.persist().await?;
        Ok(())
    }

    fn show_inventory(&self, console: &mut dyn Console) {
        console.print(&section("Inventory"));
        if self.player.inventory.is_empty() {
            console.print("  (empty)");
        } else {
            for item in &self.player.inventory {
                console.print(&format!("  • {item}"));
            }
        }
        console.print(&format!("  Gold: {}g", self.player.gold));
    }

    fn show_world(&self, console: &mut dyn Console) {
        console.print(&format!("\nLocation: {}", self.world.location));
        console.print(&format!(
            "Quest: {}",
            self.world.active_quest.as_deref().unwrap_or("None")
        ));
        let names: Vec<&str> = self
            .world
            .known_npcs
            .iter()
            .map(|npc| npc.name.as_str())
            .collect();
        console.print(&format!("Known NPCs: [{}]", names.join(", ")));
    }

    async fn persist(&self) -> Result<(), PersistError> {
        SavedGame::new(&self.player, &self.world, &self.chronicle)
            .save_json(&self.save_path)
            .await
    }
}

fn show_help(console: &mut dyn Console) {
    console.print(&section("Help"));
    console.print("  Type any action in free text and the DM will respond.");
    console.print("  Examples:");
    console.print("    'I search the room carefully'");
    console.print("    'I talk to the innkeeper'");
    console.print("    'I draw my sword and advance'");
    console.print("    'I try to pick the lock'");
    console.print("\n  Special commands:");
    console.print("    inventory / inv   - show your items");
    console.print("    status / stats    - show your statistics");
    console.print("    memory / journal  - show the chronicle");
    console.print("    world / location  - show world information");
    console.print("    quit / exit       - save and quit");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedConsole, ScriptedNarrator};

    fn engine(dir: &tempfile::TempDir, narrator: ScriptedNarrator) -> GameEngine<ScriptedNarrator> {
        GameEngine::new(narrator, dir.path().join("save.json"))
    }

    #[test]
    fn test_meta_commands_do_not_reach_the_narrator() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let engine = engine(&dir, ScriptedNarrator::new());
        let mut console =
            ScriptedConsole::new(vec!["inventory", "status", "help", "look around"]);

        let action = engine.read_action(&mut console);
        assert_eq!(action.as_deref(), Some("look around"));
        assert!(console.printed().iter().any(|line| line.contains("Torch")));
    }

    #[test]
    fn test_blank_input_reprompts() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let engine = engine(&dir, ScriptedNarrator::new());
        let mut console = ScriptedConsole::new(vec!["", "   ", "open the door"]);

        assert_eq!(engine.read_action(&mut console).as_deref(), Some("open the door"));
    }

    #[test]
    fn test_quit_and_eof_end_input() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let engine = engine(&dir, ScriptedNarrator::new());

        let mut console = ScriptedConsole::new(vec!["QUIT"]);
        assert!(engine.read_action(&mut console).is_none());

        // Exhausted input behaves as EOF.
        let mut console = ScriptedConsole::new(vec![]);
        assert!(engine.read_action(&mut console).is_none());
    }

    #[test]
    fn test_reset_restores_defaults() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let mut engine = engine(&dir, ScriptedNarrator::new());
        engine.set_player_name("Kael");
        engine.world.increment_turn();
        engine.chronicle.record("something happened");
        engine.history.push_user("hello");

        engine.reset();
        assert!(engine.is_fresh());
        assert_eq!(engine.world().turn_count, 0);
        assert!(engine.history().is_empty());
    }
}
