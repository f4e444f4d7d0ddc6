//! Dark-fantasy adventure engine with an AI Dungeon Master.
//!
//! This crate provides:
//! - Deterministic game mechanics: player progression, d20 combat, a
//!   closed enemy registry, world state, and a summarizing chronicle
//! - An AI narrator whose output is validated into strictly typed intents
//!   before any of it can touch game state
//! - Versioned, atomic campaign persistence
//!
//! # Quick Start
//!
//! ```ignore
//! use ashenveil_core::{DungeonMaster, GameEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dm = DungeonMaster::from_env()?;
//!     let mut engine = GameEngine::load_or_new(dm, "ashenveil_save.json").await?;
//!
//!     let mut console = my_console();
//!     engine.run(&mut console).await?;
//!     Ok(())
//! }
//! ```

pub mod bestiary;
pub mod combat;
pub mod dm;
pub mod engine;
pub mod intent;
pub mod memory;
pub mod persist;
pub mod player;
pub mod testing;
pub mod world;

// Primary public API
pub use combat::{CombatAction, CombatState, DiceRoller, Encounter, RngDice};
pub use dm::{DmConfig, DmError, DungeonMaster, ExchangeHistory, Narrator, TurnPrompt};
pub use engine::{Console, EngineError, GameEngine, TurnOutcome};
pub use intent::Intent;
pub use memory::Chronicle;
pub use persist::{PersistError, SaveMetadata, SavedGame};
pub use player::Player;
pub use testing::{ScriptedConsole, ScriptedDice, ScriptedNarrator, TestHarness};
pub use world::{Disposition, Npc, WorldState};
