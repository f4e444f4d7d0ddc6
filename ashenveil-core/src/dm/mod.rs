//! AI Dungeon Master interface layer.
//!
//! The only place in the project that talks to the generation service.
//! It receives structured game state and returns raw narrative text; the
//! engine validates that text into an [`crate::intent::Intent`].

pub mod agent;
pub mod prompts;

pub use agent::{DmConfig, DmError, DungeonMaster, ExchangeHistory, Narrator, TurnPrompt};
