//! The Dungeon Master agent.
//!
//! Wraps the chat API and translates game state into raw narrative text.
//! It is a pure translator: it never touches `Player` or `WorldState`;
//! those are mutated exclusively by the engine after validation.

use super::prompts;
use crate::player::Player;
use crate::world::WorldState;
use openai::{Client, Message, Request};
use thiserror::Error;

/// Maximum stored history entries (6 round-trips).
const MAX_HISTORY: usize = 12;

/// Errors from the DM agent. Callers treat these as transport failures and
/// degrade to a fallback intent or summary; they are never fatal.
#[derive(Debug, Error)]
pub enum DmError {
    #[error("generation API error: {0}")]
    Api(#[from] openai::Error),
}

/// Configuration for the Dungeon Master.
#[derive(Debug, Clone)]
pub struct DmConfig {
    /// Model override; the client default applies when unset.
    pub model: Option<String>,
    /// Token cap for narrative responses.
    pub max_tokens: u32,
    /// Slightly high by default for creative narrative variance.
    pub temperature: f32,
}

impl Default for DmConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 600,
            temperature: 0.92,
        }
    }
}

/// The state snapshot handed to the narrator for one turn.
///
/// Snapshots are borrowed for the duration of the call only; the narrator
/// retains no mutation rights afterward.
pub struct TurnPrompt<'a> {
    pub player: &'a Player,
    pub world: &'a WorldState,
    pub memory_block: &'a str,
    pub action: &'a str,
}

/// Bounded rolling exchange history for within-session continuity.
///
/// An explicit, session-scoped value owned by the engine and passed into
/// each call, so it can be reset, inspected, or swapped per test. It is
/// not part of persisted game state.
#[derive(Debug, Clone, Default)]
pub struct ExchangeHistory {
    entries: Vec<Message>,
}

impl ExchangeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.entries.push(Message::user(content));
        self.trim();
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.entries.push(Message::assistant(content));
        self.trim();
    }

    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    fn trim(&mut self) {
        while self.entries.len() > MAX_HISTORY {
            self.entries.remove(0);
        }
    }
}

/// The narrative-generation boundary consumed by the engine.
///
/// Implemented by [`DungeonMaster`] for live play and by the scripted
/// narrator in [`crate::testing`] for deterministic tests.
pub trait Narrator {
    /// Generate raw narrative text for one turn. The engine validates the
    /// result; a transport error makes the engine substitute a fixed
    /// fallback intent and continue play.
    fn narrate(
        &self,
        history: &mut ExchangeHistory,
        turn: &TurnPrompt<'_>,
    ) -> impl std::future::Future<Output = Result<String, DmError>>;

    /// Compress chronicle events into one summary paragraph. On failure the
    /// engine synthesizes a degraded summary from the raw events.
    fn summarize(
        &self,
        events: &[String],
    ) -> impl std::future::Future<Output = Result<String, DmError>>;
}

/// Live Dungeon Master over the chat completions API.
pub struct DungeonMaster {
    client: Client,
    config: DmConfig,
}

impl DungeonMaster {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            config: DmConfig::default(),
        }
    }

    /// Create a DungeonMaster from the OPENAI_API_KEY environment variable.
    pub fn from_env() -> Result<Self, openai::Error> {
        Ok(Self::new(Client::from_env()?))
    }

    pub fn with_config(mut self, config: DmConfig) -> Self {
        self.config = config;
        self
    }

    fn apply_model(&self, request: Request) -> Request {
        match &self.config.model {
            Some(model) => request.with_model(model.clone()),
            None => request,
        }
    }
}

impl Narrator for DungeonMaster {
    async fn narrate(
        &self,
        history: &mut ExchangeHistory,
        turn: &TurnPrompt<'_>,
    ) -> Result<String, DmError> {
        let user_message =
            prompts::build_user_message(turn.player, turn.world, turn.memory_block, turn.action);
        history.push_user(user_message);

        let mut messages = vec![Message::system(prompts::SYSTEM_PROMPT)];
        messages.extend_from_slice(history.entries());

        let request = self.apply_model(
            Request::new(messages)
                .with_max_tokens(self.config.max_tokens)
                .with_temperature(self.config.temperature)
                .with_json_mode(),
        );

        let completion = self.client.complete(request).await?;
        history.push_assistant(completion.content.clone());
        Ok(completion.content)
    }

    async fn summarize(&self, events: &[String]) -> Result<String, DmError> {
        let request = self.apply_model(
            Request::new(vec![Message::user(prompts::build_summary_prompt(events))])
                .with_max_tokens(200)
                .with_temperature(0.7),
        );

        let completion = self.client.complete(request).await?;
        Ok(completion.content.trim().to_string())
    }
}
