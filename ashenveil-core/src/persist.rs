//! Save/load for Player, World, and Chronicle state.
//!
//! Saves are versioned JSON. Writes go to a temporary sibling file and are
//! renamed into place, so a save is either fully written or not visible;
//! an interrupted turn can never leave a truncated save behind. Persistence
//! failures are the one error class this engine treats as fatal.

use crate::memory::Chronicle;
use crate::player::Player;
use crate::world::WorldState;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Current save file version.
const SAVE_VERSION: u32 = 1;

/// A saved game with all state needed to resume play.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedGame {
    /// Save format version for compatibility checking.
    pub version: u32,

    /// Unix timestamp of when the save was created.
    pub saved_at: u64,

    pub player: Player,
    pub world: WorldState,
    pub chronicle: Chronicle,

    /// Quick-access metadata about the save.
    pub metadata: SaveMetadata,
}

/// Metadata peekable without loading the full state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveMetadata {
    pub player_name: String,
    pub level: u32,
    pub location: String,
    pub turn_count: u32,
}

impl SavedGame {
    /// Snapshot the current game state for saving.
    pub fn new(player: &Player, world: &WorldState, chronicle: &Chronicle) -> Self {
        let metadata = SaveMetadata {
            player_name: player.name.clone(),
            level: player.level,
            location: world.location.clone(),
            turn_count: world.turn_count,
        };

        Self {
            version: SAVE_VERSION,
            saved_at: unix_now(),
            player: player.clone(),
            world: world.clone(),
            chronicle: chronicle.clone(),
            metadata,
        }
    }

    /// Atomically write the save as JSON: write a `.tmp` sibling, then
    /// rename over the destination.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        let tmp = tmp_path(path);
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Load from a JSON file, checking the save version.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path).await?;
        let saved: Self = serde_json::from_str(&content)?;

        if saved.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: saved.version,
            });
        }

        Ok(saved)
    }

    /// Get a save's metadata without deserializing the full state.
    pub async fn peek_metadata(path: impl AsRef<Path>) -> Result<SaveMetadata, PersistError> {
        let content = fs::read_to_string(path).await?;

        #[derive(Deserialize)]
        struct Partial {
            version: u32,
            metadata: SaveMetadata,
        }

        let partial: Partial = serde_json::from_str(&content)?;

        if partial.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: partial.version,
            });
        }

        Ok(partial.metadata)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

fn unix_now() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
