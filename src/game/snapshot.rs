//! Whole-game snapshots and where they are kept
//!
//! A snapshot holds the config, the complete `GameState` (board, stories,
//! queues including held and carried-over entries, projects, the seed
//! position) and the resolution log. Rule variants, the deck and
//! the strategies are code and are supplied again on restore.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::config::EngineConfig;
use crate::core::error::{EngineError, Result};
use crate::core::types::GameId;
use crate::effect::ResolutionLog;
use crate::game::{Game, GameState, Ruleset};
use crate::season::tableau::EncounterDeck;

pub const SNAPSHOT_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub version: u32,
    pub id: GameId,
    pub config: EngineConfig,
    pub state: GameState,
    pub log: ResolutionLog,
}

impl GameSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: GameSnapshot = serde_json::from_str(json)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(EngineError::InvalidConfig(format!(
                "snapshot version {} is not supported (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        Ok(snapshot)
    }
}

/// Atomic snapshot reads and writes
pub trait SnapshotStore {
    /// Replace the stored snapshot of the game as a whole
    fn save(&mut self, snapshot: &GameSnapshot) -> Result<()>;

    fn load(&self, id: GameId) -> Result<Option<GameSnapshot>>;
}

/// Keeps serialized snapshots in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: AHashMap<GameId, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&mut self, snapshot: &GameSnapshot) -> Result<()> {
        self.snapshots.insert(snapshot.id, snapshot.to_json()?);
        Ok(())
    }

    fn load(&self, id: GameId) -> Result<Option<GameSnapshot>> {
        self.snapshots.get(&id).map(|json| GameSnapshot::from_json(json)).transpose()
    }
}

/// One JSON file per game in a directory
///
/// Writes go to a temporary file that is renamed over the old one, so a
/// reader sees either the previous or the new snapshot.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self { dir: dir.to_path_buf() })
    }

    fn path_for(&self, id: GameId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

impl SnapshotStore for JsonFileStore {
    fn save(&mut self, snapshot: &GameSnapshot) -> Result<()> {
        let path = self.path_for(snapshot.id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, snapshot.to_json()?)?;
        fs::rename(&tmp, &path)?;
        tracing::debug!("Saved {} to {}", snapshot.id, path.display());
        Ok(())
    }

    fn load(&self, id: GameId) -> Result<Option<GameSnapshot>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        GameSnapshot::from_json(&content).map(Some)
    }
}

impl Game {
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            version: SNAPSHOT_VERSION,
            id: self.id,
            config: self.ruleset.config.clone(),
            state: self.state.clone(),
            log: self.log.clone(),
        }
    }

    /// Rebuild a game from a snapshot with default rules
    ///
    /// Register rule variants and strategies again with the `with_*`
    /// builders.
    pub fn from_snapshot(snapshot: GameSnapshot, deck: Box<dyn EncounterDeck>) -> Result<Self> {
        snapshot.config.validate()?;
        tracing::info!(
            "Restored {} at season {} ({})",
            snapshot.id,
            snapshot.state.season.season,
            snapshot.state.season.phase.label()
        );
        Ok(Self {
            id: snapshot.id,
            ruleset: Ruleset::new(snapshot.config),
            state: snapshot.state,
            log: snapshot.log,
            deck,
        })
    }
}
