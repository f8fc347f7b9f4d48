//! Per-character battle history.
//!
//! Every character has its own JSON file under the history directory,
//! keyed by the opaque character id the web app assigned. Inside, events
//! are grouped by room so one file tells the story of every battle that
//! character fought. Events are append-only; nothing here rewrites or
//! deletes a recorded event.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;
use warband_protocol::{CharacterId, RoomId};

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// One durable battle event.
///
/// `event_data` is schemaless by design: each event type carries whatever
/// the battle client needs to replay it, and the store never inspects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleEvent {
    pub event_id: Uuid,
    pub character_id: CharacterId,
    pub room_id: RoomId,
    pub event_type: String,
    #[serde(default)]
    pub event_data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl BattleEvent {
    /// Create an event stamped with a fresh id and the current time.
    pub fn new(
        character_id: CharacterId,
        room_id: RoomId,
        event_type: impl Into<String>,
        event_data: serde_json::Value,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            character_id,
            room_id,
            event_type: event_type.into(),
            event_data,
            timestamp: Utc::now(),
        }
    }
}

/// Every event a character saw in one room, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomBattleLog {
    pub room_id: RoomId,
    /// Timestamp of the first recorded event.
    pub start_time: DateTime<Utc>,
    pub events: Vec<BattleEvent>,
}

/// A character's full history, as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterHistory {
    pub battles: BTreeMap<RoomId, RoomBattleLog>,
}

impl CharacterHistory {
    /// Append an event to its room's log, creating the log on first use.
    pub fn append(&mut self, event: BattleEvent) {
        let log = self
            .battles
            .entry(event.room_id.clone())
            .or_insert_with(|| RoomBattleLog {
                room_id: event.room_id.clone(),
                start_time: event.timestamp,
                events: Vec::new(),
            });
        log.events.push(event);
    }

    /// Total number of recorded events across all rooms.
    pub fn event_count(&self) -> usize {
        self.battles.values().map(|log| log.events.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Reader/writer for per-character history files.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    /// Create a store rooted at the given directory.
    ///
    /// The directory is created lazily on the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory of the history files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load a character's history. A missing file is an empty history.
    pub async fn load(
        &self,
        character_id: &CharacterId,
    ) -> Result<CharacterHistory, StoreError> {
        let path = self.path_for(character_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CharacterHistory::default());
            }
            Err(err) => return Err(StoreError::Read { path, source: err }),
        };
        serde_json::from_slice(&bytes)
            .map_err(|err| StoreError::Corrupt { path, source: err })
    }

    /// Append one event to the owning character's file.
    ///
    /// A file that no longer parses is replaced by a fresh history rather
    /// than blocking all future recording for that character; the reset is
    /// logged so the damage is at least visible.
    pub async fn append(&self, event: BattleEvent) -> Result<(), StoreError> {
        let mut history = match self.load(&event.character_id).await {
            Ok(history) => history,
            Err(StoreError::Corrupt { path, source }) => {
                warn!(
                    path = %path.display(),
                    error = %source,
                    "battle history file corrupt, starting fresh"
                );
                CharacterHistory::default()
            }
            Err(err) => return Err(err),
        };
        let path = self.path_for(&event.character_id);
        history.append(event);
        self.save(&path, &history).await
    }

    async fn save(
        &self,
        path: &Path,
        history: &CharacterHistory,
    ) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| StoreError::Write {
                path: self.dir.clone(),
                source: err,
            })?;
        let bytes =
            serde_json::to_vec_pretty(history).map_err(StoreError::Encode)?;
        tokio::fs::write(path, bytes)
            .await
            .map_err(|err| StoreError::Write {
                path: path.to_path_buf(),
                source: err,
            })
    }

    fn path_for(&self, character_id: &CharacterId) -> PathBuf {
        // Character ids come from the client; keep them out of path syntax.
        let safe: String = character_id
            .as_str()
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
                _ => '_',
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

// ===========================================================================
// Tests
// ===========================================================================
