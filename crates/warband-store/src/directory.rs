//! Persisted room directory.
//!
//! The directory is a single JSON file (`rooms.json`) holding one record per
//! room ever created. It survives restarts so that room codes handed out to
//! players keep resolving after a redeploy; live state (rosters, phase) is
//! not persisted and rehydrated rooms start empty. Records are never removed,
//! even when the live room is destroyed; re-creating a room under the same id
//! replaces its record.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warband_protocol::{CharacterId, RoomId};

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One persisted room.
///
/// Holds creation metadata only. Passwords are never written to disk; the
/// record carries a presence flag so a rehydrated room still prompts for one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub id: RoomId,
    pub created_at: DateTime<Utc>,
    pub creator_character_id: Option<CharacterId>,
    pub is_public: bool,
    pub has_password: bool,
    pub max_players: usize,
}

/// On-disk shape of `rooms.json`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct DirectoryFile {
    rooms: Vec<RoomRecord>,
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// Reader/writer for the room directory file.
#[derive(Debug, Clone)]
pub struct RoomDirectory {
    path: PathBuf,
}

impl RoomDirectory {
    /// Create a directory handle for the given file path.
    ///
    /// Nothing is touched on disk until [`load`](Self::load) or
    /// [`upsert`](Self::upsert) is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every persisted record. A missing file is an empty directory.
    pub async fn load(&self) -> Result<Vec<RoomRecord>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source: err,
                });
            }
        };
        let file: DirectoryFile =
            serde_json::from_slice(&bytes).map_err(|err| StoreError::Corrupt {
                path: self.path.clone(),
                source: err,
            })?;
        Ok(file.rooms)
    }

    /// Insert a record, replacing any existing record with the same id.
    ///
    /// Replacement covers the case where a room is destroyed and later
    /// re-created under the same custom id.
    pub async fn upsert(&self, record: RoomRecord) -> Result<(), StoreError> {
        let mut rooms = self.load().await?;
        match rooms.iter_mut().find(|existing| existing.id == record.id) {
            Some(existing) => *existing = record,
            None => rooms.push(record),
        }
        self.save(&rooms).await
    }

    async fn save(&self, rooms: &[RoomRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| StoreError::Write {
                    path: self.path.clone(),
                    source: err,
                })?;
        }
        let file = DirectoryFile {
            rooms: rooms.to_vec(),
        };
        let bytes = serde_json::to_vec_pretty(&file).map_err(StoreError::Encode)?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|err| StoreError::Write {
                path: self.path.clone(),
                source: err,
            })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
