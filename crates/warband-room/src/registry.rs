//! Room registry: owns every live room actor and the connection index.
//!
//! The registry is the single entry point for room lifecycle (create,
//! rehydrate, reap-on-empty) and routes per-connection traffic to the
//! right actor. It also mirrors each created room into the on-disk
//! directory so the room list survives restarts.
//!
//! Directory records are never deleted, even when the live room dies
//! with its last member. Restart rehydration therefore brings back an
//! empty, waiting room for every room ever created.
//!
//! Locking: the handle and membership maps sit behind one mutex whose
//! guard is held only to resolve, insert, or remove entries. Actor
//! round-trips and directory writes run with the guard released, so a
//! busy room or a slow disk never stalls traffic for other rooms.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::Mutex;
use tracing::{info, warn};
use warband_protocol::{RoomId, RoomSummary};
use warband_session::JoinProfile;
use warband_store::{RecorderHandle, RoomDirectory, RoomRecord, StoreError};
use warband_transport::ConnectionId;

use crate::room::{
    EventSender, JoinSummary, LeaveSummary, RoomAction, RoomHandle, RoomInfo,
    spawn_room,
};
use crate::{RoomError, RoomOptions, RoomPassword};

/// Default command-channel capacity per room actor.
pub const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Characters used for generated room codes.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of generated room codes.
const CODE_LENGTH: usize = 6;

/// Owns all live rooms and the connection-to-room index.
pub struct RoomRegistry {
    live: Mutex<LiveRooms>,
    directory: RoomDirectory,
    recorder: RecorderHandle,
}

/// The maps the registry guards.
struct LiveRooms {
    rooms: HashMap<RoomId, RoomHandle>,
    /// Which room each connection currently occupies.
    memberships: HashMap<ConnectionId, RoomId>,
}

impl RoomRegistry {
    pub fn new(directory: RoomDirectory, recorder: RecorderHandle) -> Self {
        Self {
            live: Mutex::new(LiveRooms {
                rooms: HashMap::new(),
                memberships: HashMap::new(),
            }),
            directory,
            recorder,
        }
    }

    // -- lifecycle --------------------------------------------------------

    /// Respawn an empty room for every record in the directory.
    ///
    /// Live state is not persisted, so restored rooms come back in the
    /// waiting phase with nobody inside. A password is remembered only
    /// as a presence flag; restored rooms still advertise one but
    /// accept any attempt.
    pub async fn rehydrate(&self) -> Result<usize, StoreError> {
        let records = self.directory.load().await?;

        let mut live = self.live.lock().await;
        let mut restored = 0;
        for record in records {
            if live.rooms.contains_key(&record.id) {
                continue;
            }
            let options = RoomOptions {
                is_public: record.is_public,
                password: if record.has_password {
                    RoomPassword::Forgotten
                } else {
                    RoomPassword::Unset
                },
                max_players: record.max_players,
                creator_character_id: record.creator_character_id.clone(),
            };
            let handle = spawn_room(
                record.id.clone(),
                options,
                self.recorder.clone(),
                DEFAULT_CHANNEL_SIZE,
            );
            live.rooms.insert(record.id.clone(), handle);
            restored += 1;
        }
        drop(live);

        if restored > 0 {
            info!(rooms = restored, "room directory rehydrated");
        }
        Ok(restored)
    }

    /// Create a room and persist its directory record.
    ///
    /// With no `custom_id`, a fresh six-character code is generated,
    /// retrying until it misses every live room. The record is written
    /// before this returns, but with the registry guard released: only
    /// the creator waits on the disk.
    pub async fn create_room(
        &self,
        custom_id: Option<RoomId>,
        options: RoomOptions,
    ) -> Result<(RoomId, DateTime<Utc>), RoomError> {
        let created_at = Utc::now();

        let (room_id, record) = {
            let mut live = self.live.lock().await;
            let room_id = match custom_id {
                Some(id) => {
                    if id.is_empty() {
                        return Err(RoomError::InvalidPayload(
                            "room id must not be empty".to_string(),
                        ));
                    }
                    if live.rooms.contains_key(&id) {
                        return Err(RoomError::IdConflict(id));
                    }
                    id
                }
                None => loop {
                    let id = generate_code();
                    if !live.rooms.contains_key(&id) {
                        break id;
                    }
                },
            };

            let record = RoomRecord {
                id: room_id.clone(),
                created_at,
                creator_character_id: options.creator_character_id.clone(),
                is_public: options.is_public,
                has_password: options.has_password(),
                max_players: options.max_players,
            };
            let handle = spawn_room(
                room_id.clone(),
                options,
                self.recorder.clone(),
                DEFAULT_CHANNEL_SIZE,
            );
            live.rooms.insert(room_id.clone(), handle);
            (room_id, record)
        };

        info!(
            room_id = %room_id,
            is_public = record.is_public,
            "room created"
        );

        // The room is live either way; a failed write only costs the
        // entry its restart survival.
        if let Err(err) = self.directory.upsert(record).await {
            warn!(
                room_id = %room_id,
                error = %err,
                "failed to persist room record"
            );
        }

        Ok((room_id, created_at))
    }

    /// Drop a dead room's handle and any stale membership entries.
    ///
    /// The actor stops itself when its roster empties; this only cleans
    /// the maps. The directory record stays behind on purpose.
    async fn remove_room(&self, room_id: &RoomId) {
        let mut live = self.live.lock().await;
        if live.rooms.remove(room_id).is_some() {
            live.memberships.retain(|_, r| r != room_id);
            info!(room_id = %room_id, "room destroyed");
        }
    }

    // -- membership -------------------------------------------------------

    /// Join a connection to a room, leaving its previous room first.
    pub async fn join_room(
        &self,
        connection_id: ConnectionId,
        room_id: &RoomId,
        profile: JoinProfile,
        sender: EventSender,
    ) -> Result<JoinSummary, RoomError> {
        let previous = {
            let live = self.live.lock().await;
            live.memberships.get(&connection_id).cloned()
        };
        if let Some(current) = previous {
            if current != *room_id {
                self.leave(connection_id).await;
            }
        }

        let handle = {
            let live = self.live.lock().await;
            live.rooms.get(room_id).cloned()
        }
        .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        let summary = handle.join(connection_id, profile, sender).await?;
        let mut live = self.live.lock().await;
        live.memberships.insert(connection_id, room_id.clone());
        Ok(summary)
    }

    /// Remove a connection from its room, if it has one.
    ///
    /// Best-effort: a dead actor counts as already left. An emptied
    /// room is reaped from the live maps.
    pub async fn leave(
        &self,
        connection_id: ConnectionId,
    ) -> Option<LeaveSummary> {
        let (room_id, handle) = {
            let mut live = self.live.lock().await;
            let room_id = live.memberships.remove(&connection_id)?;
            let handle = live.rooms.get(&room_id).cloned()?;
            (room_id, handle)
        };
        let summary = handle.leave(connection_id).await.ok()?;
        if summary.remaining == 0 {
            self.remove_room(&room_id).await;
        }
        Some(summary)
    }

    // -- routing ----------------------------------------------------------

    /// Route a game operation to the requester's room.
    pub async fn act(
        &self,
        connection_id: ConnectionId,
        action: RoomAction,
    ) -> Result<(), RoomError> {
        let handle = {
            let live = self.live.lock().await;
            let room_id = live
                .memberships
                .get(&connection_id)
                .ok_or(RoomError::NotInRoom(connection_id))?;
            live.rooms
                .get(room_id)
                .cloned()
                .ok_or(RoomError::NotInRoom(connection_id))?
        };
        handle.act(connection_id, action).await
    }

    pub async fn room_info(
        &self,
        room_id: &RoomId,
    ) -> Result<RoomInfo, RoomError> {
        let handle = {
            let live = self.live.lock().await;
            live.rooms.get(room_id).cloned()
        }
        .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        handle.info().await
    }

    pub async fn verify_password(
        &self,
        room_id: &RoomId,
        attempt: &str,
    ) -> Result<bool, RoomError> {
        let handle = {
            let live = self.live.lock().await;
            live.rooms.get(room_id).cloned()
        }
        .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        handle.verify_password(attempt).await
    }

    /// Listing entries for every public room, sorted by room id.
    ///
    /// Rooms whose actor has died are skipped rather than reported.
    pub async fn list_public_rooms(&self) -> Vec<RoomSummary> {
        let handles: Vec<RoomHandle> = {
            let live = self.live.lock().await;
            live.rooms.values().cloned().collect()
        };

        let mut rooms = Vec::new();
        for handle in handles {
            if let Ok(info) = handle.info().await {
                if info.is_public {
                    rooms.push(info.summary());
                }
            }
        }
        rooms.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        rooms
    }

    // -- introspection ----------------------------------------------------

    pub async fn room_count(&self) -> usize {
        self.live.lock().await.rooms.len()
    }

    pub async fn contains(&self, room_id: &RoomId) -> bool {
        self.live.lock().await.rooms.contains_key(room_id)
    }

    pub async fn room_of(
        &self,
        connection_id: ConnectionId,
    ) -> Option<RoomId> {
        self.live.lock().await.memberships.get(&connection_id).cloned()
    }
}

fn generate_code() -> RoomId {
    let mut rng = rand::rng();
    let code: String = (0..CODE_LENGTH)
        .map(|_| {
            let index = rng.random_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[index] as char
        })
        .collect();
    RoomId::from(code)
}

// ===========================================================================
// Tests
// ===========================================================================
