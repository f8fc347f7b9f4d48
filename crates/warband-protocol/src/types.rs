//! Core protocol types for Warband's wire format.
//!
//! Everything here travels on the wire: identifiers, the game phase
//! enum, participant records, and room summaries. Field names serialize
//! as camelCase to match the battle client's JSON.

use std::fmt;

use serde::{Deserialize, Serialize};
use warband_transport::ConnectionId;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A room code: short, human-typeable, canonically uppercase.
///
/// Normalization happens at construction, so two codes that differ only
/// in case always compare equal and hash identically. Deserializing
/// `"abc123"` yields the same `RoomId` as `"ABC123"`.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    /// Creates a room id, trimming whitespace and uppercasing.
    pub fn new(code: impl Into<String>) -> Self {
        Self::from(code.into())
    }

    /// The canonical (uppercase) code.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for codes that normalize to nothing.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for RoomId {
    fn from(code: String) -> Self {
        Self(code.trim().to_uppercase())
    }
}

impl From<RoomId> for String {
    fn from(id: RoomId) -> Self {
        id.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An opaque reference to a character record owned by the web app.
///
/// When present on a participant it is the durable identity across
/// reconnects, and the key under which battle history is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterId(pub String);

impl CharacterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Game phase
// ---------------------------------------------------------------------------

/// The per-room game state machine.
///
/// Wire strings are snake_case (`"rolling_initiative"`), matching what
/// the battle client stores and displays.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Players gathering; the only phase that admits non-host joins.
    #[default]
    Waiting,
    /// Host started the game; participants roll for turn order.
    RollingInitiative,
    /// Turn-based combat in progress.
    Combat,
    /// Battle over. Terminal.
    Ended,
}

impl GamePhase {
    /// Whether the game has left the lobby.
    pub fn has_started(self) -> bool {
        !matches!(self, GamePhase::Waiting)
    }

    /// Whether `next` is a legal direct transition from `self`.
    pub fn can_transition_to(self, next: GamePhase) -> bool {
        matches!(
            (self, next),
            (GamePhase::Waiting, GamePhase::RollingInitiative)
                | (GamePhase::RollingInitiative, GamePhase::Combat)
                | (GamePhase::Combat, GamePhase::Ended)
        )
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GamePhase::Waiting => "waiting",
            GamePhase::RollingInitiative => "rolling_initiative",
            GamePhase::Combat => "combat",
            GamePhase::Ended => "ended",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

/// Hit and mana points for a participant.
///
/// The coordinator never computes damage; it relays what clients report
/// and preserves these across reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vitals {
    pub current_hp: i32,
    pub max_hp: i32,
    pub current_mp: i32,
    pub max_mp: i32,
}

impl Default for Vitals {
    fn default() -> Self {
        Self {
            current_hp: 100,
            max_hp: 100,
            current_mp: 80,
            max_mp: 80,
        }
    }
}

/// A connection's membership record within a room.
///
/// Broadcast in `playerJoined` and in the `roomJoined` ack, so the whole
/// record is wire-visible. `connection_id` is the *current* transport
/// identity; a reconnect replaces it in place and leaves everything else
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub character_id: Option<CharacterId>,
    pub character_class: Option<String>,
    pub is_host: bool,
    /// 0 until rolled.
    pub initiative: i32,
    #[serde(flatten)]
    pub vitals: Vitals,
}

/// One participant's rolled initiative, carried by `gameStateUpdated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiativeEntry {
    pub display_name: String,
    pub initiative: i32,
}

// ---------------------------------------------------------------------------
// Room summaries
// ---------------------------------------------------------------------------

/// A public room as returned by the room listing.
///
/// Never carries the password itself, only whether one is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub player_count: usize,
    pub max_players: usize,
    pub has_password: bool,
    pub phase: GamePhase,
}

// =========================================================================
// Tests
// =========================================================================
