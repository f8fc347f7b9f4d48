//! Room creation options.

use warband_protocol::CharacterId;

/// Default player capacity when the creator does not specify one.
pub const DEFAULT_MAX_PLAYERS: usize = 8;

// ---------------------------------------------------------------------------
// Passwords
// ---------------------------------------------------------------------------

/// A room's password state.
///
/// Only the presence flag is ever persisted, so a room that comes back
/// after a restart knows it *had* a password without knowing what it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomPassword {
    /// No password required.
    Unset,
    /// Password known and compared exactly.
    Set(String),
    /// Created with a password that did not survive a restart. Listings
    /// keep advertising the flag so clients still prompt; verification
    /// accepts any attempt because there is nothing left to compare.
    Forgotten,
}

impl RoomPassword {
    /// Build from the optional plain-text password a creator supplied.
    /// An empty string counts as no password.
    pub fn from_plain(password: Option<String>) -> Self {
        match password {
            Some(p) if !p.is_empty() => Self::Set(p),
            _ => Self::Unset,
        }
    }

    /// Whether the room advertises password protection.
    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    /// True if the room has no password or the attempt matches exactly.
    pub fn verify(&self, attempt: &str) -> bool {
        match self {
            Self::Unset | Self::Forgotten => true,
            Self::Set(expected) => expected == attempt,
        }
    }
}

impl Default for RoomPassword {
    fn default() -> Self {
        Self::Unset
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Settings fixed when a room is created.
#[derive(Debug, Clone)]
pub struct RoomOptions {
    /// Whether the room shows up in public listings.
    pub is_public: bool,
    pub password: RoomPassword,
    pub max_players: usize,
    /// Character of the creator, for the persisted record.
    pub creator_character_id: Option<CharacterId>,
}

impl RoomOptions {
    pub fn has_password(&self) -> bool {
        self.password.is_set()
    }
}

impl Default for RoomOptions {
    fn default() -> Self {
        Self {
            is_public: true,
            password: RoomPassword::Unset,
            max_players: DEFAULT_MAX_PLAYERS,
            creator_character_id: None,
        }
    }
}
