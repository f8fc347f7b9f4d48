//! Durable storage for Warband.
//!
//! Two things survive a server restart:
//!
//! - the **room directory** (`rooms.json`): which rooms exist, who
//!   created them, and how they are configured, so room codes keep
//!   resolving after a redeploy;
//! - **battle history** (`battle-history/<characterId>.json`): an
//!   append-only event log per character, grouped by room.
//!
//! Live state (rosters, phase, turn order) is deliberately not here.
//! Rehydrated rooms come back empty and waiting.
//!
//! Rooms never touch the filesystem directly; they queue events on a
//! [`RecorderHandle`] and a background task does the writing.

mod directory;
mod error;
mod history;
mod recorder;

pub use directory::{RoomDirectory, RoomRecord};
pub use error::StoreError;
pub use history::{BattleEvent, CharacterHistory, HistoryStore, RoomBattleLog};
pub use recorder::{RecorderHandle, spawn_recorder};
