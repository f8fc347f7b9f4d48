//! Room lifecycle and battle coordination for Warband.
//!
//! Each room runs as an isolated Tokio task (actor model) owning its
//! roster, battle state machine, and ephemeral event log. The registry
//! creates, rehydrates, and destroys rooms and routes connections to
//! them.
//!
//! # Key types
//!
//! - [`RoomRegistry`] — creates/destroys rooms, routes connections
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`RoomAction`] — the game operations a member can perform
//! - [`Roster`] — membership with reconnect reconciliation
//! - [`Battle`] — phase machine and initiative-ordered turn cycle
//! - [`RoomOptions`] — room settings (visibility, password, capacity)

mod battle;
mod config;
mod error;
mod registry;
mod room;
mod roster;

pub use battle::Battle;
pub use config::{DEFAULT_MAX_PLAYERS, RoomOptions, RoomPassword};
pub use error::RoomError;
pub use registry::{DEFAULT_CHANNEL_SIZE, RoomRegistry};
pub use room::{
    EventSender, JoinSummary, LeaveSummary, LoggedEvent, RoomAction,
    RoomHandle, RoomInfo,
};
pub use roster::{JoinOutcome, RemovedMember, Roster};
