//! Wire protocol for Warband.
//!
//! This crate defines the language clients and server speak:
//!
//! - **Types** ([`RoomId`], [`GamePhase`], [`Participant`], ...) — the
//!   structures that travel on the wire.
//! - **Messages** ([`ClientCommand`], [`ServerEvent`], [`ErrorCode`]) —
//!   the tagged frames themselves.
//! - **Codec** ([`Codec`], [`JsonCodec`]) — how frames become bytes.
//!
//! The protocol layer sits between transport (raw frames) and the room
//! domain. It knows message shapes, not connections or rooms:
//!
//! ```text
//! Transport (bytes) → Protocol (commands/events) → Rooms (state)
//! ```

mod codec;
mod error;
mod message;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use message::{ClientCommand, ErrorCode, ServerEvent};
pub use types::{
    CharacterId, GamePhase, InitiativeEntry, Participant, RoomId,
    RoomSummary, Vitals,
};
