//! # Warband
//!
//! Battle room coordination server for turn-based multiplayer sessions.
//!
//! Warband keeps many concurrent WebSocket clients coordinated across
//! short-lived battle rooms: who is in the room, whose turn it is, who
//! hosts, and what happened. Rooms run as isolated actors, identities
//! survive reconnects, and the room list plus per-character battle
//! history survive restarts.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use warband::prelude::*;
//!
//! # async fn run() -> Result<(), WarbandError> {
//! let server = WarbandServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .data_dir("data")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod gateway;
mod server;

pub use error::WarbandError;
pub use server::{WarbandServer, WarbandServerBuilder};

/// Everything needed to run a Warband server or speak its protocol.
pub mod prelude {
    pub use warband_protocol::{
        CharacterId, ClientCommand, ErrorCode, GamePhase, InitiativeEntry,
        Participant, RoomId, RoomSummary, ServerEvent, Vitals,
    };
    pub use warband_room::{RoomOptions, RoomPassword};

    pub use crate::{WarbandError, WarbandServer, WarbandServerBuilder};
}
