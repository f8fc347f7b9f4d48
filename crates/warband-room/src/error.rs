//! Error types for the room layer.

use warband_protocol::{ErrorCode, GamePhase, RoomId};
use warband_transport::ConnectionId;

/// Errors that can occur during room operations.
///
/// Every variant maps onto exactly one wire code via [`wire_code`]
/// (`RoomError::wire_code`); the mapping is what the requesting
/// connection sees, never other members.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist (or is no longer live).
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// A custom room id was requested but is already live.
    #[error("room id {0} is already in use")]
    IdConflict(RoomId),

    /// The room has no free player slots.
    #[error("room is full ({0} players max)")]
    RoomFull(usize),

    /// The game has left the waiting phase and the operation assumes it
    /// has not (non-host join of a started game, double start).
    #[error("the game has already started")]
    GameAlreadyStarted,

    /// A host-only operation was requested by a non-host.
    #[error("only the host may {0}")]
    NotHost(&'static str),

    /// A turn-gated operation was requested out of turn.
    #[error("it is {0}'s turn")]
    NotYourTurn(String),

    /// Combat cannot start before anyone has rolled initiative.
    #[error("no participant has rolled initiative")]
    NoInitiativeRolled,

    /// The connection holds no membership in the addressed room.
    #[error("connection {0} is not in a room")]
    NotInRoom(ConnectionId),

    /// The operation is not legal in the room's current phase.
    #[error("cannot {action} during {phase}")]
    InvalidPhase {
        action: &'static str,
        phase: GamePhase,
    },

    /// The request data itself is unusable (empty display name, blank id).
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The room's command channel is closed; the actor is gone.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}

impl RoomError {
    /// The structured code reported to the requesting connection.
    pub fn wire_code(&self) -> ErrorCode {
        match self {
            RoomError::NotFound(_) => ErrorCode::RoomNotFound,
            RoomError::IdConflict(_) => ErrorCode::RoomIdConflict,
            RoomError::RoomFull(_) => ErrorCode::RoomFull,
            RoomError::GameAlreadyStarted => ErrorCode::GameAlreadyStarted,
            RoomError::NotHost(_) => ErrorCode::Unauthorized,
            RoomError::NotYourTurn(_) => ErrorCode::NotYourTurn,
            RoomError::NoInitiativeRolled => ErrorCode::NoInitiativeRolled,
            RoomError::NotInRoom(_) => ErrorCode::NotInRoom,
            RoomError::InvalidPhase { .. } => ErrorCode::InvalidPhase,
            RoomError::InvalidPayload(_) => ErrorCode::InvalidPayload,
            // A vanished actor is indistinguishable from a vanished room.
            RoomError::Unavailable(_) => ErrorCode::RoomNotFound,
        }
    }
}
