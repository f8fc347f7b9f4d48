//! The two wire enums: commands from clients, events to clients.
//!
//! Both are internally tagged (`"type"` field) with camelCase tags and
//! keys, so a frame looks like the battle client's native JSON:
//!
//! ```json
//! { "type": "joinRoom", "roomId": "ABC123", "displayName": "Thorin" }
//! ```
//!
//! Acks go only to the requesting connection; broadcast events go to
//! every connection subscribed to the room.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    CharacterId, GamePhase, InitiativeEntry, Participant, RoomId,
    RoomSummary, Vitals,
};

fn default_is_public() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Everything a client may send.
///
/// Commands after `joinRoom` are room-scoped: the server resolves the
/// room from the connection's membership, so they carry no room id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientCommand {
    /// Create a room, optionally under a caller-chosen code.
    CreateRoom {
        custom_id: Option<String>,
        #[serde(default = "default_is_public")]
        is_public: bool,
        password: Option<String>,
        max_players: Option<usize>,
        creator_character_id: Option<CharacterId>,
    },

    /// List public rooms.
    ListRooms,

    /// Probe whether a room exists (lobby check before joining).
    CheckRoom { room_id: RoomId },

    /// Check a password attempt against a room.
    VerifyRoomPassword { room_id: RoomId, password: String },

    /// Join a room, or reconnect to it under a known identity.
    JoinRoom {
        room_id: RoomId,
        display_name: String,
        #[serde(default)]
        is_host: bool,
        character_id: Option<CharacterId>,
        character_class: Option<String>,
        vitals: Option<Vitals>,
    },

    /// Host only: waiting → rolling_initiative.
    StartGame,

    /// Record the sender's rolled initiative.
    RecordInitiative { value: i32 },

    /// Relay a cosmetic dice roll to the room.
    RollDice {
        faces: u32,
        value: i32,
        #[serde(default)]
        is_defender: bool,
    },

    /// Host only: rolling_initiative → combat.
    StartCombat,

    /// Perform a combat action on the sender's turn.
    PerformAction {
        action_type: String,
        #[serde(default)]
        payload: serde_json::Value,
        message: Option<String>,
    },

    /// Defender's self-reported defense choice (out of turn by design).
    ChooseDefense {
        defense_type: String,
        message: Option<String>,
    },

    /// Client-computed resolution of an attack/defense exchange.
    ReportCombatResult {
        attack_roll: i32,
        defense_roll: i32,
        #[serde(default)]
        outcome: serde_json::Value,
    },

    /// Pass the turn to the next participant in initiative order.
    EndTurn,

    /// Host only: combat → ended.
    EndBattle,

    /// Room-scoped chat.
    ChatMessage { text: String },

    /// Room-scoped narration (the storytelling channel).
    Narrate { text: String },

    /// Leave the current room without closing the connection.
    LeaveRoom,

    /// Server health/status query.
    Status,

    /// Keep-alive.
    Ping {
        #[serde(default)]
        client_time: u64,
    },
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Everything the server may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    // -- Acks (requester only) --
    RoomCreated {
        room_id: RoomId,
        created_at: DateTime<Utc>,
    },

    RoomList {
        rooms: Vec<RoomSummary>,
    },

    RoomStatus {
        room_id: RoomId,
        exists: bool,
        player_count: usize,
    },

    PasswordVerified {
        room_id: RoomId,
        valid: bool,
    },

    /// Join acknowledgment. `reconnected` distinguishes a resumed
    /// identity from a fresh join; either way the full roster and the
    /// current phase come along so the client can resync.
    RoomJoined {
        room_id: RoomId,
        reconnected: bool,
        players: Vec<Participant>,
        phase: GamePhase,
        current_turn: Option<String>,
    },

    StatusReport {
        status: String,
        uptime_secs: u64,
        connections: usize,
        rooms: usize,
        timestamp: DateTime<Utc>,
    },

    Pong {
        client_time: u64,
        server_time: u64,
    },

    Error {
        code: ErrorCode,
        message: String,
    },

    // -- Broadcasts (whole room) --
    /// A new participant joined. Never emitted for reconnects.
    PlayerJoined {
        display_name: String,
        participant: Participant,
    },

    PlayerLeft {
        display_name: String,
        /// Display names of everyone still in the room.
        players: Vec<String>,
    },

    HostChanged {
        new_host: String,
        players: Vec<Participant>,
    },

    GameStarted {
        phase: GamePhase,
    },

    /// Incremental state push: the phase, plus whichever of the
    /// initiative entry and current turn changed.
    GameStateUpdated {
        phase: GamePhase,
        player_initiative: Option<InitiativeEntry>,
        current_turn: Option<String>,
    },

    DiceRolled {
        display_name: String,
        faces: u32,
        value: i32,
        is_defender: bool,
    },

    ActionPerformed {
        display_name: String,
        action_type: String,
        payload: serde_json::Value,
        message: Option<String>,
    },

    DefenseChosen {
        display_name: String,
        defense_type: String,
        message: Option<String>,
    },

    CombatResolved {
        display_name: String,
        attack_roll: i32,
        defense_roll: i32,
        outcome: serde_json::Value,
    },

    MessageReceived {
        sender: String,
        text: String,
        timestamp: DateTime<Utc>,
    },

    NarrationReceived {
        sender: String,
        text: String,
        timestamp: DateTime<Utc>,
    },

    BattleEnded {
        phase: GamePhase,
    },
}

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Named error codes carried by [`ServerEvent::Error`].
///
/// Persistence failures are deliberately absent: they degrade to
/// in-memory-only operation and are logged, never sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RoomNotFound,
    RoomIdConflict,
    GameAlreadyStarted,
    RoomFull,
    Unauthorized,
    NotYourTurn,
    NoInitiativeRolled,
    NotInRoom,
    InvalidPhase,
    InvalidPayload,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCode::RoomNotFound => "ROOM_NOT_FOUND",
            ErrorCode::RoomIdConflict => "ROOM_ID_CONFLICT",
            ErrorCode::GameAlreadyStarted => "GAME_ALREADY_STARTED",
            ErrorCode::RoomFull => "ROOM_FULL",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::NotYourTurn => "NOT_YOUR_TURN",
            ErrorCode::NoInitiativeRolled => "NO_INITIATIVE_ROLLED",
            ErrorCode::NotInRoom => "NOT_IN_ROOM",
            ErrorCode::InvalidPhase => "INVALID_PHASE",
            ErrorCode::InvalidPayload => "INVALID_PAYLOAD",
        };
        f.write_str(s)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use warband_transport::ConnectionId;

    use super::*;

    // =====================================================================
    // ClientCommand — JSON shapes
    // =====================================================================

    #[test]
    fn test_create_room_json_format() {
        let cmd = ClientCommand::CreateRoom {
            custom_id: Some("ABC123".into()),
            is_public: false,
            password: Some("secret".into()),
            max_players: Some(4),
            creator_character_id: Some(CharacterId::new("char-1")),
        };
        let json: serde_json::Value = serde_json::to_value(&cmd).unwrap();

        assert_eq!(json["type"], "createRoom");
        assert_eq!(json["customId"], "ABC123");
        assert_eq!(json["isPublic"], false);
        assert_eq!(json["password"], "secret");
        assert_eq!(json["maxPlayers"], 4);
        assert_eq!(json["creatorCharacterId"], "char-1");
    }

    #[test]
    fn test_create_room_is_public_defaults_true() {
        let json = r#"{"type": "createRoom"}"#;
        let cmd: ClientCommand = serde_json::from_str(json).unwrap();
        match cmd {
            ClientCommand::CreateRoom {
                is_public,
                custom_id,
                password,
                ..
            } => {
                assert!(is_public);
                assert!(custom_id.is_none());
                assert!(password.is_none());
            }
            other => panic!("expected CreateRoom, got {other:?}"),
        }
    }

    #[test]
    fn test_join_room_room_id_normalized_on_decode() {
        let json = r#"{
            "type": "joinRoom",
            "roomId": "abc123",
            "displayName": "Thorin"
        }"#;
        let cmd: ClientCommand = serde_json::from_str(json).unwrap();
        match cmd {
            ClientCommand::JoinRoom {
                room_id,
                display_name,
                is_host,
                character_id,
                ..
            } => {
                assert_eq!(room_id, RoomId::new("ABC123"));
                assert_eq!(display_name, "Thorin");
                assert!(!is_host, "isHost defaults to false");
                assert!(character_id.is_none());
            }
            other => panic!("expected JoinRoom, got {other:?}"),
        }
    }

    #[test]
    fn test_join_room_with_vitals_round_trip() {
        let cmd = ClientCommand::JoinRoom {
            room_id: RoomId::new("XYZ999"),
            display_name: "Mira".into(),
            is_host: true,
            character_id: Some(CharacterId::new("char-7")),
            character_class: Some("Maga".into()),
            vitals: Some(Vitals {
                current_hp: 60,
                max_hp: 80,
                current_mp: 120,
                max_mp: 120,
            }),
        };
        let bytes = serde_json::to_vec(&cmd).unwrap();
        let decoded: ClientCommand = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(cmd, decoded);
    }

    #[test]
    fn test_perform_action_payload_defaults_to_null() {
        let json = r#"{"type": "performAction", "actionType": "attack"}"#;
        let cmd: ClientCommand = serde_json::from_str(json).unwrap();
        match cmd {
            ClientCommand::PerformAction {
                action_type,
                payload,
                message,
            } => {
                assert_eq!(action_type, "attack");
                assert!(payload.is_null());
                assert!(message.is_none());
            }
            other => panic!("expected PerformAction, got {other:?}"),
        }
    }

    #[test]
    fn test_perform_action_carries_arbitrary_payload() {
        let json = r#"{
            "type": "performAction",
            "actionType": "use_item",
            "payload": {"itemName": "Poção", "hpRestored": 20}
        }"#;
        let cmd: ClientCommand = serde_json::from_str(json).unwrap();
        match cmd {
            ClientCommand::PerformAction { payload, .. } => {
                assert_eq!(payload["itemName"], "Poção");
                assert_eq!(payload["hpRestored"], 20);
            }
            other => panic!("expected PerformAction, got {other:?}"),
        }
    }

    #[test]
    fn test_unit_commands_round_trip() {
        for cmd in [
            ClientCommand::ListRooms,
            ClientCommand::StartGame,
            ClientCommand::StartCombat,
            ClientCommand::EndTurn,
            ClientCommand::EndBattle,
            ClientCommand::LeaveRoom,
            ClientCommand::Status,
        ] {
            let bytes = serde_json::to_vec(&cmd).unwrap();
            let decoded: ClientCommand =
                serde_json::from_slice(&bytes).unwrap();
            assert_eq!(cmd, decoded);
        }
    }

    #[test]
    fn test_start_game_tag_is_camel_case() {
        let json = serde_json::to_string(&ClientCommand::StartGame).unwrap();
        assert_eq!(json, r#"{"type":"startGame"}"#);
    }

    #[test]
    fn test_ping_client_time_defaults_to_zero() {
        let cmd: ClientCommand =
            serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert_eq!(cmd, ClientCommand::Ping { client_time: 0 });
    }

    // =====================================================================
    // ServerEvent — JSON shapes
    // =====================================================================

    #[test]
    fn test_error_event_json_format() {
        let ev = ServerEvent::Error {
            code: ErrorCode::RoomNotFound,
            message: "no such room".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();

        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], "ROOM_NOT_FOUND");
        assert_eq!(json["message"], "no such room");
    }

    #[test]
    fn test_error_code_wire_names() {
        for (code, expected) in [
            (ErrorCode::GameAlreadyStarted, "\"GAME_ALREADY_STARTED\""),
            (ErrorCode::NotYourTurn, "\"NOT_YOUR_TURN\""),
            (ErrorCode::NoInitiativeRolled, "\"NO_INITIATIVE_ROLLED\""),
            (ErrorCode::InvalidPayload, "\"INVALID_PAYLOAD\""),
        ] {
            assert_eq!(serde_json::to_string(&code).unwrap(), expected);
        }
    }

    #[test]
    fn test_error_code_display_matches_wire_name() {
        assert_eq!(ErrorCode::RoomFull.to_string(), "ROOM_FULL");
        assert_eq!(ErrorCode::NotInRoom.to_string(), "NOT_IN_ROOM");
    }

    #[test]
    fn test_game_state_updated_json_format() {
        let ev = ServerEvent::GameStateUpdated {
            phase: GamePhase::RollingInitiative,
            player_initiative: Some(InitiativeEntry {
                display_name: "Thorin".into(),
                initiative: 15,
            }),
            current_turn: None,
        };
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();

        assert_eq!(json["type"], "gameStateUpdated");
        assert_eq!(json["phase"], "rolling_initiative");
        assert_eq!(json["playerInitiative"]["displayName"], "Thorin");
        assert_eq!(json["playerInitiative"]["initiative"], 15);
        assert!(json["currentTurn"].is_null());
    }

    #[test]
    fn test_room_joined_json_format() {
        let ev = ServerEvent::RoomJoined {
            room_id: RoomId::new("ABC123"),
            reconnected: true,
            players: vec![Participant {
                connection_id: ConnectionId::new(5),
                display_name: "Mira".into(),
                character_id: None,
                character_class: None,
                is_host: true,
                initiative: 9,
                vitals: Vitals::default(),
            }],
            phase: GamePhase::Combat,
            current_turn: Some("Mira".into()),
        };
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();

        assert_eq!(json["type"], "roomJoined");
        assert_eq!(json["roomId"], "ABC123");
        assert_eq!(json["reconnected"], true);
        assert_eq!(json["players"][0]["displayName"], "Mira");
        assert_eq!(json["phase"], "combat");
        assert_eq!(json["currentTurn"], "Mira");
    }

    #[test]
    fn test_status_report_round_trip() {
        let ev = ServerEvent::StatusReport {
            status: "ok".into(),
            uptime_secs: 42,
            connections: 3,
            rooms: 1,
            timestamp: Utc::now(),
        };
        let bytes = serde_json::to_vec(&ev).unwrap();
        let decoded: ServerEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(ev, decoded);
    }

    #[test]
    fn test_message_received_timestamp_is_rfc3339() {
        let ev = ServerEvent::MessageReceived {
            sender: "Mira".into(),
            text: "hello".into(),
            timestamp: "2024-05-01T12:00:00Z".parse().unwrap(),
        };
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["timestamp"], "2024-05-01T12:00:00Z");
    }

    // =====================================================================
    // Malformed input
    // =====================================================================

    #[test]
    fn test_decode_garbage_returns_error() {
        let garbage = b"not json at all";
        let result: Result<ClientCommand, _> =
            serde_json::from_slice(garbage);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_missing_type_tag_returns_error() {
        let wrong = r#"{"roomId": "ABC123"}"#;
        let result: Result<ClientCommand, _> = serde_json::from_str(wrong);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_unknown_command_type_returns_error() {
        let unknown = r#"{"type": "flyToMoon", "speed": 9000}"#;
        let result: Result<ClientCommand, _> =
            serde_json::from_str(unknown);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_missing_required_field_returns_error() {
        // joinRoom without displayName.
        let missing = r#"{"type": "joinRoom", "roomId": "ABC123"}"#;
        let result: Result<ClientCommand, _> =
            serde_json::from_str(missing);
        assert!(result.is_err());
    }
}
