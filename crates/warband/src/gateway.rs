//! Per-connection gateway: decode commands, route them, relay events.
//!
//! Each accepted connection gets its own Tokio task running the
//! gateway, plus a writer task draining the connection's outbound
//! queue. Room actors push broadcasts onto that same queue, so a
//! client observes its acks and the room's broadcasts in exactly the
//! order the room produced them.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::Utc;
use tokio::sync::mpsc;
use warband_protocol::{
    ClientCommand, Codec, ErrorCode, JsonCodec, RoomId, ServerEvent,
};
use warband_room::{
    DEFAULT_MAX_PLAYERS, RoomAction, RoomError, RoomOptions, RoomPassword,
};
use warband_session::JoinProfile;
use warband_transport::{Connection, ConnectionId, WebSocketConnection};

use crate::WarbandError;
use crate::server::ServerState;

/// Drop guard that evicts a connection from its room when the gateway
/// exits.
///
/// This ensures cleanup happens even if the gateway panics. Since
/// `Drop` is synchronous, we spawn a fire-and-forget task for the
/// async eviction.
struct ConnectionGuard {
    connection_id: ConnectionId,
    state: Arc<ServerState>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.state.connections.fetch_sub(1, Ordering::Relaxed);
        let connection_id = self.connection_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let _ = state.registry.leave(connection_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), WarbandError> {
    let connection_id = conn.id();
    tracing::debug!(%connection_id, "handling new connection");

    state.connections.fetch_add(1, Ordering::Relaxed);
    let _guard = ConnectionGuard {
        connection_id,
        state: Arc::clone(&state),
    };

    // Every outbound event funnels through this queue; the room actor
    // holds a clone once the connection joins.
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    spawn_writer(conn.clone(), state.codec, events_rx);

    // A quiet socket is a dead one; clients ping well inside the
    // configured window.
    loop {
        let data =
            match tokio::time::timeout(state.idle_timeout, conn.recv()).await {
                Ok(Ok(Some(data))) => data,
                Ok(Ok(None)) => {
                    tracing::debug!(
                        %connection_id,
                        "connection closed cleanly"
                    );
                    break;
                }
                Ok(Err(e)) => {
                    tracing::debug!(%connection_id, error = %e, "recv error");
                    return Err(e.into());
                }
                Err(_) => {
                    tracing::info!(%connection_id, "connection idle, dropping");
                    break;
                }
            };

        let command: ClientCommand = match state.codec.decode(&data) {
            Ok(command) => command,
            Err(e) => {
                tracing::debug!(
                    %connection_id,
                    error = %e,
                    "unparseable command"
                );
                send(
                    &events_tx,
                    ServerEvent::Error {
                        code: ErrorCode::InvalidPayload,
                        message: "could not parse command".to_string(),
                    },
                );
                continue;
            }
        };

        dispatch(&state, connection_id, &events_tx, command).await;
    }

    // _guard drops here → room eviction fires.
    Ok(())
}

/// Drains the outbound queue into the socket.
///
/// Exits when the queue closes (gateway and room both done with it) or
/// the socket rejects a send (client gone).
fn spawn_writer(
    conn: WebSocketConnection,
    codec: JsonCodec,
    mut events: mpsc::UnboundedReceiver<ServerEvent>,
) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let bytes = match codec.encode(&event) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!(error = %e, "failed to encode event");
                    continue;
                }
            };
            if conn.send(&bytes).await.is_err() {
                break;
            }
        }
    });
}

/// Routes one decoded command.
///
/// Lobby commands answer on the spot; room-scoped commands resolve
/// through the membership index to the room actor. Failures become
/// error events, never dropped connections.
async fn dispatch(
    state: &Arc<ServerState>,
    connection_id: ConnectionId,
    events: &mpsc::UnboundedSender<ServerEvent>,
    command: ClientCommand,
) {
    match command {
        ClientCommand::CreateRoom {
            custom_id,
            is_public,
            password,
            max_players,
            creator_character_id,
        } => {
            let options = RoomOptions {
                is_public,
                password: RoomPassword::from_plain(password),
                // Zero slots means nobody chose; fall back to default.
                max_players: max_players
                    .filter(|&n| n > 0)
                    .unwrap_or(DEFAULT_MAX_PLAYERS),
                creator_character_id,
            };
            let result = state
                .registry
                .create_room(custom_id.map(RoomId::from), options)
                .await;
            match result {
                Ok((room_id, created_at)) => send(
                    events,
                    ServerEvent::RoomCreated {
                        room_id,
                        created_at,
                    },
                ),
                Err(e) => send_error(events, &e),
            }
        }

        ClientCommand::ListRooms => {
            let rooms = state.registry.list_public_rooms().await;
            send(events, ServerEvent::RoomList { rooms });
        }

        ClientCommand::CheckRoom { room_id } => {
            let info = state.registry.room_info(&room_id).await;
            let event = match info {
                Ok(info) => ServerEvent::RoomStatus {
                    room_id,
                    exists: true,
                    player_count: info.player_count,
                },
                Err(_) => ServerEvent::RoomStatus {
                    room_id,
                    exists: false,
                    player_count: 0,
                },
            };
            send(events, event);
        }

        ClientCommand::VerifyRoomPassword { room_id, password } => {
            let result =
                state.registry.verify_password(&room_id, &password).await;
            match result {
                Ok(valid) => send(
                    events,
                    ServerEvent::PasswordVerified { room_id, valid },
                ),
                Err(e) => send_error(events, &e),
            }
        }

        ClientCommand::JoinRoom {
            room_id,
            display_name,
            is_host,
            character_id,
            character_class,
            vitals,
        } => {
            let profile = JoinProfile {
                display_name,
                character_id,
                character_class,
                vitals,
                wants_host: is_host,
            };
            let result = state
                .registry
                .join_room(connection_id, &room_id, profile, events.clone())
                .await;
            // The roomJoined ack is queued by the room actor itself.
            if let Err(e) = result {
                send_error(events, &e);
            }
        }

        ClientCommand::LeaveRoom => {
            let _ = state.registry.leave(connection_id).await;
        }

        ClientCommand::Status => {
            let rooms = state.registry.room_count().await;
            send(
                events,
                ServerEvent::StatusReport {
                    status: "ok".to_string(),
                    uptime_secs: state.started_at.elapsed().as_secs(),
                    connections: state.connections.load(Ordering::Relaxed),
                    rooms,
                    timestamp: Utc::now(),
                },
            );
        }

        ClientCommand::Ping { client_time } => {
            send(
                events,
                ServerEvent::Pong {
                    client_time,
                    server_time: Utc::now().timestamp_millis() as u64,
                },
            );
        }

        other => {
            let Some(action) = room_action(other) else {
                return;
            };
            if let Err(e) = state.registry.act(connection_id, action).await {
                send_error(events, &e);
            }
        }
    }
}

/// Maps a room-scoped command onto the action the room actor runs.
fn room_action(command: ClientCommand) -> Option<RoomAction> {
    match command {
        ClientCommand::StartGame => Some(RoomAction::StartGame),
        ClientCommand::RecordInitiative { value } => {
            Some(RoomAction::RecordInitiative { value })
        }
        ClientCommand::RollDice {
            faces,
            value,
            is_defender,
        } => Some(RoomAction::RollDice {
            faces,
            value,
            is_defender,
        }),
        ClientCommand::StartCombat => Some(RoomAction::StartCombat),
        ClientCommand::PerformAction {
            action_type,
            payload,
            message,
        } => Some(RoomAction::Perform {
            action_type,
            payload,
            message,
        }),
        ClientCommand::ChooseDefense {
            defense_type,
            message,
        } => Some(RoomAction::ChooseDefense {
            defense_type,
            message,
        }),
        ClientCommand::ReportCombatResult {
            attack_roll,
            defense_roll,
            outcome,
        } => Some(RoomAction::ReportResult {
            attack_roll,
            defense_roll,
            outcome,
        }),
        ClientCommand::EndTurn => Some(RoomAction::EndTurn),
        ClientCommand::EndBattle => Some(RoomAction::EndBattle),
        ClientCommand::ChatMessage { text } => {
            Some(RoomAction::Chat { text })
        }
        ClientCommand::Narrate { text } => Some(RoomAction::Narrate { text }),
        // Lobby commands are dispatched before reaching here.
        _ => None,
    }
}

/// Queues an event for the writer task. A closed queue means the
/// connection is already going away; the event is dropped.
fn send(events: &mpsc::UnboundedSender<ServerEvent>, event: ServerEvent) {
    let _ = events.send(event);
}

fn send_error(
    events: &mpsc::UnboundedSender<ServerEvent>,
    error: &RoomError,
) {
    send(
        events,
        ServerEvent::Error {
            code: error.wire_code(),
            message: error.to_string(),
        },
    );
}
