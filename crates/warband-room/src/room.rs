//! Room actor: an isolated Tokio task that owns one battle session.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. All mutation for one room flows through that
//! single task, so same-room operations are strictly ordered while
//! different rooms never contend.
//!
//! Outbound events are pushed onto per-connection unbounded channels
//! (one writer task per connection, owned by the gateway). Because the
//! actor pushes acks and broadcasts in the order it produces them, every
//! subscriber observes a room's events in production order.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};
use warband_protocol::{
    GamePhase, Participant, RoomId, RoomSummary, ServerEvent,
};
use warband_session::{IdentityMatch, JoinProfile, reconcile};
use warband_store::{BattleEvent, RecorderHandle};
use warband_transport::ConnectionId;

use crate::{Battle, RoomError, RoomOptions, Roster};

/// Channel sender delivering events to one connection's writer task.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

// ---------------------------------------------------------------------------
// Replies and snapshots
// ---------------------------------------------------------------------------

/// What a join changed, for the caller's bookkeeping and logs.
/// The `roomJoined` ack itself is queued by the actor before replying.
#[derive(Debug, Clone)]
pub struct JoinSummary {
    pub display_name: String,
    pub reconnected: bool,
}

/// What a leave changed. `remaining == 0` means the room must die.
#[derive(Debug, Clone)]
pub struct LeaveSummary {
    pub display_name: String,
    pub remaining: usize,
}

/// A snapshot of room metadata.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub is_public: bool,
    pub has_password: bool,
    pub player_count: usize,
    pub max_players: usize,
    pub phase: GamePhase,
    pub current_turn: Option<String>,
    pub events_logged: usize,
}

impl RoomInfo {
    /// The listing entry for this room. Never includes the password.
    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room_id: self.room_id.clone(),
            player_count: self.player_count,
            max_players: self.max_players,
            has_password: self.has_password,
            phase: self.phase,
        }
    }
}

/// One entry in the room's ephemeral event log.
///
/// The durable copy (for members with a character) lives in the battle
/// history store; this log dies with the room.
#[derive(Debug, Clone)]
pub struct LoggedEvent {
    pub actor: String,
    pub event_type: String,
    pub data: serde_json::Value,
    pub at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// A game operation performed by a member connection.
#[derive(Debug, Clone)]
pub enum RoomAction {
    StartGame,
    RecordInitiative {
        value: i32,
    },
    RollDice {
        faces: u32,
        value: i32,
        is_defender: bool,
    },
    StartCombat,
    Perform {
        action_type: String,
        payload: serde_json::Value,
        message: Option<String>,
    },
    ChooseDefense {
        defense_type: String,
        message: Option<String>,
    },
    ReportResult {
        attack_roll: i32,
        defense_roll: i32,
        outcome: serde_json::Value,
    },
    EndTurn,
    EndBattle,
    Chat {
        text: String,
    },
    Narrate {
        text: String,
    },
}

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in each variant is the reply channel; the
/// caller sends a command and awaits the response there.
pub(crate) enum RoomCommand {
    Join {
        connection_id: ConnectionId,
        profile: JoinProfile,
        sender: EventSender,
        reply: oneshot::Sender<Result<JoinSummary, RoomError>>,
    },
    Leave {
        connection_id: ConnectionId,
        reply: oneshot::Sender<Result<LeaveSummary, RoomError>>,
    },
    Act {
        connection_id: ConnectionId,
        action: RoomAction,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Info {
        reply: oneshot::Sender<RoomInfo>,
    },
    VerifyPassword {
        attempt: String,
        reply: oneshot::Sender<bool>,
    },
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle to a running room actor.
///
/// Cheap to clone; the registry holds one per live room.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub async fn join(
        &self,
        connection_id: ConnectionId,
        profile: JoinProfile,
        sender: EventSender,
    ) -> Result<JoinSummary, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                connection_id,
                profile,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?
    }

    pub async fn leave(
        &self,
        connection_id: ConnectionId,
    ) -> Result<LeaveSummary, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Leave {
                connection_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?
    }

    pub async fn act(
        &self,
        connection_id: ConnectionId,
        action: RoomAction,
    ) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Act {
                connection_id,
                action,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Info { reply: reply_tx })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }

    pub async fn verify_password(
        &self,
        attempt: &str,
    ) -> Result<bool, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::VerifyPassword {
                attempt: attempt.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct RoomActor {
    room_id: RoomId,
    options: RoomOptions,
    roster: Roster,
    /// Outbound channel per subscribed connection. Mirrors the roster.
    senders: HashMap<ConnectionId, EventSender>,
    battle: Battle,
    event_log: Vec<LoggedEvent>,
    recorder: RecorderHandle,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        info!(room_id = %self.room_id, "room started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    connection_id,
                    profile,
                    sender,
                    reply,
                } => {
                    let result =
                        self.handle_join(connection_id, profile, sender);
                    let _ = reply.send(result);
                }
                RoomCommand::Leave {
                    connection_id,
                    reply,
                } => {
                    let result = self.handle_leave(connection_id);
                    let emptied = matches!(
                        &result,
                        Ok(summary) if summary.remaining == 0
                    );
                    let _ = reply.send(result);
                    if emptied {
                        info!(room_id = %self.room_id, "room empty, stopping");
                        break;
                    }
                }
                RoomCommand::Act {
                    connection_id,
                    action,
                    reply,
                } => {
                    let result = self.handle_action(connection_id, action);
                    let _ = reply.send(result);
                }
                RoomCommand::Info { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomCommand::VerifyPassword { attempt, reply } => {
                    let _ =
                        reply.send(self.options.password.verify(&attempt));
                }
            }
        }

        info!(room_id = %self.room_id, "room stopped");
    }

    // -- membership -------------------------------------------------------

    fn handle_join(
        &mut self,
        connection_id: ConnectionId,
        profile: JoinProfile,
        sender: EventSender,
    ) -> Result<JoinSummary, RoomError> {
        profile
            .validate()
            .map_err(|e| RoomError::InvalidPayload(e.to_string()))?;

        // Started rooms only readmit host-claim joins; the claim is how
        // returning clients mark themselves after the lobby closed.
        if self.battle.started() && !profile.wants_host {
            return Err(RoomError::GameAlreadyStarted);
        }
        if matches!(
            reconcile(self.roster.members(), &profile),
            IdentityMatch::New
        ) && self.roster.len() >= self.options.max_players
        {
            return Err(RoomError::RoomFull(self.options.max_players));
        }

        let outcome = self.roster.join(connection_id, &profile);
        if let Some(old) = outcome.replaced_connection {
            if old != connection_id {
                self.senders.remove(&old);
            }
        }
        self.senders.insert(connection_id, sender);

        let name = outcome.participant.display_name.clone();
        if outcome.reconnected {
            // A reconnect must not look like a new join to observers.
            debug!(
                room_id = %self.room_id,
                name = %name,
                %connection_id,
                "participant reconnected"
            );
        } else {
            info!(
                room_id = %self.room_id,
                name = %name,
                players = self.roster.len(),
                "player joined"
            );
            self.log_event(&name, "player_joined", json!({}));
            // The whole room hears the announcement, the joiner included;
            // the ack follows it.
            self.broadcast(ServerEvent::PlayerJoined {
                display_name: name.clone(),
                participant: outcome.participant.clone(),
            });
        }

        let ack = ServerEvent::RoomJoined {
            room_id: self.room_id.clone(),
            reconnected: outcome.reconnected,
            players: self.roster.members().to_vec(),
            phase: self.battle.phase(),
            current_turn: self.battle.current_turn().map(str::to_string),
        };
        self.send_to(connection_id, ack);

        Ok(JoinSummary {
            display_name: name,
            reconnected: outcome.reconnected,
        })
    }

    fn handle_leave(
        &mut self,
        connection_id: ConnectionId,
    ) -> Result<LeaveSummary, RoomError> {
        let Some(removed) = self.roster.remove(connection_id) else {
            return Err(RoomError::NotInRoom(connection_id));
        };
        self.senders.remove(&connection_id);
        let name = removed.participant.display_name.clone();

        info!(
            room_id = %self.room_id,
            name = %name,
            players = self.roster.len(),
            "player left"
        );
        self.log_event(&name, "player_left", json!({}));

        if !self.roster.is_empty() {
            // Succession is announced before the departure itself.
            if let Some(new_host) = removed.new_host {
                info!(
                    room_id = %self.room_id,
                    new_host = %new_host.display_name,
                    "host reassigned"
                );
                self.log_event(
                    &new_host.display_name,
                    "host_changed",
                    json!({}),
                );
                self.broadcast(ServerEvent::HostChanged {
                    new_host: new_host.display_name.clone(),
                    players: self.roster.members().to_vec(),
                });
            }
            self.broadcast(ServerEvent::PlayerLeft {
                display_name: name.clone(),
                players: self.roster.names(),
            });
            // Keep current_turn pointing at a live member.
            if let Some(next) = self.battle.remove_participant(&name) {
                self.broadcast(ServerEvent::GameStateUpdated {
                    phase: self.battle.phase(),
                    player_initiative: None,
                    current_turn: Some(next),
                });
            }
        }

        Ok(LeaveSummary {
            display_name: name,
            remaining: self.roster.len(),
        })
    }

    // -- game operations --------------------------------------------------

    fn handle_action(
        &mut self,
        connection_id: ConnectionId,
        action: RoomAction,
    ) -> Result<(), RoomError> {
        let Some(requester) = self.roster.get(connection_id).cloned() else {
            return Err(RoomError::NotInRoom(connection_id));
        };

        match action {
            RoomAction::StartGame => self.start_game(&requester),
            RoomAction::RecordInitiative { value } => {
                self.record_initiative(&requester, value)
            }
            RoomAction::RollDice {
                faces,
                value,
                is_defender,
            } => self.roll_dice(&requester, faces, value, is_defender),
            RoomAction::StartCombat => self.start_combat(&requester),
            RoomAction::Perform {
                action_type,
                payload,
                message,
            } => self.perform_action(&requester, action_type, payload, message),
            RoomAction::ChooseDefense {
                defense_type,
                message,
            } => self.choose_defense(&requester, defense_type, message),
            RoomAction::ReportResult {
                attack_roll,
                defense_roll,
                outcome,
            } => self.report_result(
                &requester,
                attack_roll,
                defense_roll,
                outcome,
            ),
            RoomAction::EndTurn => self.end_turn(&requester),
            RoomAction::EndBattle => self.end_battle(&requester),
            RoomAction::Chat { text } => self.chat(&requester, text),
            RoomAction::Narrate { text } => self.narrate(&requester, text),
        }
    }

    fn start_game(
        &mut self,
        requester: &Participant,
    ) -> Result<(), RoomError> {
        self.ensure_host(requester, "start the game")?;
        self.battle.begin_rolling()?;

        info!(room_id = %self.room_id, "game started");
        self.log_event(&requester.display_name, "game_started", json!({}));
        self.broadcast(ServerEvent::GameStarted {
            phase: self.battle.phase(),
        });
        self.record_for_all(
            "battle_started",
            json!({ "players": self.roster.names() }),
        );
        Ok(())
    }

    fn record_initiative(
        &mut self,
        requester: &Participant,
        value: i32,
    ) -> Result<(), RoomError> {
        self.battle
            .ensure_phase(GamePhase::RollingInitiative, "record initiative")?;
        let Some(entry) = self
            .roster
            .record_initiative(requester.connection_id, value)
        else {
            return Err(RoomError::NotInRoom(requester.connection_id));
        };

        debug!(
            room_id = %self.room_id,
            name = %entry.display_name,
            value,
            "initiative recorded"
        );
        self.log_event(
            &entry.display_name,
            "initiative_rolled",
            json!({ "value": value }),
        );
        self.broadcast(ServerEvent::GameStateUpdated {
            phase: self.battle.phase(),
            player_initiative: Some(entry),
            current_turn: None,
        });
        self.record_for(
            requester,
            "initiative_rolled",
            json!({ "value": value }),
        );
        Ok(())
    }

    fn roll_dice(
        &mut self,
        requester: &Participant,
        faces: u32,
        value: i32,
        is_defender: bool,
    ) -> Result<(), RoomError> {
        // Cosmetic relay; legal in any phase.
        self.log_event(
            &requester.display_name,
            "dice_rolled",
            json!({ "faces": faces, "value": value }),
        );
        self.broadcast(ServerEvent::DiceRolled {
            display_name: requester.display_name.clone(),
            faces,
            value,
            is_defender,
        });
        Ok(())
    }

    fn start_combat(
        &mut self,
        requester: &Participant,
    ) -> Result<(), RoomError> {
        self.ensure_host(requester, "start combat")?;
        self.battle
            .ensure_phase(GamePhase::RollingInitiative, "start combat")?;
        if !self.roster.any_initiative_rolled() {
            return Err(RoomError::NoInitiativeRolled);
        }

        self.battle.begin_combat(self.roster.initiative_order())?;
        let current = self.battle.current_turn().map(str::to_string);

        info!(
            room_id = %self.room_id,
            current_turn = current.as_deref().unwrap_or(""),
            "combat started"
        );
        self.log_event(
            &requester.display_name,
            "combat_started",
            json!({ "turnOrder": self.battle.turn_order() }),
        );
        self.broadcast(ServerEvent::GameStateUpdated {
            phase: self.battle.phase(),
            player_initiative: None,
            current_turn: current,
        });
        self.record_for_all(
            "combat_started",
            json!({ "turnOrder": self.battle.turn_order() }),
        );
        Ok(())
    }

    fn perform_action(
        &mut self,
        requester: &Participant,
        action_type: String,
        payload: serde_json::Value,
        message: Option<String>,
    ) -> Result<(), RoomError> {
        self.battle
            .ensure_phase(GamePhase::Combat, "perform an action")?;
        self.ensure_current_turn(requester)?;

        debug!(
            room_id = %self.room_id,
            name = %requester.display_name,
            action = %action_type,
            "action performed"
        );
        self.log_event(
            &requester.display_name,
            &action_type,
            payload.clone(),
        );
        self.broadcast(ServerEvent::ActionPerformed {
            display_name: requester.display_name.clone(),
            action_type: action_type.clone(),
            payload: payload.clone(),
            message: message.clone(),
        });
        self.record_for(
            requester,
            &action_type,
            json!({ "payload": payload, "message": message }),
        );
        Ok(())
    }

    fn choose_defense(
        &mut self,
        requester: &Participant,
        defense_type: String,
        message: Option<String>,
    ) -> Result<(), RoomError> {
        // The defender acts out of turn by definition; combat-gated only.
        self.battle
            .ensure_phase(GamePhase::Combat, "choose a defense")?;
        self.log_event(
            &requester.display_name,
            "defense_chosen",
            json!({ "defenseType": defense_type }),
        );
        self.broadcast(ServerEvent::DefenseChosen {
            display_name: requester.display_name.clone(),
            defense_type,
            message,
        });
        Ok(())
    }

    fn report_result(
        &mut self,
        requester: &Participant,
        attack_roll: i32,
        defense_roll: i32,
        outcome: serde_json::Value,
    ) -> Result<(), RoomError> {
        self.battle
            .ensure_phase(GamePhase::Combat, "report a combat result")?;
        self.log_event(
            &requester.display_name,
            "combat_resolved",
            json!({
                "attackRoll": attack_roll,
                "defenseRoll": defense_roll,
            }),
        );
        self.broadcast(ServerEvent::CombatResolved {
            display_name: requester.display_name.clone(),
            attack_roll,
            defense_roll,
            outcome,
        });
        Ok(())
    }

    fn end_turn(&mut self, requester: &Participant) -> Result<(), RoomError> {
        self.battle.ensure_phase(GamePhase::Combat, "end the turn")?;
        self.ensure_current_turn(requester)?;

        let next = self.battle.advance_turn()?;
        debug!(
            room_id = %self.room_id,
            from = %requester.display_name,
            to = %next,
            "turn passed"
        );
        self.log_event(
            &requester.display_name,
            "turn_ended",
            json!({ "nextTurn": next }),
        );
        self.broadcast(ServerEvent::GameStateUpdated {
            phase: self.battle.phase(),
            player_initiative: None,
            current_turn: Some(next.clone()),
        });
        self.record_for(
            requester,
            "turn_ended",
            json!({ "nextTurn": next }),
        );
        Ok(())
    }

    fn end_battle(
        &mut self,
        requester: &Participant,
    ) -> Result<(), RoomError> {
        self.ensure_host(requester, "end the battle")?;
        self.battle.finish()?;

        info!(room_id = %self.room_id, "battle ended");
        self.log_event(&requester.display_name, "battle_ended", json!({}));
        self.broadcast(ServerEvent::BattleEnded {
            phase: self.battle.phase(),
        });
        self.broadcast(ServerEvent::GameStateUpdated {
            phase: self.battle.phase(),
            player_initiative: None,
            current_turn: None,
        });
        self.record_for_all("battle_ended", json!({}));
        Ok(())
    }

    fn chat(
        &mut self,
        requester: &Participant,
        text: String,
    ) -> Result<(), RoomError> {
        self.log_event(
            &requester.display_name,
            "message_sent",
            json!({ "text": text }),
        );
        self.broadcast(ServerEvent::MessageReceived {
            sender: requester.display_name.clone(),
            text: text.clone(),
            timestamp: Utc::now(),
        });
        self.record_for(requester, "message_sent", json!({ "text": text }));
        Ok(())
    }

    fn narrate(
        &mut self,
        requester: &Participant,
        text: String,
    ) -> Result<(), RoomError> {
        self.log_event(
            &requester.display_name,
            "narration",
            json!({ "text": text }),
        );
        self.broadcast(ServerEvent::NarrationReceived {
            sender: requester.display_name.clone(),
            text,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    // -- guards -----------------------------------------------------------

    fn ensure_host(
        &self,
        requester: &Participant,
        action: &'static str,
    ) -> Result<(), RoomError> {
        if requester.is_host {
            Ok(())
        } else {
            Err(RoomError::NotHost(action))
        }
    }

    fn ensure_current_turn(
        &self,
        requester: &Participant,
    ) -> Result<(), RoomError> {
        match self.battle.current_turn() {
            Some(current) if current == requester.display_name => Ok(()),
            Some(current) => {
                Err(RoomError::NotYourTurn(current.to_string()))
            }
            None => Err(RoomError::InvalidPhase {
                action: "act",
                phase: self.battle.phase(),
            }),
        }
    }

    // -- fan-out ----------------------------------------------------------

    /// Queue an event for a single connection. Silently drops if the
    /// writer is gone; the impending leave cleans up.
    fn send_to(&self, connection_id: ConnectionId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(&connection_id) {
            let _ = sender.send(event);
        }
    }

    fn broadcast(&self, event: ServerEvent) {
        for member in self.roster.members() {
            self.send_to(member.connection_id, event.clone());
        }
    }

    // -- side channels ----------------------------------------------------

    fn log_event(
        &mut self,
        actor: &str,
        event_type: &str,
        data: serde_json::Value,
    ) {
        self.event_log.push(LoggedEvent {
            actor: actor.to_string(),
            event_type: event_type.to_string(),
            data,
            at: Utc::now(),
        });
    }

    /// Queue a durable event for every member with a character.
    fn record_for_all(&self, event_type: &str, data: serde_json::Value) {
        for member in self.roster.members() {
            self.record_for(member, event_type, data.clone());
        }
    }

    /// Queue a durable event for one member, if they have a character.
    fn record_for(
        &self,
        member: &Participant,
        event_type: &str,
        data: serde_json::Value,
    ) {
        if let Some(character_id) = &member.character_id {
            self.recorder.record(BattleEvent::new(
                character_id.clone(),
                self.room_id.clone(),
                event_type,
                data,
            ));
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room_id.clone(),
            is_public: self.options.is_public,
            has_password: self.options.has_password(),
            player_count: self.roster.len(),
            max_players: self.options.max_players,
            phase: self.battle.phase(),
            current_turn: self.battle.current_turn().map(str::to_string),
            events_logged: self.event_log.len(),
        }
    }
}

/// Spawns a room actor task and returns a handle to it.
pub(crate) fn spawn_room(
    room_id: RoomId,
    options: RoomOptions,
    recorder: RecorderHandle,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let actor = RoomActor {
        room_id: room_id.clone(),
        options,
        roster: Roster::new(),
        senders: HashMap::new(),
        battle: Battle::new(),
        event_log: Vec::new(),
        recorder,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
    }
}
