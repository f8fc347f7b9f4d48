//! The identity a connection presents when joining a room.

use warband_protocol::{CharacterId, Participant, Vitals};
use warband_transport::ConnectionId;

use crate::SessionError;

/// Everything a join request says about who is joining.
///
/// Built by the gateway from a `joinRoom` command. The profile is what
/// identity reconciliation matches against the roster; if no match is
/// found it becomes a fresh [`Participant`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinProfile {
    pub display_name: String,
    pub character_id: Option<CharacterId>,
    pub character_class: Option<String>,
    /// Starting vitals; defaults apply when the client sends none.
    pub vitals: Option<Vitals>,
    /// The client's claim to host privilege. Only honored for the first
    /// claimant while the room has no host.
    pub wants_host: bool,
}

impl JoinProfile {
    /// Rejects profiles that cannot name a participant.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.display_name.trim().is_empty() {
            return Err(SessionError::EmptyDisplayName);
        }
        Ok(())
    }

    /// Materializes a new roster entry for this profile.
    ///
    /// `is_host` is decided by the room, not the profile: the claim in
    /// `wants_host` only counts when no host exists yet.
    pub fn into_participant(
        self,
        connection_id: ConnectionId,
        is_host: bool,
    ) -> Participant {
        Participant {
            connection_id,
            display_name: self.display_name,
            character_id: self.character_id,
            character_class: self.character_class,
            is_host,
            initiative: 0,
            vitals: self.vitals.unwrap_or_default(),
        }
    }
}
