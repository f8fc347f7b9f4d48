//! Insertion-ordered room membership.
//!
//! Order is load-bearing twice over: it is the tie-break when sorting by
//! initiative, and the succession order when a departing host's privilege
//! has to move. Reconnects keep their original slot so neither ordering
//! shifts under a returning player.

use std::cmp::Reverse;

use warband_protocol::{InitiativeEntry, Participant};
use warband_session::{IdentityMatch, JoinProfile, reconcile};
use warband_transport::ConnectionId;

/// What a successful join changed.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// The member's record after the join.
    pub participant: Participant,
    /// True when an existing member was matched and retargeted.
    pub reconnected: bool,
    /// The transport identity a reconnect displaced.
    pub replaced_connection: Option<ConnectionId>,
}

/// What a removal changed.
#[derive(Debug, Clone)]
pub struct RemovedMember {
    pub participant: Participant,
    /// Set when host privilege moved to another member.
    pub new_host: Option<Participant>,
}

/// The ordered membership of one room.
#[derive(Debug, Default)]
pub struct Roster {
    members: Vec<Participant>,
}

impl Roster {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in join order.
    pub fn members(&self) -> &[Participant] {
        &self.members
    }

    /// Display names in join order.
    pub fn names(&self) -> Vec<String> {
        self.members
            .iter()
            .map(|m| m.display_name.clone())
            .collect()
    }

    pub fn has_host(&self) -> bool {
        self.members.iter().any(|m| m.is_host)
    }

    pub fn get(&self, connection_id: ConnectionId) -> Option<&Participant> {
        self.members
            .iter()
            .find(|m| m.connection_id == connection_id)
    }

    /// Add or retarget a member for this profile.
    ///
    /// A reconcile hit updates the matched entry's connection id in place
    /// and preserves everything else (slot, host flag, vitals,
    /// initiative). A miss appends a fresh participant; the host claim is
    /// only honored while the room has no host.
    pub fn join(
        &mut self,
        connection_id: ConnectionId,
        profile: &JoinProfile,
    ) -> JoinOutcome {
        match reconcile(&self.members, profile) {
            IdentityMatch::Reconnect(index) => {
                let member = &mut self.members[index];
                let replaced = member.connection_id;
                member.connection_id = connection_id;
                JoinOutcome {
                    participant: member.clone(),
                    reconnected: true,
                    replaced_connection: Some(replaced),
                }
            }
            IdentityMatch::New => {
                let is_host = profile.wants_host && !self.has_host();
                let participant = profile
                    .clone()
                    .into_participant(connection_id, is_host);
                self.members.push(participant.clone());
                JoinOutcome {
                    participant,
                    reconnected: false,
                    replaced_connection: None,
                }
            }
        }
    }

    /// Remove the member behind a connection.
    ///
    /// When the removed member was host and others remain, the member now
    /// at index 0 inherits the flag.
    pub fn remove(
        &mut self,
        connection_id: ConnectionId,
    ) -> Option<RemovedMember> {
        let index = self
            .members
            .iter()
            .position(|m| m.connection_id == connection_id)?;
        let participant = self.members.remove(index);

        let mut new_host = None;
        if participant.is_host && !self.members.is_empty() {
            let successor = &mut self.members[0];
            successor.is_host = true;
            new_host = Some(successor.clone());
        }

        Some(RemovedMember {
            participant,
            new_host,
        })
    }

    /// Set a member's initiative, returning the entry for broadcast.
    pub fn record_initiative(
        &mut self,
        connection_id: ConnectionId,
        value: i32,
    ) -> Option<InitiativeEntry> {
        let member = self
            .members
            .iter_mut()
            .find(|m| m.connection_id == connection_id)?;
        member.initiative = value;
        Some(InitiativeEntry {
            display_name: member.display_name.clone(),
            initiative: value,
        })
    }

    pub fn any_initiative_rolled(&self) -> bool {
        self.members.iter().any(|m| m.initiative > 0)
    }

    /// Display names sorted by initiative descending; ties keep join
    /// order (stable sort).
    pub fn initiative_order(&self) -> Vec<String> {
        let mut indices: Vec<usize> = (0..self.members.len()).collect();
        indices.sort_by_key(|&i| Reverse(self.members[i].initiative));
        indices
            .into_iter()
            .map(|i| self.members[i].display_name.clone())
            .collect()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use warband_protocol::{CharacterId, Vitals};

    use super::*;

    fn profile(name: &str, character_id: Option<&str>) -> JoinProfile {
        JoinProfile {
            display_name: name.into(),
            character_id: character_id.map(CharacterId::new),
            character_class: None,
            vitals: None,
            wants_host: false,
        }
    }

    fn host_profile(name: &str) -> JoinProfile {
        JoinProfile {
            wants_host: true,
            ..profile(name, None)
        }
    }

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    // =====================================================================
    // Join and reconnect
    // =====================================================================

    #[test]
    fn test_join_new_member_appends_in_order() {
        let mut roster = Roster::new();
        roster.join(conn(1), &host_profile("Thorin"));
        roster.join(conn(2), &profile("Mira", None));

        assert_eq!(roster.names(), ["Thorin", "Mira"]);
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn test_join_honors_host_claim_only_when_hostless() {
        let mut roster = Roster::new();
        let first = roster.join(conn(1), &host_profile("Thorin"));
        let second = roster.join(conn(2), &host_profile("Mira"));

        assert!(first.participant.is_host);
        assert!(!second.participant.is_host, "host already taken");
    }

    #[test]
    fn test_join_without_claim_leaves_room_hostless() {
        let mut roster = Roster::new();
        roster.join(conn(1), &profile("Mira", None));
        assert!(!roster.has_host());
    }

    #[test]
    fn test_reconnect_by_character_id_retargets_in_place() {
        let mut roster = Roster::new();
        let mut original = profile("Thorin", Some("char-1"));
        original.vitals = Some(Vitals {
            current_hp: 42,
            max_hp: 100,
            current_mp: 7,
            max_mp: 80,
        });
        roster.join(conn(1), &original);
        roster.record_initiative(conn(1), 15);

        let back = roster.join(conn(9), &profile("Thorin", Some("char-1")));

        assert!(back.reconnected);
        assert_eq!(back.replaced_connection, Some(conn(1)));
        assert_eq!(roster.len(), 1, "reconnect must not grow the roster");
        let member = roster.get(conn(9)).unwrap();
        assert_eq!(member.vitals.current_hp, 42);
        assert_eq!(member.initiative, 15);
    }

    #[test]
    fn test_reconnect_preserves_host_flag() {
        let mut roster = Roster::new();
        roster.join(conn(1), &host_profile("Thorin"));

        let back = roster.join(conn(2), &profile("Thorin", None));

        assert!(back.reconnected);
        assert!(back.participant.is_host);
    }

    // =====================================================================
    // Removal and host succession
    // =====================================================================

    #[test]
    fn test_remove_unknown_connection_is_none() {
        let mut roster = Roster::new();
        roster.join(conn(1), &profile("Mira", None));
        assert!(roster.remove(conn(99)).is_none());
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_remove_host_promotes_index_zero() {
        let mut roster = Roster::new();
        roster.join(conn(1), &host_profile("Thorin"));
        roster.join(conn(2), &profile("Mira", None));
        roster.join(conn(3), &profile("Zed", None));

        let removed = roster.remove(conn(1)).unwrap();

        let new_host = removed.new_host.unwrap();
        assert_eq!(new_host.display_name, "Mira");
        assert!(roster.get(conn(2)).unwrap().is_host);
        assert_eq!(roster.names(), ["Mira", "Zed"]);
    }

    #[test]
    fn test_remove_non_host_changes_nothing_about_host() {
        let mut roster = Roster::new();
        roster.join(conn(1), &host_profile("Thorin"));
        roster.join(conn(2), &profile("Mira", None));

        let removed = roster.remove(conn(2)).unwrap();

        assert!(removed.new_host.is_none());
        assert!(roster.get(conn(1)).unwrap().is_host);
    }

    #[test]
    fn test_remove_last_member_empties_roster() {
        let mut roster = Roster::new();
        roster.join(conn(1), &host_profile("Thorin"));

        let removed = roster.remove(conn(1)).unwrap();

        assert!(removed.new_host.is_none());
        assert!(roster.is_empty());
    }

    // =====================================================================
    // Initiative order
    // =====================================================================

    #[test]
    fn test_initiative_order_descending() {
        let mut roster = Roster::new();
        roster.join(conn(1), &profile("Low", None));
        roster.join(conn(2), &profile("High", None));
        roster.join(conn(3), &profile("Mid", None));
        roster.record_initiative(conn(1), 3);
        roster.record_initiative(conn(2), 18);
        roster.record_initiative(conn(3), 11);

        assert_eq!(roster.initiative_order(), ["High", "Mid", "Low"]);
    }

    #[test]
    fn test_initiative_order_ties_keep_join_order() {
        let mut roster = Roster::new();
        roster.join(conn(1), &profile("First", None));
        roster.join(conn(2), &profile("Second", None));
        roster.join(conn(3), &profile("Third", None));
        roster.record_initiative(conn(1), 10);
        roster.record_initiative(conn(2), 10);
        roster.record_initiative(conn(3), 12);

        assert_eq!(
            roster.initiative_order(),
            ["Third", "First", "Second"]
        );
    }

    #[test]
    fn test_unrolled_members_sort_last() {
        let mut roster = Roster::new();
        roster.join(conn(1), &profile("Idle", None));
        roster.join(conn(2), &profile("Rolled", None));
        roster.record_initiative(conn(2), 1);

        assert_eq!(roster.initiative_order(), ["Rolled", "Idle"]);
        assert!(roster.any_initiative_rolled());
    }
}
