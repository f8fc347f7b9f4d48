//! Phase machine and turn cycle for one room.
//!
//! Wraps the shared [`GamePhase`] enum with the turn-order state that
//! only matters during combat. Legal transitions come from
//! `GamePhase::can_transition_to`; everything here keeps `current_turn`
//! pointing at a live name or at nothing.

use warband_protocol::GamePhase;

use crate::RoomError;

#[derive(Debug, Default)]
pub struct Battle {
    phase: GamePhase,
    turn_order: Vec<String>,
    turn_index: Option<usize>,
}

impl Battle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Whether the game has left the waiting phase.
    pub fn started(&self) -> bool {
        self.phase.has_started()
    }

    /// The display name whose turn it is, during combat.
    pub fn current_turn(&self) -> Option<&str> {
        self.turn_index
            .and_then(|i| self.turn_order.get(i))
            .map(String::as_str)
    }

    /// Initiative-sorted names, frozen at combat start.
    pub fn turn_order(&self) -> &[String] {
        &self.turn_order
    }

    /// Fails unless the room is in `expected`.
    pub fn ensure_phase(
        &self,
        expected: GamePhase,
        action: &'static str,
    ) -> Result<(), RoomError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(RoomError::InvalidPhase {
                action,
                phase: self.phase,
            })
        }
    }

    /// Waiting → RollingInitiative.
    pub fn begin_rolling(&mut self) -> Result<(), RoomError> {
        if !self.phase.can_transition_to(GamePhase::RollingInitiative) {
            return Err(RoomError::GameAlreadyStarted);
        }
        self.phase = GamePhase::RollingInitiative;
        Ok(())
    }

    /// RollingInitiative → Combat, freezing the turn order.
    ///
    /// The first entry in `order` becomes the current turn.
    pub fn begin_combat(
        &mut self,
        order: Vec<String>,
    ) -> Result<(), RoomError> {
        if !self.phase.can_transition_to(GamePhase::Combat) {
            return Err(RoomError::InvalidPhase {
                action: "start combat",
                phase: self.phase,
            });
        }
        self.turn_index = if order.is_empty() { None } else { Some(0) };
        self.turn_order = order;
        self.phase = GamePhase::Combat;
        Ok(())
    }

    /// Move to the next turn, wrapping after the last participant.
    /// Returns the new current turn's name.
    pub fn advance_turn(&mut self) -> Result<String, RoomError> {
        self.ensure_phase(GamePhase::Combat, "end the turn")?;
        let Some(index) = self.turn_index else {
            return Err(RoomError::InvalidPhase {
                action: "end the turn",
                phase: self.phase,
            });
        };
        let next = (index + 1) % self.turn_order.len();
        self.turn_index = Some(next);
        Ok(self.turn_order[next].clone())
    }

    /// Combat → Ended. Terminal; no operation leaves Ended.
    pub fn finish(&mut self) -> Result<(), RoomError> {
        if !self.phase.can_transition_to(GamePhase::Ended) {
            return Err(RoomError::InvalidPhase {
                action: "end the battle",
                phase: self.phase,
            });
        }
        self.phase = GamePhase::Ended;
        self.turn_index = None;
        Ok(())
    }

    /// Drop a name from the turn cycle, keeping `current_turn` valid.
    ///
    /// Returns the new current turn when the removal changed it, which
    /// happens exactly when the removed participant held the turn.
    pub fn remove_participant(&mut self, name: &str) -> Option<String> {
        let position = self.turn_order.iter().position(|n| n == name)?;
        self.turn_order.remove(position);
        let index = self.turn_index?;

        if self.turn_order.is_empty() {
            self.turn_index = None;
            return None;
        }
        if position < index {
            self.turn_index = Some(index - 1);
            None
        } else if position == index {
            let next = index % self.turn_order.len();
            self.turn_index = Some(next);
            self.turn_order.get(next).cloned()
        } else {
            None
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn combat(names: &[&str]) -> Battle {
        let mut battle = Battle::new();
        battle.begin_rolling().unwrap();
        battle
            .begin_combat(names.iter().map(|n| n.to_string()).collect())
            .unwrap();
        battle
    }

    #[test]
    fn test_new_battle_waits() {
        let battle = Battle::new();
        assert_eq!(battle.phase(), GamePhase::Waiting);
        assert!(!battle.started());
        assert!(battle.current_turn().is_none());
    }

    #[test]
    fn test_begin_rolling_twice_reports_already_started() {
        let mut battle = Battle::new();
        battle.begin_rolling().unwrap();
        assert!(matches!(
            battle.begin_rolling(),
            Err(RoomError::GameAlreadyStarted)
        ));
    }

    #[test]
    fn test_begin_combat_from_waiting_rejected() {
        let mut battle = Battle::new();
        let err = battle.begin_combat(vec!["X".into()]).unwrap_err();
        assert!(matches!(err, RoomError::InvalidPhase { .. }));
    }

    #[test]
    fn test_begin_combat_sets_first_turn() {
        let battle = combat(&["High", "Low"]);
        assert_eq!(battle.phase(), GamePhase::Combat);
        assert_eq!(battle.current_turn(), Some("High"));
    }

    #[test]
    fn test_advance_turn_cycles_and_wraps() {
        let mut battle = combat(&["A", "B", "C"]);
        assert_eq!(battle.advance_turn().unwrap(), "B");
        assert_eq!(battle.advance_turn().unwrap(), "C");
        assert_eq!(battle.advance_turn().unwrap(), "A");
        assert_eq!(battle.current_turn(), Some("A"));
    }

    #[test]
    fn test_advance_turn_outside_combat_rejected() {
        let mut battle = Battle::new();
        assert!(matches!(
            battle.advance_turn(),
            Err(RoomError::InvalidPhase { .. })
        ));
    }

    #[test]
    fn test_finish_is_terminal() {
        let mut battle = combat(&["A"]);
        battle.finish().unwrap();
        assert_eq!(battle.phase(), GamePhase::Ended);
        assert!(battle.current_turn().is_none());
        assert!(battle.advance_turn().is_err());
        assert!(battle.begin_rolling().is_err());
    }

    #[test]
    fn test_finish_before_combat_rejected() {
        let mut battle = Battle::new();
        battle.begin_rolling().unwrap();
        assert!(matches!(
            battle.finish(),
            Err(RoomError::InvalidPhase { .. })
        ));
    }

    // =====================================================================
    // Mid-combat departures
    // =====================================================================

    #[test]
    fn test_remove_current_turn_passes_to_next() {
        let mut battle = combat(&["A", "B", "C"]);
        let next = battle.remove_participant("A");
        assert_eq!(next.as_deref(), Some("B"));
        assert_eq!(battle.current_turn(), Some("B"));
    }

    #[test]
    fn test_remove_current_at_end_wraps_to_first() {
        let mut battle = combat(&["A", "B", "C"]);
        battle.advance_turn().unwrap();
        battle.advance_turn().unwrap();
        assert_eq!(battle.current_turn(), Some("C"));

        let next = battle.remove_participant("C");
        assert_eq!(next.as_deref(), Some("A"));
    }

    #[test]
    fn test_remove_earlier_participant_keeps_current() {
        let mut battle = combat(&["A", "B", "C"]);
        battle.advance_turn().unwrap();
        assert_eq!(battle.current_turn(), Some("B"));

        let next = battle.remove_participant("A");
        assert!(next.is_none());
        assert_eq!(battle.current_turn(), Some("B"));
    }

    #[test]
    fn test_remove_later_participant_keeps_current() {
        let mut battle = combat(&["A", "B", "C"]);
        let next = battle.remove_participant("C");
        assert!(next.is_none());
        assert_eq!(battle.current_turn(), Some("A"));
    }

    #[test]
    fn test_remove_unknown_name_is_noop() {
        let mut battle = combat(&["A"]);
        assert!(battle.remove_participant("Nobody").is_none());
        assert_eq!(battle.current_turn(), Some("A"));
    }
}
