//! Identity reconciliation: is this join a reconnect or a new player?
//!
//! The lookup is a deliberate two-step fallback, in this order:
//!
//! 1. If the profile carries a `character_id`, match a roster entry
//!    with the same character id. The character id is the durable
//!    identity; a match here wins even if the display name changed.
//! 2. Otherwise match by exact `display_name`. This catches players
//!    who joined without a character record.
//!
//! A match means RECONNECT: the existing entry keeps its slot, vitals,
//! and initiative, and only its connection id is replaced. No match
//! means a brand-new participant.

use warband_protocol::Participant;

use crate::JoinProfile;

/// Outcome of matching a join profile against a roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityMatch {
    /// The profile is a returning identity; the value is the index of
    /// the matched roster entry.
    Reconnect(usize),
    /// No existing entry matches; this is a new join.
    New,
}

/// Runs the two-step lookup against `roster`.
pub fn reconcile(
    roster: &[Participant],
    profile: &JoinProfile,
) -> IdentityMatch {
    // Step 1: durable identity.
    if let Some(character_id) = &profile.character_id {
        if let Some(idx) = roster
            .iter()
            .position(|p| p.character_id.as_ref() == Some(character_id))
        {
            return IdentityMatch::Reconnect(idx);
        }
    }

    // Step 2: display name fallback.
    if let Some(idx) = roster
        .iter()
        .position(|p| p.display_name == profile.display_name)
    {
        return IdentityMatch::Reconnect(idx);
    }

    IdentityMatch::New
}
