//! Participant identity for Warband.
//!
//! This crate answers one question for the room layer: when a
//! connection asks to join, is it a returning participant or a new one?
//!
//! 1. **Profiles** — what a join request claims about its identity
//!    ([`JoinProfile`]).
//! 2. **Reconciliation** — the two-step character-id-then-display-name
//!    lookup ([`reconcile`], [`IdentityMatch`]).
//!
//! There are no tokens and no timers here: a reconnect is simply the
//! same identity arriving on a new connection id while its old roster
//! entry is still present.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room layer (above)      ← applies the match to its roster
//!     ↕
//! Identity layer (this crate)
//!     ↕
//! Protocol layer (below)  ← Participant, CharacterId, Vitals
//! ```

mod error;
mod identity;
mod profile;

pub use error::SessionError;
pub use identity::{IdentityMatch, reconcile};
pub use profile::JoinProfile;
