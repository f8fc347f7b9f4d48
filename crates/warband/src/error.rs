//! Unified error type for the Warband server.

use warband_protocol::ProtocolError;
use warband_room::RoomError;
use warband_session::SessionError;
use warband_store::StoreError;
use warband_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `warband` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum WarbandError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode or decode of a wire frame).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An identity-level error (unusable join profile).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (full, not found, phase violation).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A persistence error (directory or battle history files).
    #[error(transparent)]
    Store(#[from] StoreError),
}
