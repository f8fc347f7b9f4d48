//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means a serialization problem, never a
//! networking or room-state one; those live in their own crates.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed. Common causes: malformed JSON, a missing
    /// `type` tag, or a field of the wrong shape.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
