//! Error types for the identity layer.

/// Errors that can occur while resolving a join identity.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The join profile has no usable display name.
    #[error("display name must not be empty")]
    EmptyDisplayName,
}
