//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
///
/// Encoding errors only exist when the `json` feature is enabled, since
/// `serde_json` is the only codec shipped today.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, an unknown event `type`, or a
    /// player id that isn't a valid UUID.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The command verb isn't one the lobby understands.
    ///
    /// The host's command layer decides what to do with it (usually:
    /// pass it on to some other plugin or print its own help text).
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}
