//! Error types for the protocol layer.

/// Errors that can occur while encoding, decoding, or validating events.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning an event into a frame).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, unknown `type`, missing
    /// fields, or a field that failed its own parse (e.g. a room code).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The room code is not exactly four ASCII letters or digits.
    #[error("invalid room code: {0:?}")]
    InvalidRoomCode(String),

    /// The event decoded but breaks a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
