//! Error types for the room layer.

use encore_protocol::{PlayerId, RoomCode};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No room is registered under this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The player is not in this room's roster.
    #[error("player {0} not in room {1}")]
    NotInRoom(PlayerId, RoomCode),

    /// A non-host asked for a host-only action.
    #[error("player {0} is not the host")]
    Unauthorized(PlayerId),

    /// The room's phase doesn't allow this operation.
    #[error("invalid room state for this operation: {0}")]
    InvalidState(String),

    /// The room has been torn down; its mailbox no longer accepts
    /// commands. A join should retry against a fresh room.
    #[error("room {0} is closed")]
    Closed(RoomCode),
}
