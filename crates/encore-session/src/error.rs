//! Error types for the session layer.

use encore_protocol::PlayerId;

/// Errors that can occur during session bookkeeping.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No live session exists for the given player.
    #[error("session not found for player {0}")]
    NotFound(PlayerId),

    /// The connection already has a live session.
    #[error("player {0} already has an active session")]
    AlreadyConnected(PlayerId),
}
