//! Unified error type for the Encore server.

use encore_content::ContentError;
use encore_protocol::ProtocolError;
use encore_room::RoomError;
use encore_session::SessionError;
use encore_transport::TransportError;

/// Top-level error wrapping every layer's error.
///
/// `#[from]` on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum EncoreError {
    /// Listening, accepting, or talking to a socket failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded, or failed validation.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Connection bookkeeping (unknown or duplicate session).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room refused or could not take a command.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The content provider could not be set up.
    #[error(transparent)]
    Content(#[from] ContentError),
}
