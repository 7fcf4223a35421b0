//! The per-connection session record.

use std::time::Instant;

use encore_protocol::{PlayerId, RoomCode, ServerEvent};
use tokio::sync::mpsc;

/// Outbound channel to one connection's writer task.
///
/// Unbounded so a room actor never waits on a slow socket. A closed
/// channel means the connection is gone, which rooms use as their
/// liveness signal.
pub type PlayerSender = mpsc::UnboundedSender<ServerEvent>;

/// A single live connection.
#[derive(Debug, Clone)]
pub struct Session {
    /// Which player this connection speaks for.
    pub player_id: PlayerId,

    /// Where events for this player are queued.
    pub outbox: PlayerSender,

    /// The room this connection is associated with, if any.
    pub room: Option<RoomCode>,

    /// When the connection was accepted.
    pub connected_at: Instant,
}

impl Session {
    pub fn new(player_id: PlayerId, outbox: PlayerSender) -> Self {
        Self {
            player_id,
            outbox,
            room: None,
            connected_at: Instant::now(),
        }
    }

    /// Queues an event for this connection. Returns `false` if the
    /// connection has already gone away.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.outbox.send(event).is_ok()
    }
}
