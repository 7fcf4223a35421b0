//! Connection bookkeeping for Encore.
//!
//! A session is the server's record of one live connection:
//!
//! 1. **Identity**: the [`PlayerId`](encore_protocol::PlayerId) derived
//!    from the connection.
//! 2. **Outbox**: the [`PlayerSender`] the writer task drains onto the
//!    socket.
//! 3. **Room association**: at most one room per connection, so a join
//!    elsewhere can leave the old room first.
//!
//! Reconnection state (scores, host flag) belongs to the room, not here. A
//! session ends the moment its connection does.
//!
//! ```text
//! Coordinator (above)  ← asks "which room is this connection in?"
//!     ↕
//! Session Layer (this crate)
//!     ↕
//! Protocol Layer (below)  ← PlayerId, RoomCode, ServerEvent
//! ```

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{PlayerSender, Session};
