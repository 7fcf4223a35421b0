//! The session manager: tracks every live connection and its room.
//!
//! # Concurrency note
//!
//! `SessionManager` is a plain `HashMap` with no locking of its own. The
//! coordinator owns it behind a mutex and holds that lock only for the
//! bookkeeping calls here, never across a room round-trip.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use encore_protocol::{PlayerId, RoomCode, ServerEvent};

use crate::{PlayerSender, Session, SessionError};

/// Tracks all live player connections.
///
/// ```text
/// create() ──→ enter_room() ──→ exit_room() ──→ end()
///                   │                             ↑
///                   └─────────────────────────────┘
/// ```
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<PlayerId, Session>,
}

impl SessionManager {
    /// Creates a new, empty session manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly accepted connection.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyConnected`] if the id is already live.
    pub fn create(
        &mut self,
        player_id: PlayerId,
        outbox: PlayerSender,
    ) -> Result<&Session, SessionError> {
        match self.sessions.entry(player_id) {
            Entry::Occupied(_) => Err(SessionError::AlreadyConnected(player_id)),
            Entry::Vacant(slot) => {
                tracing::debug!(%player_id, "session created");
                Ok(slot.insert(Session::new(player_id, outbox)))
            }
        }
    }

    /// Associates a connection with a room.
    ///
    /// Returns the room it was previously associated with, if any, so the
    /// caller can make sure it has been left.
    pub fn enter_room(
        &mut self,
        player_id: PlayerId,
        room: RoomCode,
    ) -> Result<Option<RoomCode>, SessionError> {
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;
        Ok(session.room.replace(room))
    }

    /// Clears the room association, but only if it still points at `room`.
    ///
    /// A late leave for an old room must not wipe a newer association.
    /// Returns `true` if the association was cleared.
    pub fn exit_room(&mut self, player_id: PlayerId, room: &RoomCode) -> bool {
        match self.sessions.get_mut(&player_id) {
            Some(session) if session.room.as_ref() == Some(room) => {
                session.room = None;
                true
            }
            _ => false,
        }
    }

    /// The room a connection is associated with.
    pub fn room_of(&self, player_id: &PlayerId) -> Option<&RoomCode> {
        self.sessions.get(player_id).and_then(|s| s.room.as_ref())
    }

    /// A clone of the connection's outbound channel.
    pub fn outbox(&self, player_id: &PlayerId) -> Option<PlayerSender> {
        self.sessions.get(player_id).map(|s| s.outbox.clone())
    }

    /// Sends one event to one connection. Returns `false` if the player is
    /// unknown or its connection is already closed.
    pub fn notify(&self, player_id: &PlayerId, event: ServerEvent) -> bool {
        self.sessions
            .get(player_id)
            .is_some_and(|session| session.send(event))
    }

    /// Removes a session when its connection closes.
    ///
    /// The returned session still carries the room association so the
    /// caller can tell the room.
    pub fn end(&mut self, player_id: PlayerId) -> Result<Session, SessionError> {
        let session = self
            .sessions
            .remove(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;
        tracing::debug!(%player_id, room = ?session.room, "session ended");
        Ok(session)
    }

    pub fn get(&self, player_id: &PlayerId) -> Option<&Session> {
        self.sessions.get(player_id)
    }

    /// Returns the number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    fn code(raw: &str) -> RoomCode {
        RoomCode::parse(raw).unwrap()
    }

    fn outbox() -> (PlayerSender, mpsc::UnboundedReceiver<ServerEvent>) {
        mpsc::unbounded_channel()
    }

    // =====================================================================
    // create()
    // =====================================================================

    #[test]
    fn test_create_new_player_has_no_room() {
        let mut mgr = SessionManager::new();
        let (tx, _rx) = outbox();

        let session = mgr.create(pid(1), tx).expect("should succeed");

        assert_eq!(session.player_id, pid(1));
        assert!(session.room.is_none());
        assert_eq!(mgr.len(), 1);
    }

    #[test]
    fn test_create_already_connected_returns_error() {
        let mut mgr = SessionManager::new();
        let (tx, _rx) = outbox();
        mgr.create(pid(1), tx.clone()).unwrap();

        let result = mgr.create(pid(1), tx);

        assert!(matches!(result, Err(SessionError::AlreadyConnected(p)) if p == pid(1)));
    }

    // =====================================================================
    // enter_room() / exit_room()
    // =====================================================================

    #[test]
    fn test_enter_room_returns_previous_room() {
        let mut mgr = SessionManager::new();
        let (tx, _rx) = outbox();
        mgr.create(pid(1), tx).unwrap();

        assert_eq!(mgr.enter_room(pid(1), code("AAAA")).unwrap(), None);
        assert_eq!(
            mgr.enter_room(pid(1), code("BBBB")).unwrap(),
            Some(code("AAAA"))
        );
        assert_eq!(mgr.room_of(&pid(1)), Some(&code("BBBB")));
    }

    #[test]
    fn test_enter_room_unknown_player_returns_not_found() {
        let mut mgr = SessionManager::new();
        let result = mgr.enter_room(pid(9), code("AAAA"));
        assert!(matches!(result, Err(SessionError::NotFound(p)) if p == pid(9)));
    }

    #[test]
    fn test_exit_room_ignores_stale_room() {
        let mut mgr = SessionManager::new();
        let (tx, _rx) = outbox();
        mgr.create(pid(1), tx).unwrap();
        mgr.enter_room(pid(1), code("BBBB")).unwrap();

        assert!(!mgr.exit_room(pid(1), &code("AAAA")));
        assert_eq!(mgr.room_of(&pid(1)), Some(&code("BBBB")));

        assert!(mgr.exit_room(pid(1), &code("BBBB")));
        assert_eq!(mgr.room_of(&pid(1)), None);
    }

    // =====================================================================
    // notify() / end()
    // =====================================================================

    #[test]
    fn test_notify_delivers_to_outbox() {
        let mut mgr = SessionManager::new();
        let (tx, mut rx) = outbox();
        mgr.create(pid(1), tx).unwrap();

        assert!(mgr.notify(&pid(1), ServerEvent::error("room not found")));
        assert_eq!(rx.try_recv().unwrap(), ServerEvent::error("room not found"));
    }

    #[test]
    fn test_notify_closed_outbox_returns_false() {
        let mut mgr = SessionManager::new();
        let (tx, rx) = outbox();
        mgr.create(pid(1), tx).unwrap();
        drop(rx);

        assert!(!mgr.notify(&pid(1), ServerEvent::error("x")));
        assert!(!mgr.notify(&pid(2), ServerEvent::error("x")));
    }

    #[test]
    fn test_end_returns_session_with_room() {
        let mut mgr = SessionManager::new();
        let (tx, _rx) = outbox();
        mgr.create(pid(1), tx).unwrap();
        mgr.enter_room(pid(1), code("AB12")).unwrap();

        let session = mgr.end(pid(1)).expect("should succeed");

        assert_eq!(session.room, Some(code("AB12")));
        assert!(mgr.is_empty());
        assert!(matches!(mgr.end(pid(1)), Err(SessionError::NotFound(_))));
    }

    #[test]
    fn test_end_frees_id_for_reuse() {
        let mut mgr = SessionManager::new();
        let (tx, _rx) = outbox();
        mgr.create(pid(1), tx.clone()).unwrap();
        mgr.end(pid(1)).unwrap();

        assert!(mgr.create(pid(1), tx).is_ok());
    }
}
