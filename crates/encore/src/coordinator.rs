//! The session coordinator: routes client events to rooms.
//!
//! The coordinator is the only place that knows about more than one room.
//! It keeps the connection ↔ room association in a [`SessionManager`],
//! validates events at the boundary, and turns room errors that a client
//! should see into `error` events for that client alone.

use encore_content::RoundContentProvider;
use encore_protocol::{ClientEvent, PlayerId, RoomCode, ServerEvent};
use encore_room::{RejoinOutcome, RoomError, RoomHandle, RoomRegistry};
use encore_session::{PlayerSender, SessionError, SessionManager};
use tokio::sync::Mutex;

use crate::EncoreError;

/// Sent to the caller when an action names a room that isn't running.
pub const ROOM_NOT_FOUND_MESSAGE: &str = "Room not found";

/// A join can race a room tearing itself down; retry against a fresh room
/// this many times before giving up.
const JOIN_ATTEMPTS: usize = 3;

/// Routes every connection's events to the right room.
pub struct Coordinator<P> {
    sessions: Mutex<SessionManager>,
    rooms: RoomRegistry<P>,
}

impl<P: RoundContentProvider> Coordinator<P> {
    pub fn new(rooms: RoomRegistry<P>) -> Self {
        Self {
            sessions: Mutex::new(SessionManager::new()),
            rooms,
        }
    }

    pub fn rooms(&self) -> &RoomRegistry<P> {
        &self.rooms
    }

    /// Registers a new connection and where its events go.
    pub async fn connect(&self, player_id: PlayerId, outbox: PlayerSender) -> Result<(), EncoreError> {
        self.sessions.lock().await.create(player_id, outbox)?;
        tracing::info!(%player_id, "player connected");
        Ok(())
    }

    /// The room a connection is currently associated with.
    pub async fn room_of(&self, player_id: PlayerId) -> Option<RoomCode> {
        self.sessions.lock().await.room_of(&player_id).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Sends one event to one connection.
    pub async fn notify(&self, player_id: PlayerId, event: ServerEvent) -> bool {
        self.sessions.lock().await.notify(&player_id, event)
    }

    /// Handles one event from a connection.
    ///
    /// Invalid events never reach a room; the sender gets an `error`.
    pub async fn handle(&self, player_id: PlayerId, event: ClientEvent) {
        if let Err(e) = event.validate() {
            tracing::debug!(%player_id, kind = event.kind(), error = %e, "rejected event");
            self.notify(player_id, ServerEvent::error(e.to_string())).await;
            return;
        }

        let kind = event.kind();
        let result = match event {
            ClientEvent::JoinRoom { room_code } => self.join(player_id, room_code).await,
            ClientEvent::RejoinRoom {
                room_code,
                player_id: prior,
            } => self.rejoin(player_id, room_code, prior).await,
            ClientEvent::LeaveRoom { room_code } => self.leave(player_id, &room_code).await,
            ClientEvent::StartGame {
                room_code,
                max_rounds,
            } => match self.room(&room_code) {
                Ok(room) => room.start_game(player_id, max_rounds).await.map_err(Into::into),
                Err(e) => Err(e),
            },
            ClientEvent::SetMaxRounds {
                room_code,
                max_rounds,
            } => match self.room(&room_code) {
                Ok(room) => room.set_max_rounds(player_id, max_rounds).await.map_err(Into::into),
                Err(e) => Err(e),
            },
            ClientEvent::SubmitAnswer { room_code, answer } => match self.room(&room_code) {
                Ok(room) => room.submit_answer(player_id, answer).await.map_err(Into::into),
                Err(e) => Err(e),
            },
            ClientEvent::PlayAgain { room_code } => match self.room(&room_code) {
                Ok(room) => room.play_again(player_id).await.map_err(Into::into),
                Err(e) => Err(e),
            },
            ClientEvent::RefreshAvatar { room_code } => match self.room(&room_code) {
                Ok(room) => room.refresh_avatar(player_id).await.map_err(Into::into),
                Err(e) => Err(e),
            },
        };

        if let Err(e) = result {
            self.report(player_id, kind, e).await;
        }
    }

    /// Tears down a connection's session. Its room, if any, holds the seat
    /// for the reconnect window.
    pub async fn disconnect(&self, player_id: PlayerId) {
        let session = match self.sessions.lock().await.end(player_id) {
            Ok(session) => session,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "disconnect for unknown session");
                return;
            }
        };

        if let Some(code) = session.room
            && let Ok(room) = self.room(&code)
            && let Err(e) = room.disconnect(player_id).await
        {
            tracing::debug!(%player_id, room = %code, error = %e, "room gone before disconnect");
        }
        tracing::info!(%player_id, "player disconnected");
    }

    // -- Operations -------------------------------------------------------

    async fn join(&self, player_id: PlayerId, code: RoomCode) -> Result<(), EncoreError> {
        let outbox = self.outbox(player_id).await?;
        self.enter(player_id, &code).await?;

        let mut attempt = 1;
        loop {
            let room = self.rooms.get_or_create(&code);
            match room.join(player_id, outbox.clone()).await {
                Ok(()) => return Ok(()),
                Err(RoomError::Closed(_)) if attempt < JOIN_ATTEMPTS => {
                    tracing::debug!(%player_id, room = %code, attempt, "room closed during join, retrying");
                    attempt += 1;
                }
                Err(e) => {
                    self.sessions.lock().await.exit_room(player_id, &code);
                    return Err(e.into());
                }
            }
        }
    }

    async fn rejoin(&self, player_id: PlayerId, code: RoomCode, prior: PlayerId) -> Result<(), EncoreError> {
        let room = self.room(&code)?;
        let outbox = self.outbox(player_id).await?;
        self.enter(player_id, &code).await?;

        match room.rejoin(player_id, prior, outbox).await {
            Ok(RejoinOutcome::Restored) => {
                tracing::info!(%player_id, %prior, room = %code, "seat restored");
                Ok(())
            }
            Ok(RejoinOutcome::JoinedFresh) => {
                tracing::info!(%player_id, %prior, room = %code, "no seat held, joined as new player");
                Ok(())
            }
            Err(e) => {
                self.sessions.lock().await.exit_room(player_id, &code);
                Err(e.into())
            }
        }
    }

    async fn leave(&self, player_id: PlayerId, code: &RoomCode) -> Result<(), EncoreError> {
        self.sessions.lock().await.exit_room(player_id, code);
        self.room(code)?.leave(player_id).await?;
        Ok(())
    }

    // -- Helpers ----------------------------------------------------------

    fn room(&self, code: &RoomCode) -> Result<RoomHandle, EncoreError> {
        Ok(self.rooms.get(code)?)
    }

    async fn outbox(&self, player_id: PlayerId) -> Result<PlayerSender, EncoreError> {
        self.sessions
            .lock()
            .await
            .outbox(&player_id)
            .ok_or_else(|| SessionError::NotFound(player_id).into())
    }

    /// Associates the connection with `code`, first leaving any other room
    /// it was in.
    async fn enter(&self, player_id: PlayerId, code: &RoomCode) -> Result<(), EncoreError> {
        let previous = self
            .sessions
            .lock()
            .await
            .enter_room(player_id, code.clone())?;

        if let Some(previous) = previous.filter(|p| p != code)
            && let Ok(room) = self.room(&previous)
        {
            tracing::debug!(%player_id, from = %previous, to = %code, "switching rooms");
            if let Err(e) = room.leave(player_id).await {
                tracing::debug!(%player_id, room = %previous, error = %e, "previous room already left");
            }
        }
        Ok(())
    }

    /// Tells the caller about a failure it should see; logs the rest.
    async fn report(&self, player_id: PlayerId, kind: &str, err: EncoreError) {
        match err {
            EncoreError::Room(RoomError::NotFound(code) | RoomError::Closed(code)) => {
                tracing::debug!(%player_id, kind, room = %code, "room not found");
                self.notify(player_id, ServerEvent::error(ROOM_NOT_FOUND_MESSAGE))
                    .await;
            }
            EncoreError::Room(RoomError::NotInRoom(..)) => {
                tracing::debug!(%player_id, kind, "not in that room");
            }
            EncoreError::Session(e) => {
                tracing::warn!(%player_id, kind, error = %e, "event from connection without a session");
            }
            other => {
                tracing::debug!(%player_id, kind, error = %other, "event failed");
            }
        }
    }
}
