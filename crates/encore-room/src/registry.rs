//! Room registry: the server-wide map from room code to running room.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use encore_content::RoundContentProvider;
use encore_protocol::RoomCode;

use crate::room::spawn_room;
use crate::{GameConfig, RoomError, RoomHandle};

/// Shared between the registry and every room actor, so a room can
/// deregister itself when it empties.
pub(crate) type RoomTable = Arc<Mutex<HashMap<RoomCode, RoomHandle>>>;

pub(crate) fn lock_table(table: &RoomTable) -> MutexGuard<'_, HashMap<RoomCode, RoomHandle>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Creates rooms on first use and hands out handles to them.
///
/// The lock is only held for map lookups and inserts, never across an
/// await. Rooms remove their own entry when they tear down.
pub struct RoomRegistry<P> {
    table: RoomTable,
    provider: Arc<P>,
    config: GameConfig,
}

impl<P> Clone for RoomRegistry<P> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            provider: Arc::clone(&self.provider),
            config: self.config.clone(),
        }
    }
}

impl<P: RoundContentProvider> RoomRegistry<P> {
    pub fn new(provider: P, config: GameConfig) -> Self {
        Self::with_shared_provider(Arc::new(provider), config)
    }

    pub fn with_shared_provider(provider: Arc<P>, config: GameConfig) -> Self {
        Self {
            table: Arc::new(Mutex::new(HashMap::new())),
            provider,
            config: config.validated(),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Returns the room for `code`, spawning it if none is running.
    ///
    /// Lookup and insert happen under one lock, so two concurrent joins
    /// for a new code land in the same room.
    pub fn get_or_create(&self, code: &RoomCode) -> RoomHandle {
        let mut table = lock_table(&self.table);
        if let Some(handle) = table.get(code)
            && !handle.is_closed()
        {
            return handle.clone();
        }

        let handle = spawn_room(
            code.clone(),
            &self.config,
            Arc::clone(&self.provider),
            Arc::clone(&self.table),
        );
        table.insert(code.clone(), handle.clone());
        tracing::info!(room = %code, rooms = table.len(), "room created");
        handle
    }

    /// Looks up a running room without creating one.
    pub fn get(&self, code: &RoomCode) -> Result<RoomHandle, RoomError> {
        lock_table(&self.table)
            .get(code)
            .filter(|handle| !handle.is_closed())
            .cloned()
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    /// Removes a room, but only if nobody is in it or holding a seat.
    /// Returns whether the room was removed.
    pub async fn remove(&self, code: &RoomCode) -> Result<bool, RoomError> {
        let handle = self.get(code)?;
        handle.close(false).await
    }

    pub fn room_count(&self) -> usize {
        lock_table(&self.table).len()
    }

    pub fn codes(&self) -> Vec<RoomCode> {
        let mut codes: Vec<RoomCode> = lock_table(&self.table).keys().cloned().collect();
        codes.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        codes
    }

    /// Tears down every room. Used at server shutdown.
    pub async fn shutdown(&self) {
        let handles: Vec<RoomHandle> = lock_table(&self.table).values().cloned().collect();
        for handle in handles {
            if let Err(e) = handle.close(true).await {
                tracing::debug!(room = %handle.code(), error = %e, "room already closed");
            }
        }
    }
}
