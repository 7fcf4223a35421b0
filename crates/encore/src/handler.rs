//! Per-connection handler: outbound writer, inbound read loop, cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//!   1. Register a session whose outbox feeds a writer task
//!   2. Loop: receive frames → decode → hand to the coordinator
//!   3. On close, error, or idle timeout: the guard reports a disconnect

use std::sync::Arc;

use encore_content::RoundContentProvider;
use encore_protocol::{ClientEvent, Codec, PlayerId, ServerEvent};
use encore_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::EncoreError;
use crate::server::ServerState;

/// Reports the disconnect when the handler exits, even by panic.
///
/// `Drop` is synchronous, so the async cleanup runs on its own task.
struct DisconnectGuard<P: RoundContentProvider, C: Codec> {
    player_id: PlayerId,
    state: Arc<ServerState<P, C>>,
}

impl<P: RoundContentProvider, C: Codec> Drop for DisconnectGuard<P, C> {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.coordinator.disconnect(player_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<P, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<P, C>>,
) -> Result<(), EncoreError>
where
    P: RoundContentProvider,
    C: Codec,
{
    let conn = Arc::new(conn);
    let player_id = PlayerId::from(conn.id());
    tracing::debug!(conn_id = %conn.id(), peer = %conn.peer_addr(), %player_id, "handling new connection");

    let (outbox, inbox) = mpsc::unbounded_channel();
    state.coordinator.connect(player_id, outbox).await?;
    let _guard = DisconnectGuard {
        player_id,
        state: Arc::clone(&state),
    };

    let writer = tokio::spawn(write_events(Arc::clone(&conn), Arc::clone(&state), inbox));

    loop {
        let data = match tokio::time::timeout(state.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%player_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%player_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%player_id, "connection idle too long");
                break;
            }
        };

        let event: ClientEvent = match state.codec.decode(&data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "failed to decode event");
                state
                    .coordinator
                    .notify(player_id, ServerEvent::error(format!("invalid message: {e}")))
                    .await;
                continue;
            }
        };

        tracing::trace!(%player_id, kind = event.kind(), room = %event.room_code(), "event received");
        state.coordinator.handle(player_id, event).await;
    }

    // Stopping the writer drops the inbox, which is what rooms see as the
    // connection going away.
    writer.abort();
    if let Err(e) = conn.close().await {
        tracing::trace!(%player_id, error = %e, "close after disconnect");
    }
    Ok(())
}

/// Drains a connection's outbox onto the socket until either side closes.
async fn write_events<P, C>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<P, C>>,
    mut inbox: mpsc::UnboundedReceiver<ServerEvent>,
) where
    P: RoundContentProvider,
    C: Codec,
{
    while let Some(event) = inbox.recv().await {
        let frame = match state.codec.encode(&event) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(conn_id = %conn.id(), error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = conn.send(&frame).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "send failed, stopping writer");
            break;
        }
    }
}
