//! Per-connection handler: handshake, outbound queue, and request routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive Handshake → validate version → assign a PlayerId
//!   2. Send Welcome → player is connected
//!   3. Loop: receive frames → run the request → queue its ack
//!
//! Everything sent to the client (room broadcasts, game events, acks)
//! goes through one unbounded queue drained by a writer task, which stamps
//! each frame with the connection's next `seq`. A request's ack is queued
//! after the room has replied, so the caller always sees the broadcasts
//! caused by its own request before the ack.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use whodunit_protocol::{
    AckResult, ClientFrame, Codec, ErrorCode, PROTOCOL_VERSION, PlayerId, ProtocolError, Request,
    RoomCode, ServerFrame, ServerPayload,
};
use whodunit_room::{PlayerSender, RoomError, Ruleset};
use whodunit_transport::{Connection, WebSocketConnection};

use crate::WhodunitError;
use crate::server::ServerState;

/// Counter for player identities. Shared by both rulesets.
static NEXT_PLAYER_ID: AtomicU64 = AtomicU64::new(1);

/// How long a new connection has to send its Handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Drop guard that removes a player from their room when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async lock.
/// The normal exit path calls [`release`](Self::release) instead.
struct MembershipGuard<R: Ruleset, C: Codec> {
    player_id: PlayerId,
    state: Option<Arc<ServerState<R, C>>>,
}

impl<R: Ruleset, C: Codec> MembershipGuard<R, C> {
    /// Removes the player now and disarms the guard.
    async fn release(mut self) {
        if let Some(state) = self.state.take() {
            remove_member(&state, self.player_id).await;
        }
    }
}

impl<R: Ruleset, C: Codec> Drop for MembershipGuard<R, C> {
    fn drop(&mut self) {
        let player_id = self.player_id;
        if let Some(state) = self.state.take() {
            tokio::spawn(async move {
                remove_member(&state, player_id).await;
            });
        }
    }
}

async fn remove_member<R: Ruleset, C: Codec>(state: &ServerState<R, C>, player_id: PlayerId) {
    match state.rooms.lock().await.remove_member(player_id).await {
        Ok(room) => tracing::info!(%player_id, %room, "player left room on disconnect"),
        Err(RoomError::NotInAnyRoom(_)) => {}
        Err(e) => tracing::warn!(%player_id, error = %e, "cleanup failed"),
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<R: Ruleset, C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<R, C>>,
) -> Result<(), WhodunitError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, ruleset = R::NAME, "handling new connection");

    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_frames(Arc::clone(&conn), Arc::clone(&state), rx));

    // --- Step 1: Handshake ---
    let player_id = match perform_handshake(&conn, &state, &tx).await {
        Ok(player_id) => player_id,
        Err(e) => {
            // Flush the rejection before closing.
            drop(tx);
            let _ = writer.await;
            let _ = conn.close().await;
            return Err(e);
        }
    };
    tracing::info!(%conn_id, %player_id, ruleset = R::NAME, "player connected");

    let guard = MembershipGuard {
        player_id,
        state: Some(Arc::clone(&state)),
    };

    // --- Step 2: Request loop ---
    // Heartbeat `server_time` is measured from here.
    let connected_at = Instant::now();
    loop {
        let text = match conn.recv().await {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::info!(%player_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "recv error");
                break;
            }
        };

        let frame: ClientFrame<R::Action> = match state.codec.decode(&text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "failed to decode frame");
                reject(&tx, 0, ErrorCode::BadRequest, format!("invalid frame: {e}"));
                continue;
            }
        };

        let ClientFrame { id, request } = frame;
        let result = match request {
            Request::Heartbeat { client_time } => {
                let _ = tx.send(ServerPayload::HeartbeatAck {
                    client_time,
                    server_time: millis_since(connected_at),
                });
                continue;
            }
            Request::Disconnect { reason } => {
                tracing::info!(%player_id, %reason, "client disconnected");
                break;
            }
            Request::Handshake { .. } => {
                reject(&tx, id, ErrorCode::BadRequest, "handshake already completed".into());
                continue;
            }
            Request::CreateRoom { name } => {
                let mut rooms = state.rooms.lock().await;
                rooms.create_room(player_id, &name, tx.clone()).await.map(Some)
            }
            Request::JoinRoom { room_code, name } => {
                let mut rooms = state.rooms.lock().await;
                rooms
                    .join_room(&room_code, player_id, &name, tx.clone())
                    .await
                    .map(Some)
            }
            Request::StartRound { room_code } => start_round(&state, player_id, &room_code).await,
            Request::Act { room_code, action } => {
                act(&state, player_id, &room_code, action).await
            }
            Request::LeaveRoom => {
                let mut rooms = state.rooms.lock().await;
                rooms.remove_member(player_id).await.map(Some)
            }
        };

        let result = match result {
            Ok(room_code) => AckResult::Accepted { room_code },
            Err(e) => {
                tracing::debug!(%player_id, request = id, error = %e, "request rejected");
                AckResult::Rejected {
                    code: e.code(),
                    message: e.to_string(),
                }
            }
        };
        let _ = tx.send(ServerPayload::Ack { id, result });
    }

    // Leave the room first so it drops its copy of the sender; the writer
    // then drains what is queued and stops.
    guard.release().await;
    drop(tx);
    let _ = writer.await;
    let _ = conn.close().await;
    Ok(())
}

/// Performs the initial handshake: receive Handshake, validate, send Welcome.
async fn perform_handshake<R: Ruleset, C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<R, C>,
    tx: &PlayerSender<R>,
) -> Result<PlayerId, WhodunitError> {
    let text = match tokio::time::timeout(HANDSHAKE_TIMEOUT, conn.recv()).await {
        Ok(Ok(Some(text))) => text,
        Ok(Ok(None)) => return Err(invalid("connection closed before handshake")),
        Ok(Err(e)) => return Err(WhodunitError::Transport(e)),
        Err(_) => return Err(invalid("handshake timed out")),
    };

    let frame: ClientFrame<R::Action> = match state.codec.decode(&text) {
        Ok(frame) => frame,
        Err(e) => {
            reject(tx, 0, ErrorCode::BadRequest, format!("invalid frame: {e}"));
            return Err(e.into());
        }
    };

    let version = match frame.request {
        Request::Handshake { version } => version,
        _ => {
            reject(tx, frame.id, ErrorCode::BadRequest, "expected Handshake".into());
            return Err(invalid("first message must be Handshake"));
        }
    };

    if version != PROTOCOL_VERSION {
        reject(
            tx,
            frame.id,
            ErrorCode::BadRequest,
            format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}"),
        );
        return Err(invalid("protocol version mismatch"));
    }

    let player_id = PlayerId(NEXT_PLAYER_ID.fetch_add(1, Ordering::Relaxed));
    let _ = tx.send(ServerPayload::Welcome {
        player_id,
        protocol_version: PROTOCOL_VERSION,
    });
    Ok(player_id)
}

/// Round commands only clone the room handle under the registry lock.
async fn start_round<R: Ruleset, C: Codec>(
    state: &ServerState<R, C>,
    player_id: PlayerId,
    room_code: &str,
) -> Result<Option<RoomCode>, RoomError> {
    let room = state.rooms.lock().await.room_for(player_id, room_code)?;
    room.start_round(player_id).await?;
    Ok(None)
}

async fn act<R: Ruleset, C: Codec>(
    state: &ServerState<R, C>,
    player_id: PlayerId,
    room_code: &str,
    action: R::Action,
) -> Result<Option<RoomCode>, RoomError> {
    let room = state.rooms.lock().await.room_for(player_id, room_code)?;
    room.act(player_id, action).await?;
    Ok(None)
}

/// Drains the outbound queue onto the socket, numbering frames from 0.
async fn write_frames<R: Ruleset, C: Codec>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<R, C>>,
    mut rx: mpsc::UnboundedReceiver<ServerPayload<R::Event>>,
) {
    let mut seq: u64 = 0;
    while let Some(payload) = rx.recv().await {
        let frame = ServerFrame { seq, payload };
        let text = match state.codec.encode(&frame) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(conn_id = %conn.id(), error = %e, "failed to encode frame");
                continue;
            }
        };
        if let Err(e) = conn.send(&text).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "send failed, stopping writer");
            break;
        }
        seq += 1;
    }
}

/// Milliseconds since `instant`, saturating at `u64::MAX`.
fn millis_since(instant: Instant) -> u64 {
    u64::try_from(instant.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn reject<E>(tx: &mpsc::UnboundedSender<ServerPayload<E>>, id: u64, code: ErrorCode, message: String) {
    let _ = tx.send(ServerPayload::Ack {
        id,
        result: AckResult::Rejected { code, message },
    });
}

fn invalid(reason: &str) -> WhodunitError {
    WhodunitError::Protocol(ProtocolError::InvalidMessage(reason.into()))
}
