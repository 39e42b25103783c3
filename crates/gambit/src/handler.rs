//! Per-connection handler: admission and event pumping.
//!
//! Each accepted connection gets its own Tokio task running this
//! handler. The flow is:
//!   1. Receive the `join` event (bounded wait) → registry assigns a
//!      session and role
//!   2. Loop: pump session broadcasts out, route `move` attempts in
//!   3. On any exit, a drop guard reports the departure to the registry

use std::sync::Arc;
use std::time::Duration;

use gambit_protocol::{ClientEvent, Codec};
use gambit_session::RulesOracle;
use gambit_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::GambitError;
use crate::server::ServerState;

/// How long a fresh connection gets to send its `join` event. An
/// admitted participant is never timed out — only the unjoined limbo
/// state is bounded.
const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Drop guard that reports a departure to the registry when the
/// handler exits — on clean close, transport error, or panic alike.
/// `Drop` is synchronous, so the async leave runs in a spawned task.
struct DepartureGuard<O: RulesOracle, C: Codec> {
    conn: ConnectionId,
    state: Arc<ServerState<O, C>>,
}

impl<O: RulesOracle, C: Codec> Drop for DepartureGuard<O, C> {
    fn drop(&mut self) {
        let conn = self.conn;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            // NotAMember here just means the session dissolved first.
            let _ = state.registry.lock().await.leave(conn).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<O, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<O, C>>,
) -> Result<(), GambitError>
where
    O: RulesOracle,
    C: Codec,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    // --- Step 1: admission ---
    let target = await_join(&conn, &state).await?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let grant = {
        let mut registry = state.registry.lock().await;
        registry.join(conn_id, event_tx, target).await?
    };
    tracing::info!(
        %conn_id,
        session_id = %grant.session_id,
        role = %grant.role,
        "participant admitted"
    );

    let _guard = DepartureGuard {
        conn: conn_id,
        state: Arc::clone(&state),
    };

    // --- Step 2: pump loop ---
    //
    // No timeouts from here on: a participant may legitimately wait
    // forever for its opponent.
    loop {
        tokio::select! {
            outbound = event_rx.recv() => {
                match outbound {
                    Some(event) => {
                        let bytes = state.codec.encode(&event)?;
                        conn.send(&bytes).await.map_err(GambitError::Transport)?;
                    }
                    None => {
                        // Session dissolved under us (both seats left).
                        tracing::info!(%conn_id, "session dissolved, closing connection");
                        let _ = conn.close().await;
                        break;
                    }
                }
            }

            inbound = conn.recv() => {
                match inbound {
                    Ok(Some(data)) => {
                        handle_client_frame(&conn, &state, conn_id, &data).await;
                    }
                    Ok(None) => {
                        tracing::info!(%conn_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        break;
                    }
                }
            }
        }
    }

    // _guard drops here → departure handling fires.
    Ok(())
}

/// Waits for the initial `join` event and returns its session target.
///
/// Anything else — a timeout, a close, an undecodable frame, a `move`
/// before joining — ends the connection. Nothing is owed to a client
/// that never joined.
async fn await_join<O, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<O, C>>,
) -> Result<Option<gambit_protocol::SessionId>, GambitError>
where
    O: RulesOracle,
    C: Codec,
{
    let data = match tokio::time::timeout(JOIN_TIMEOUT, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(GambitError::Protocol(
                gambit_protocol::ProtocolError::InvalidMessage(
                    "connection closed before join".into(),
                ),
            ));
        }
        Ok(Err(e)) => return Err(GambitError::Transport(e)),
        Err(_) => {
            return Err(GambitError::Protocol(
                gambit_protocol::ProtocolError::InvalidMessage(
                    "join timed out".into(),
                ),
            ));
        }
    };

    match state.codec.decode(&data)? {
        ClientEvent::Join { session_id } => Ok(session_id),
        other => Err(GambitError::Protocol(
            gambit_protocol::ProtocolError::InvalidMessage(format!(
                "first message must be join, got {other:?}"
            )),
        )),
    }
}

/// Handles one inbound frame from an admitted participant.
///
/// A frame that does not decode into the move shape is answered with
/// `invalidMove` (sender only) — malformed requests fold into the
/// illegal-move reason rather than touching the oracle or the session.
/// Stray joins are logged and dropped. Nothing here is fatal; a
/// misbehaving client costs itself moves, never the session.
async fn handle_client_frame<O, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<O, C>>,
    conn_id: ConnectionId,
    data: &[u8],
) where
    O: RulesOracle,
    C: Codec,
{
    match state.codec.decode::<ClientEvent>(data) {
        Ok(ClientEvent::Move(request)) => {
            let result = {
                let registry = state.registry.lock().await;
                registry.route_move(conn_id, request).await
            };
            if let Err(e) = result {
                tracing::debug!(%conn_id, error = %e, "move routing failed");
            }
        }
        Ok(ClientEvent::Join { .. }) => {
            tracing::debug!(%conn_id, "duplicate join, ignoring");
        }
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "undecodable frame");
            let reply = gambit_protocol::ServerEvent::InvalidMove {
                error: gambit_protocol::RejectReason::IllegalMove,
            };
            if let Ok(bytes) = state.codec.encode(&reply) {
                let _ = conn.send(&bytes).await;
            }
        }
    }
}
