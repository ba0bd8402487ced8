//! Game WebSocket session handler
//!
//! One task pair per connection: the reader parses frames and routes them
//! into the orchestrator, the writer forwards the match broadcast plus
//! direct replies. Binary frames are input; text frames are the JSON
//! control plane. The first message must be `mode` or the connection is
//! dropped.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::app::AppState;
use crate::orchestrator::{JoinedPlayer, Outbound};
use crate::protocol::codec::decode_input;
use crate::protocol::messages::{ClientMsg, ServerMsg};
use crate::util::rate_limit::PlayerRateLimiter;
use crate::util::time::unix_millis;

/// WebSocket upgrade handler for the game listener
pub async fn game_ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_game_socket(socket, state))
}

async fn handle_game_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sink, mut ws_stream) = socket.split();

    // Handshake: the first frame picks the mode
    let Some(joined) = await_mode_handshake(&mut ws_stream, &state).await else {
        let _ = ws_sink.send(Message::Close(None)).await;
        return;
    };

    let welcome = ServerMsg::Welcome {
        player_id: joined.player_id.clone(),
        display_name: joined.display_name.clone(),
        match_id: joined.match_id.clone(),
        mode: joined.mode,
    };
    if send_msg(&mut ws_sink, &welcome).await.is_err() {
        state.orchestrator.leave(&joined.player_id);
        return;
    }

    info!(
        player_id = %joined.player_id,
        match_id = %joined.match_id,
        "game session open"
    );
    let connected_at = unix_millis();

    let player_id = joined.player_id.clone();
    run_session(joined, ws_sink, ws_stream, &state).await;

    state.orchestrator.leave(&player_id);
    info!(
        player_id = %player_id,
        session_ms = unix_millis().saturating_sub(connected_at),
        "game session closed"
    );
}

/// Wait for the initial `mode` message and join a match. Any other first
/// message (or a closed socket) aborts the handshake.
async fn await_mode_handshake(
    ws_stream: &mut SplitStream<WebSocket>,
    state: &AppState,
) -> Option<JoinedPlayer> {
    loop {
        match ws_stream.next().await? {
            Ok(Message::Text(text)) => {
                return match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(ClientMsg::Mode { mode, display_name }) => {
                        Some(state.orchestrator.join(mode, display_name))
                    }
                    Ok(other) => {
                        warn!(msg = ?other, "expected mode as first message");
                        None
                    }
                    Err(err) => {
                        warn!(error = %err, "unparseable handshake message");
                        None
                    }
                };
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Binary(_)) => {
                warn!("binary frame before handshake");
                return None;
            }
            Ok(Message::Close(_)) | Err(_) => return None,
        }
    }
}

async fn run_session(
    joined: JoinedPlayer,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    state: &AppState,
) {
    let player_id = joined.player_id;
    let mut match_rx = joined.outbound;
    let rate_limiter = PlayerRateLimiter::new();

    // Direct replies (pong) bypass the match broadcast
    let (direct_tx, mut direct_rx) = mpsc::unbounded_channel::<ServerMsg>();

    // Writer task: match broadcast + direct replies -> WebSocket
    let writer_player_id = player_id.clone();
    let writer_handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                reply = direct_rx.recv() => {
                    let Some(msg) = reply else { break };
                    if send_msg(&mut ws_sink, &msg).await.is_err() {
                        break;
                    }
                }
                frame = match_rx.recv() => {
                    match frame {
                        Ok(Outbound::Snapshot(bytes)) => {
                            if ws_sink.send(Message::Binary(bytes.to_vec())).await.is_err() {
                                break;
                            }
                        }
                        Ok(Outbound::Control(json)) => {
                            if ws_sink.send(Message::Text(json)).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            // Snapshots are full state; dropping stale ones is safe
                            warn!(player_id = %writer_player_id, lagged = n, "client lagged, skipping frames");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    });

    // Reader loop: WebSocket -> orchestrator
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Binary(data)) => {
                if !rate_limiter.check_input() {
                    continue;
                }
                match decode_input(&data) {
                    Ok(frame) => {
                        state
                            .orchestrator
                            .set_input(&player_id, frame.flags, frame.seq);
                    }
                    Err(err) => {
                        debug!(player_id = %player_id, error = %err, "dropped bad input frame");
                    }
                }
            }
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_control() {
                    warn!(player_id = %player_id, "rate limited control message");
                    continue;
                }
                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(ClientMsg::Ready) => state.orchestrator.vote_ready(&player_id),
                    Ok(ClientMsg::FightAlly { target_id, choice }) => {
                        state
                            .orchestrator
                            .set_fight_ally(&player_id, &target_id, choice);
                    }
                    Ok(ClientMsg::Ping { ts }) => {
                        let _ = direct_tx.send(ServerMsg::Pong { ts });
                    }
                    Ok(ClientMsg::Mode { .. }) => {
                        debug!(player_id = %player_id, "duplicate mode message ignored");
                    }
                    Ok(ClientMsg::Join { .. }) => {
                        debug!(player_id = %player_id, "join belongs on the signaling channel");
                    }
                    Err(err) => {
                        warn!(player_id = %player_id, error = %err, "unparseable control message");
                    }
                }
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                debug!(player_id = %player_id, "client initiated close");
                break;
            }
            Err(err) => {
                debug!(player_id = %player_id, error = %err, "websocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

async fn send_msg(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
