//! Signaling WebSocket handler
//!
//! Thin matchmaking handoff: a client asks to join with a mode and its
//! measured latency, and gets back the game endpoint to connect to. With
//! a registry in front this is where multi-server selection would hang;
//! a single server always hands out its own public URL.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::StreamExt;
use tracing::{debug, warn};

use crate::app::AppState;
use crate::protocol::messages::{ClientMsg, ServerMsg};

pub async fn signaling_ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_signaling_socket(socket, state))
}

async fn handle_signaling_socket(mut socket: WebSocket, state: AppState) {
    while let Some(result) = socket.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMsg>(&text) {
                Ok(ClientMsg::Join { mode, latency }) => {
                    debug!(mode = ?mode, latency = ?latency, "signaling join");
                    let reply = ServerMsg::Joined {
                        game_url: state.config.public_game_ws_url.clone(),
                    };
                    let Ok(json) = serde_json::to_string(&reply) else {
                        break;
                    };
                    if socket.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Ok(other) => {
                    warn!(msg = ?other, "unexpected message on signaling channel");
                }
                Err(err) => {
                    warn!(error = %err, "unparseable signaling message");
                }
            },
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Binary(_)) => {}
            Ok(Message::Close(_)) | Err(_) => break,
        }
    }
}
