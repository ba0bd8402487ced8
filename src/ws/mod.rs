//! WebSocket handlers for the game and signaling listeners

pub mod handler;
pub mod signaling;
