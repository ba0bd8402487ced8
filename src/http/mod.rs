//! HTTP layer

pub mod routes;

pub use routes::{build_api_router, build_game_router, build_signaling_router};
