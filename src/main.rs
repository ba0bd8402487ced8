//! Shelter Game Server - Authoritative multiplayer game server
//!
//! This is the main entry point for the game server. It runs:
//! - The game WebSocket listener for real-time play
//! - The signaling WebSocket listener for matchmaking handoff
//! - The HTTP API listener for health and status
//! - The global match scheduler and registry advertisement loops

use std::future::IntoFuture;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shelter_game_server::app::AppState;
use shelter_game_server::config::Config;
use shelter_game_server::http::{build_api_router, build_game_router, build_signaling_router};
use shelter_game_server::util::time::init_server_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    // Initialize server time tracking
    init_server_time();

    info!("Starting Shelter Game Server");

    // Create application state
    let state = AppState::new(config.clone());

    // Spawn the global match scheduler
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(orchestrator.run());

    // Spawn registry advertisement (no-op when unconfigured)
    let registry = state.registry.clone();
    tokio::spawn(registry.run(state.orchestrator.clone()));

    // Bind the three listeners
    let game_addr = SocketAddr::from(([0, 0, 0, 0], config.game_ws_port));
    let signaling_addr = SocketAddr::from(([0, 0, 0, 0], config.signaling_port));
    let api_addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));

    let game_listener = TcpListener::bind(game_addr).await?;
    let signaling_listener = TcpListener::bind(signaling_addr).await?;
    let api_listener = TcpListener::bind(api_addr).await?;

    info!("Game WebSocket: ws://{}/ws", game_addr);
    info!("Signaling WebSocket: ws://{}/ws", signaling_addr);
    info!("API: http://{}/health", api_addr);

    let game_srv = axum::serve(game_listener, build_game_router(state.clone()))
        .with_graceful_shutdown(shutdown_signal());
    let signaling_srv = axum::serve(signaling_listener, build_signaling_router(state.clone()))
        .with_graceful_shutdown(shutdown_signal());
    let api_srv = axum::serve(api_listener, build_api_router(state.clone()))
        .with_graceful_shutdown(shutdown_signal());

    tokio::try_join!(
        game_srv.into_future(),
        signaling_srv.into_future(),
        api_srv.into_future()
    )?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
