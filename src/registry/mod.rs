//! Best-effort advertisement to the multi-server registry
//!
//! When `REGISTRY_URL` is configured the server announces its identity and
//! load on a fixed interval so the signaling tier can spread players.
//! Every failure is swallowed at debug level; the game must never depend
//! on the registry being up.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::orchestrator::Orchestrator;

pub const REGISTRY_INTERVAL_SECS: u64 = 10;
const REGISTRY_TIMEOUT_SECS: u64 = 5;

#[derive(Serialize)]
struct Advertisement<'a> {
    server_id: &'a str,
    game_ws_url: &'a str,
    players: usize,
    matches: usize,
}

#[derive(Clone)]
pub struct RegistryClient {
    http: Client,
    base_url: Option<String>,
    server_id: String,
    game_ws_url: String,
}

impl RegistryClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(REGISTRY_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            base_url: config.registry_url.clone(),
            server_id: config.server_id.clone(),
            game_ws_url: config.public_game_ws_url.clone(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.base_url.is_some()
    }

    /// Announce current load once; failures are logged and dropped
    pub async fn advertise(&self, players: usize, matches: usize) {
        let Some(base) = &self.base_url else {
            return;
        };
        let body = Advertisement {
            server_id: &self.server_id,
            game_ws_url: &self.game_ws_url,
            players,
            matches,
        };

        let url = format!("{}/announce", base.trim_end_matches('/'));
        match self.http.post(&url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(players, matches, "registry advertisement accepted");
            }
            Ok(response) => {
                debug!(status = %response.status(), "registry rejected advertisement");
            }
            Err(err) => {
                debug!(error = %err, "registry advertisement failed");
            }
        }
    }

    /// Periodic advertisement loop; returns immediately when unconfigured
    pub async fn run(self: Arc<Self>, orchestrator: Arc<Orchestrator>) {
        if !self.enabled() {
            info!("registry advertisement disabled (REGISTRY_URL unset)");
            return;
        }
        info!(
            server_id = %self.server_id,
            interval_secs = REGISTRY_INTERVAL_SECS,
            "registry advertisement running"
        );

        let mut ticker = tokio::time::interval(Duration::from_secs(REGISTRY_INTERVAL_SECS));
        loop {
            ticker.tick().await;
            self.advertise(orchestrator.player_count(), orchestrator.match_count())
                .await;
        }
    }
}
