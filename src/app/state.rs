//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::orchestrator::Orchestrator;
use crate::registry::RegistryClient;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Arc<Orchestrator>,
    pub registry: Arc<RegistryClient>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let registry = Arc::new(RegistryClient::new(&config));
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(Orchestrator::new()),
            registry,
        }
    }
}
