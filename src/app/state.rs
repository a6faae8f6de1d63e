//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{ArenaRegistry, KillLog};
use crate::session::SessionService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionService>,
    pub arena_registry: Arc<ArenaRegistry>,
    /// Server-wide kill feed, shared by every arena
    pub kill_log: Arc<KillLog>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        let arena_registry = Arc::new(ArenaRegistry::new());
        let kill_log = Arc::new(KillLog::default());

        // Session service (Arc for sharing across cloned AppState)
        let sessions = Arc::new(SessionService::new(
            arena_registry.clone(),
            kill_log.clone(),
            config.arena_max_players,
            config.respawn_delay_secs,
        ));

        Self {
            config,
            sessions,
            arena_registry,
            kill_log,
        }
    }
}
