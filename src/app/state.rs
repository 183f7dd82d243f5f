//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::RoomRegistry;
use crate::ws::SessionHub;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub hub: Arc<SessionHub>,
    pub registry: Arc<RoomRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // Rooms publish through the hub that owns the sockets
        let hub = Arc::new(SessionHub::new());

        let registry = Arc::new(RoomRegistry::new(
            hub.clone(),
            Arc::new(config.game.clone()),
            config.max_players_per_room,
        ));

        Self {
            config,
            hub,
            registry,
        }
    }
}
