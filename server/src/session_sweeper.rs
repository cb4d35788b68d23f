use std::time::Duration;

use common::DeviceId;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::device_registry::DeviceRegistry;
use crate::lobby_manager::MatchmakingLobby;
use crate::match_manager::MatchManager;

/// Evicts idle devices from the registry and the lobby together.
#[derive(Debug, Clone, Copy)]
pub struct SessionSweeper {
    inactivity_timeout: Duration,
}

impl SessionSweeper {
    pub fn new(inactivity_timeout: Duration) -> Self {
        Self { inactivity_timeout }
    }

    /// Players of a running match are kept regardless of idleness.
    pub fn sweep(
        &self,
        registry: &mut DeviceRegistry,
        lobby: &mut MatchmakingLobby,
        matches: &MatchManager,
        now: Instant,
    ) -> Vec<DeviceId> {
        let protected = matches.active_players();
        let evicted = registry.evict_expired(now, self.inactivity_timeout, &protected);

        for device_id in &evicted {
            info!("Cleaning up inactive device: {}", device_id);
            if lobby.remove(device_id) {
                debug!("Removed {} from the lobby", device_id);
            }
        }
        evicted
    }
}
