use std::time::Duration;

use tracing::info;

use crate::game_service::GameService;

/// Periodic sweep, complementing the sweeps run on device reads.
pub struct CleanupTask {
    service: GameService,
    check_interval: Duration,
}

impl CleanupTask {
    pub fn new(service: GameService, check_interval: Duration) -> Self {
        Self {
            service,
            check_interval,
        }
    }

    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.check_interval);

        loop {
            interval.tick().await;
            let evicted = self.service.sweep().await;
            if !evicted.is_empty() {
                info!("Background sweep evicted {} devices", evicted.len());
            }
        }
    }
}
