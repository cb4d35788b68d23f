use std::collections::{HashMap, HashSet};
use std::time::Duration;

use common::DeviceId;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::GameError;

#[derive(Debug, Clone)]
pub struct DeviceSession {
    pub id: DeviceId,
    pub alias: String,
    pub last_active: Instant,
    pub wins: u32,
    pub losses: u32,
}

impl DeviceSession {
    /// Wins over games played, 0.0 for a device with no games.
    pub fn ratio(&self) -> f64 {
        let played = self.wins + self.losses;
        self.wins as f64 / played.max(1) as f64
    }

    fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_active) > timeout
    }
}

/// Owns every device session. Sessions are only ever removed by
/// [`DeviceRegistry::evict_expired`].
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<DeviceId, DeviceSession>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, alias: Option<String>, now: Instant) -> DeviceId {
        let mut id = DeviceId::generate();
        while self.devices.contains_key(&id) {
            id = DeviceId::generate();
        }

        let alias = alias.unwrap_or_else(|| id.short());
        info!("Registered device {} as {}", id, alias);

        self.devices.insert(
            id.clone(),
            DeviceSession {
                id: id.clone(),
                alias,
                last_active: now,
                wins: 0,
                losses: 0,
            },
        );
        id
    }

    pub fn touch(&mut self, id: &DeviceId, now: Instant) {
        if let Some(device) = self.devices.get_mut(id) {
            device.last_active = now;
        }
    }

    pub fn get(&self, id: &DeviceId) -> Result<&DeviceSession, GameError> {
        self.devices
            .get(id)
            .ok_or_else(|| GameError::DeviceNotFound(id.clone()))
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        self.devices.contains_key(id)
    }

    pub fn record_result(&mut self, id: &DeviceId, won: bool) -> Result<(), GameError> {
        let device = self
            .devices
            .get_mut(id)
            .ok_or_else(|| GameError::DeviceNotFound(id.clone()))?;

        if won {
            device.wins += 1;
        } else {
            device.losses += 1;
        }
        debug!(
            "Device {} now has {} wins and {} losses",
            id, device.wins, device.losses
        );
        Ok(())
    }

    pub fn reset_stats(&mut self, id: &DeviceId) -> Result<&DeviceSession, GameError> {
        let device = self
            .devices
            .get_mut(id)
            .ok_or_else(|| GameError::DeviceNotFound(id.clone()))?;

        device.wins = 0;
        device.losses = 0;
        info!("Reset stats of device {}", id);
        Ok(device)
    }

    /// Removes every session idle for longer than `timeout`, except those in
    /// `protected`, and returns the removed handles.
    pub fn evict_expired(
        &mut self,
        now: Instant,
        timeout: Duration,
        protected: &HashSet<DeviceId>,
    ) -> Vec<DeviceId> {
        let expired: Vec<DeviceId> = self
            .devices
            .values()
            .filter(|device| device.is_expired(now, timeout) && !protected.contains(&device.id))
            .map(|device| device.id.clone())
            .collect();

        for id in &expired {
            self.devices.remove(id);
        }
        expired
    }

    pub fn live_devices(&self) -> Vec<DeviceId> {
        self.devices.keys().cloned().collect()
    }
}
