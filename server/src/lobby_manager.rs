use common::DeviceId;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LobbyEntry {
    pub device_id: DeviceId,
    pub board_size: usize,
    pub enqueued_at: Instant,
}

/// Devices waiting for an opponent, in arrival order. Holds at most one
/// entry per device.
#[derive(Debug, Default)]
pub struct MatchmakingLobby {
    entries: Vec<LobbyEntry>,
}

impl MatchmakingLobby {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oldest waiting device other than `device_id` that wants `board_size`.
    pub fn find_opponent(&self, device_id: &DeviceId, board_size: usize) -> Option<DeviceId> {
        self.entries
            .iter()
            .find(|entry| entry.board_size == board_size && &entry.device_id != device_id)
            .map(|entry| entry.device_id.clone())
    }

    /// Adds the device, or updates its requested size in place if it is
    /// already waiting.
    pub fn enqueue(&mut self, device_id: &DeviceId, board_size: usize, now: Instant) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| &entry.device_id == device_id)
        {
            entry.board_size = board_size;
            entry.enqueued_at = now;
        } else {
            self.entries.push(LobbyEntry {
                device_id: device_id.clone(),
                board_size,
                enqueued_at: now,
            });
        }
        debug!("Device {} waiting for a {}x{} match", device_id, board_size, board_size);
    }

    /// Returns whether an entry was removed.
    pub fn remove(&mut self, device_id: &DeviceId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| &entry.device_id != device_id);
        before != self.entries.len()
    }

    pub fn entry(&self, device_id: &DeviceId) -> Option<&LobbyEntry> {
        self.entries.iter().find(|entry| &entry.device_id == device_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
