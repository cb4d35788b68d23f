//! Request and response payloads exchanged with device clients.
//!
//! Request fields are optional on the wire; the `into_*` helpers turn a
//! payload into the values the server needs, rejecting missing fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tictactoe::{Board, Mark};
use crate::{DeviceId, MatchId};

pub type Players = BTreeMap<DeviceId, Mark>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("missing required field: {0}")]
pub struct MissingField(pub &'static str);

fn require<T>(value: Option<T>, field: &'static str) -> Result<T, MissingField> {
    value.ok_or(MissingField(field))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterDeviceRequest {
    #[serde(default)]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDeviceResponse {
    pub device_id: DeviceId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceListResponse {
    pub connected_devices: Vec<DeviceId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfoResponse {
    pub connected: bool,
    pub alias: String,
    pub wins: u32,
    pub losses: u32,
    pub ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetStatsResponse {
    pub message: String,
    pub wins: u32,
    pub losses: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateMatchRequest {
    #[serde(default)]
    pub device_id: Option<DeviceId>,
    /// Requested board side; clamped into range, random when absent.
    #[serde(default)]
    pub size: Option<i64>,
}

impl CreateMatchRequest {
    pub fn into_parts(self) -> Result<(DeviceId, Option<i64>), MissingField> {
        Ok((require(self.device_id, "device_id")?, self.size))
    }
}

/// A match a device takes part in, as returned on creation and reconnection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub match_id: MatchId,
    pub players: Players,
    pub board_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitingResponse {
    pub message: String,
    pub board_size: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoveRequest {
    #[serde(default)]
    pub device_id: Option<DeviceId>,
    #[serde(default)]
    pub x: Option<i64>,
    #[serde(default)]
    pub y: Option<i64>,
}

impl MoveRequest {
    pub fn into_parts(self) -> Result<(DeviceId, i64, i64), MissingField> {
        Ok((
            require(self.device_id, "device_id")?,
            require(self.x, "x")?,
            require(self.y, "y")?,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveResponse {
    pub board: Board,
    pub next_turn: Option<DeviceId>,
    pub winner: Option<Mark>,
    pub draw: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchStateResponse {
    pub board: Board,
    pub turn: Option<DeviceId>,
    pub winner: Option<Mark>,
    pub draw: bool,
    pub size: usize,
    pub players: Players,
    pub opponent_left: bool,
}

/// Body of leave and surrender requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerActionRequest {
    #[serde(default)]
    pub device_id: Option<DeviceId>,
}

impl PlayerActionRequest {
    pub fn into_device_id(self) -> Result<DeviceId, MissingField> {
        require(self.device_id, "device_id")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
